use crate::comparison::Ranking;
use crate::runner::Trajectory;

/// Column headers and string rows, ready for a CSV writer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Table {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row per sample: time, each compartment, then `R_eff` when given.
pub fn trajectory_table(trajectory: &Trajectory, effective_reproduction: &[f64]) -> Table {
    let mut headers = vec!["time", "S"];
    if trajectory.exposed.is_some() {
        headers.push("E");
    }
    headers.extend(["I", "R"]);
    let with_reff = effective_reproduction.len() == trajectory.len();
    if with_reff {
        headers.push("R_eff");
    }

    let mut table = Table::new(headers);
    for i in 0..trajectory.len() {
        let mut row = vec![
            trajectory.time[i].to_string(),
            trajectory.susceptible[i].to_string(),
        ];
        if let Some(exposed) = &trajectory.exposed {
            row.push(exposed[i].to_string());
        }
        row.push(trajectory.infectious[i].to_string());
        row.push(trajectory.recovered[i].to_string());
        if with_reff {
            row.push(effective_reproduction[i].to_string());
        }
        table.rows.push(row);
    }
    table
}

pub fn ranking_table(ranking: &Ranking) -> Table {
    let mut table = Table::new(vec![
        "scenario",
        "peak_infected",
        "total_infected",
        "icu_cases",
        "exceeds_capacity",
        "cost_score",
        "recommended",
    ]);
    table.rows = ranking
        .scores
        .iter()
        .enumerate()
        .map(|(index, score)| {
            vec![
                score.name.clone(),
                score.peak_infected.to_string(),
                score.total_infected.to_string(),
                score.icu_cases.to_string(),
                score.exceeds_capacity.to_string(),
                score.cost_score.to_string(),
                (index == ranking.recommended).to_string(),
            ]
        })
        .collect();
    table
}
