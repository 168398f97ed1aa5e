//! Marginal effect of interventions across completed scenarios.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::metrics::{ScenarioMetrics, find_peak, total_infected};
use crate::runner::SimulationOutput;

/// A completed scenario with the metrics computed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub metrics: ScenarioMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    /// ICU occupancy stays at or below 100%.
    Viable,
    Insufficient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionEffect {
    pub name: String,
    pub peak_reduction: f64,
    pub peak_reduction_percent: f64,
    pub peak_delay_days: f64,
    pub cases_averted: f64,
    pub cases_averted_percent: f64,
    /// Intervention ICU occupancy minus baseline, in percentage points.
    pub icu_occupancy_delta: f64,
    pub verdict: Verdict,
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

pub fn intervention_effect(
    baseline: &ScenarioOutcome,
    alternative: &ScenarioOutcome,
) -> InterventionEffect {
    let base = &baseline.metrics;
    let alt = &alternative.metrics;
    let peak_reduction = base.summary.peak.value - alt.summary.peak.value;
    let cases_averted = base.summary.total_infected - alt.summary.total_infected;
    let alt_icu = alt.hospital_demand.icu.occupancy_percent;
    InterventionEffect {
        name: alternative.name.clone(),
        peak_reduction,
        peak_reduction_percent: percent_of(peak_reduction, base.summary.peak.value),
        peak_delay_days: alt.summary.peak.day - base.summary.peak.day,
        cases_averted,
        cases_averted_percent: percent_of(cases_averted, base.summary.total_infected),
        icu_occupancy_delta: alt_icu - base.hospital_demand.icu.occupancy_percent,
        verdict: if alt_icu <= 100.0 {
            Verdict::Viable
        } else {
            Verdict::Insufficient
        },
    }
}

/// Effect of each alternative relative to `baseline`, in input order.
pub fn compare_to_baseline(
    baseline: &ScenarioOutcome,
    alternatives: &[ScenarioOutcome],
) -> SimResult<Vec<InterventionEffect>> {
    if alternatives.is_empty() {
        return Err(SimError::InsufficientScenarios {
            required: 1,
            found: 0,
        });
    }
    Ok(alternatives
        .iter()
        .map(|alternative| intervention_effect(baseline, alternative))
        .collect())
}

/// Weights of the scalar cost score used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostWeights {
    pub per_infection: f64,
    pub per_icu_case: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            per_infection: 1_000.0,
            per_icu_case: 5_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioScore {
    pub name: String,
    pub peak_infected: f64,
    pub total_infected: f64,
    pub icu_cases: f64,
    pub exceeds_capacity: bool,
    pub cost_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub scores: Vec<ScenarioScore>,
    pub recommended: usize,
    pub worst: usize,
    pub recommendations: Vec<String>,
}

/// Picks the scenario with the lowest `totalInfected·w1 + icuCases·w2`.
/// Ties go to the earliest scenario.
pub fn rank_scenarios(
    scenarios: &[ScenarioOutcome],
    weights: &CostWeights,
) -> SimResult<Ranking> {
    if scenarios.len() < 2 {
        return Err(SimError::InsufficientScenarios {
            required: 2,
            found: scenarios.len(),
        });
    }

    let scores: Vec<ScenarioScore> = scenarios
        .iter()
        .map(|scenario| {
            let metrics = &scenario.metrics;
            let icu = &metrics.hospital_demand.icu;
            ScenarioScore {
                name: scenario.name.clone(),
                peak_infected: metrics.summary.peak.value,
                total_infected: metrics.summary.total_infected,
                icu_cases: icu.peak,
                exceeds_capacity: icu.exceeds_capacity(),
                cost_score: metrics.summary.total_infected * weights.per_infection
                    + icu.peak * weights.per_icu_case,
            }
        })
        .collect();

    let mut recommended = 0;
    let mut worst = 0;
    for (index, score) in scores.iter().enumerate() {
        if score.cost_score < scores[recommended].cost_score {
            recommended = index;
        }
        if score.cost_score > scores[worst].cost_score {
            worst = index;
        }
    }

    let best = &scores[recommended];
    let bad = &scores[worst];
    let mut recommendations = vec![
        format!("optimal scenario: {}", best.name),
        format!(
            "peak reduction: {:.0}%",
            percent_of(bad.peak_infected - best.peak_infected, bad.peak_infected)
        ),
        format!(
            "cases averted: {:.0}",
            bad.total_infected - best.total_infected
        ),
    ];
    if best.exceeds_capacity {
        recommendations.push("even the best scenario exceeds ICU capacity".to_string());
        recommendations.push("expanding hospital capacity is critical".to_string());
    }

    Ok(Ranking {
        scores,
        recommended,
        worst,
        recommendations,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparison {
    pub peak_difference: f64,
    pub peak_difference_percent: f64,
    /// Positive when the SEIR peak comes later.
    pub peak_time_difference: f64,
    pub total_infected_difference: f64,
    pub total_infected_difference_percent: f64,
}

/// How adding the latent compartment changes the course of an epidemic
/// with otherwise identical parameters.
pub fn compare_models(
    sir: &SimulationOutput,
    seir: &SimulationOutput,
) -> SimResult<ModelComparison> {
    let peak = |output: &SimulationOutput| {
        let trajectory = &output.trajectory;
        find_peak(&trajectory.infectious, &trajectory.time).ok_or(SimError::EmptyTrajectory)
    };
    let infected = |output: &SimulationOutput| {
        total_infected(&output.trajectory, output.diagnostics.total_vaccinated)
    };
    let (sir_peak, seir_peak) = (peak(sir)?, peak(seir)?);
    let (sir_total, seir_total) = (infected(sir), infected(seir));
    Ok(ModelComparison {
        peak_difference: seir_peak.value - sir_peak.value,
        peak_difference_percent: percent_of(seir_peak.value - sir_peak.value, sir_peak.value),
        peak_time_difference: seir_peak.day - sir_peak.day,
        total_infected_difference: seir_total - sir_total,
        total_infected_difference_percent: percent_of(seir_total - sir_total, sir_total),
    })
}
