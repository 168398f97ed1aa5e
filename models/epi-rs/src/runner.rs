use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::integrator::{Integrator, State};
use crate::parameters::{ModelKind, SimulationConfig};
use crate::validation::{TrajectoryCheck, check_trajectory, validate};

/// Time series per compartment, all the same length, sampled every `dt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub model: ModelKind,
    pub dt: f64,
    pub time: Vec<f64>,
    #[serde(rename = "S")]
    pub susceptible: Vec<f64>,
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub exposed: Option<Vec<f64>>,
    #[serde(rename = "I")]
    pub infectious: Vec<f64>,
    #[serde(rename = "R")]
    pub recovered: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(model: ModelKind, dt: f64, capacity: usize) -> Self {
        Self {
            model,
            dt,
            time: Vec::with_capacity(capacity),
            susceptible: Vec::with_capacity(capacity),
            exposed: match model {
                ModelKind::Sir => None,
                ModelKind::Seir => Some(Vec::with_capacity(capacity)),
            },
            infectious: Vec::with_capacity(capacity),
            recovered: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, t: f64, y: &State) {
        let layout = self.model.layout();
        self.time.push(t);
        self.susceptible.push(y[layout.susceptible]);
        if let (Some(exposed), Some(index)) = (self.exposed.as_mut(), layout.exposed) {
            exposed.push(y[index]);
        }
        self.infectious.push(y[layout.infectious]);
        self.recovered.push(y[layout.recovered]);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Sum of all compartments at sample `index`.
    pub fn total_at(&self, index: usize) -> f64 {
        let exposed = self.exposed.as_ref().map_or(0.0, |e| e[index]);
        self.susceptible[index] + exposed + self.infectious[index] + self.recovered[index]
    }

    /// Conserved total, taken from the initial sample.
    pub fn population(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.total_at(0)
    }

    pub fn final_recovered(&self) -> f64 {
        self.recovered.last().copied().unwrap_or(0.0)
    }

    /// Number of samples covering one day.
    pub fn samples_per_day(&self) -> usize {
        if self.dt <= 0.0 {
            return 1;
        }
        ((1.0 / self.dt).round() as usize).max(1)
    }
}

/// Counts of the in-loop safeguards firing during one run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDiagnostics {
    pub steps: usize,
    pub clamped_steps: usize,
    pub rescaled_steps: usize,
    pub total_vaccinated: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutput {
    pub trajectory: Trajectory,
    pub diagnostics: RunDiagnostics,
    pub consistency: TrajectoryCheck,
}

pub struct ScenarioRunner;

impl ScenarioRunner {
    /// Validates `config`, then integrates it over the full horizon. Invalid
    /// configs never produce a trajectory.
    pub fn run(config: &SimulationConfig) -> SimResult<SimulationOutput> {
        let report = validate(config);
        if !report.is_valid {
            return Err(SimError::InvalidConfig {
                errors: report.errors,
            });
        }
        Ok(Self::simulate(config))
    }

    /// Integrates without the validation gate. Callers must have validated
    /// `config` already.
    pub fn simulate(config: &SimulationConfig) -> SimulationOutput {
        let model = config.model;
        let steps = config.steps();
        let base = config.base_rates();
        let integrator = Integrator {
            model,
            population: config.population(),
            dt: config.dt,
            tolerance: config.conservation_tolerance,
        };

        let mut y = match model {
            ModelKind::Sir => State::from_vec(vec![config.s0, config.i0, config.r0]),
            ModelKind::Seir => State::from_vec(vec![config.s0, config.e0, config.i0, config.r0]),
        };
        let mut trajectory = Trajectory::with_capacity(model, config.dt, steps + 1);
        let mut diagnostics = RunDiagnostics {
            steps,
            ..RunDiagnostics::default()
        };
        trajectory.push(0.0, &y);

        debug!(?model, steps, dt = config.dt, "starting integration");
        for step in 0..steps {
            let t = step as f64 * config.dt;
            let rates = config.interventions.evaluate(t, base);
            let (next, corrections) = integrator.step(&y, t, &rates);
            diagnostics.clamped_steps += usize::from(corrections.clamped);
            diagnostics.rescaled_steps += usize::from(corrections.rescaled);
            diagnostics.total_vaccinated += corrections.vaccinated;
            y = next;
            trajectory.push((step + 1) as f64 * config.dt, &y);
        }

        if diagnostics.clamped_steps > 0 || diagnostics.rescaled_steps > 0 {
            warn!(
                clamped = diagnostics.clamped_steps,
                rescaled = diagnostics.rescaled_steps,
                "integrator corrected numerical drift"
            );
        }

        let consistency = check_trajectory(&trajectory);
        if !consistency.is_valid {
            warn!(issues = ?consistency.issues, "trajectory failed consistency checks");
        }
        debug!(samples = trajectory.len(), "integration finished");

        SimulationOutput {
            trajectory,
            diagnostics,
            consistency,
        }
    }

    /// Runs each config lazily, yielding one result as soon as that run
    /// finishes so a long sweep never holds every trajectory at once.
    pub fn run_batch<'a, I>(configs: I) -> impl Iterator<Item = SimResult<SimulationOutput>> + 'a
    where
        I: IntoIterator<Item = &'a SimulationConfig>,
        I::IntoIter: 'a,
    {
        configs.into_iter().map(Self::run)
    }

    /// Runs independent configs on scoped worker threads. Results come back
    /// in input order.
    pub fn run_parallel(configs: &[SimulationConfig]) -> Vec<SimResult<SimulationOutput>> {
        thread::scope(|scope| {
            let handles: Vec<_> = configs
                .iter()
                .map(|config| scope.spawn(move || Self::run(config)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}
