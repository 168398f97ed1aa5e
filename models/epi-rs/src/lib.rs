//! Deterministic SIR/SEIR epidemic scenarios: fixed-step integration with
//! time-dependent interventions, then peak, capacity, cost and alert
//! metrics for comparing scenarios against each other.

pub mod alerts;
pub mod comparison;
pub mod error;
pub mod integrator;
pub mod interventions;
pub mod metrics;
pub mod output;
pub mod parameters;
pub mod pipeline;
pub mod runner;
pub mod scenarios;
pub mod validation;

pub use error::{SimError, SimResult};
pub use interventions::{EffectiveRates, Intervention, InterventionSet};
pub use metrics::ScenarioMetrics;
pub use parameters::{ModelKind, RegionProfile, SimulationConfig};
pub use pipeline::{RunInput, RunReport, execute};
pub use runner::{ScenarioRunner, SimulationOutput, Trajectory};
