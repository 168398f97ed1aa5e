use std::path::PathBuf;
use std::process::ExitCode;

use epi_mrp::{Environment, EnvironmentError};
use epi_sim::output::{ranking_table, trajectory_table};
use epi_sim::pipeline::{RunInput, execute};
use epi_sim::{RunReport, SimError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error(transparent)]
    Simulation(#[from] SimError),
    #[error("run request has no input section")]
    MissingInput,
}

/// The simulator is deterministic, so the request's seed and replicate are
/// left out; the input fingerprint identifies the run.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsDocument<'a> {
    fingerprint: String,
    #[serde(flatten)]
    report: &'a RunReport,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("epi_sim=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), RunError> {
    // A path argument points at a TOML run request; otherwise read JSON on stdin.
    let env = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Environment::from_toml_file(&path)?,
        None => Environment::from_stdin()?,
    }
    .with_input_type::<RunInput>()?;
    let input = env.input.as_ref().ok_or(RunError::MissingInput)?;
    info!(
        model = ?input.config.model,
        days = input.config.days,
        interventions = %input.config.interventions.describe(),
        "loaded run request"
    );

    let output = execute(input)?;
    let report = &output.report;

    let table = trajectory_table(&output.trajectory, &report.metrics.effective_reproduction);
    env.write_csv("trajectory.csv", &table.headers, &table.rows)?;
    env.write_json(
        "metrics.json",
        &MetricsDocument {
            fingerprint: env.fingerprint(),
            report,
        },
    )?;
    if let Some(comparison) = &report.comparison {
        env.write_json("comparison.json", comparison)?;
        let ranking = ranking_table(&comparison.ranking);
        env.write_csv("ranking.csv", &ranking.headers, &ranking.rows)?;
    }

    info!(
        samples = output.trajectory.len(),
        level = ?report.metrics.intervention_level,
        "run complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metrics_document_omits_seed() {
        let input: RunInput = serde_json::from_value(json!({
            "model": "SIR",
            "S0": 990.0,
            "I0": 10.0,
            "beta": 0.3,
            "gamma": 0.1,
            "days": 30.0,
            "region": {
                "population": 1000.0,
                "hospitalCapacity": {
                    "totalBeds": 80.0,
                    "icuBeds": 10.0,
                    "ventilators": 6.0,
                    "healthWorkers": 90.0
                }
            }
        }))
        .unwrap();
        let output = execute(&input).unwrap();
        let document = serde_json::to_value(MetricsDocument {
            fingerprint: "abc123".to_string(),
            report: &output.report,
        })
        .unwrap();
        assert_eq!(document["fingerprint"], "abc123");
        assert!(document.get("metrics").is_some());
        assert!(document.get("seed").is_none());
        assert!(document.get("replicate").is_none());
    }
}
