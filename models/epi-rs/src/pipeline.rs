//! One complete run: validate, simulate, measure, and optionally compare a
//! family of derived scenarios against the requested one.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::comparison::{
    CostWeights, InterventionEffect, ModelComparison, Ranking, ScenarioOutcome,
    compare_models, compare_to_baseline, rank_scenarios,
};
use crate::error::{SimError, SimResult};
use crate::metrics::ScenarioMetrics;
use crate::parameters::{ClinicalRates, CostModel, ModelKind, RegionProfile, SimulationConfig};
use crate::runner::{RunDiagnostics, ScenarioRunner, SimulationOutput, Trajectory};
use crate::scenarios::{
    NamedConfig, Sensitivity, incubation_scenarios, intervention_scenarios,
    probabilistic_scenarios, sensitivity_analysis, sensitivity_configs,
};
use crate::validation::{
    DataQuality, TrajectoryCheck, ValidationReport, assess_data_quality, validate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioFamily {
    #[default]
    None,
    /// Baseline, each configured intervention alone, then all combined.
    Interventions,
    Probabilistic,
    Incubation,
    Sensitivity,
}

/// Typed `input` section of a run request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(flatten)]
    pub config: SimulationConfig,
    pub region: RegionProfile,
    #[serde(default)]
    pub clinical: ClinicalRates,
    #[serde(default)]
    pub costs: CostModel,
    #[serde(default)]
    pub weights: CostWeights,
    #[serde(default)]
    pub scenarios: ScenarioFamily,
    #[serde(default)]
    pub compare_models: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub family: ScenarioFamily,
    pub baseline: String,
    pub effects: Vec<InterventionEffect>,
    pub ranking: Ranking,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub validation: ValidationReport,
    pub data_quality: DataQuality,
    pub diagnostics: RunDiagnostics,
    pub consistency: TrajectoryCheck,
    pub metrics: ScenarioMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_comparison: Option<ModelComparison>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub trajectory: Trajectory,
    pub report: RunReport,
}

fn measure(
    input: &RunInput,
    config: &SimulationConfig,
    output: &SimulationOutput,
) -> SimResult<ScenarioMetrics> {
    ScenarioMetrics::compute(
        output,
        &config.base_rates(),
        &input.region,
        &input.clinical,
        &input.costs,
    )
}

pub fn execute(input: &RunInput) -> SimResult<PipelineOutput> {
    let config = &input.config;
    let validation = validate(config);
    for warning in &validation.warnings {
        warn!(%warning, "config warning");
    }
    if !validation.is_valid {
        return Err(SimError::InvalidConfig {
            errors: validation.errors,
        });
    }
    let data_quality = assess_data_quality(&input.region);
    info!(
        completeness = data_quality.completeness,
        reliability = ?data_quality.reliability,
        "assessed capacity data"
    );

    let output = ScenarioRunner::simulate(config);
    let metrics = measure(input, config, &output)?;
    info!(
        peak = metrics.summary.peak.value,
        peak_day = metrics.summary.peak.day,
        attack_rate = metrics.summary.attack_rate,
        risk = ?metrics.alerts.overall_risk_level,
        "simulated requested scenario"
    );

    let comparison = match input.scenarios {
        ScenarioFamily::None => None,
        family => compare_family(input, family, &metrics)?,
    };

    let model_comparison = if input.compare_models {
        let other = ScenarioRunner::run(&SimulationConfig {
            model: match config.model {
                ModelKind::Sir => ModelKind::Seir,
                ModelKind::Seir => ModelKind::Sir,
            },
            ..config.clone()
        })?;
        Some(match config.model {
            ModelKind::Sir => compare_models(&output, &other)?,
            ModelKind::Seir => compare_models(&other, &output)?,
        })
    } else {
        None
    };

    Ok(PipelineOutput {
        report: RunReport {
            validation,
            data_quality,
            diagnostics: output.diagnostics,
            consistency: output.consistency,
            metrics,
            comparison,
            model_comparison,
        },
        trajectory: output.trajectory,
    })
}

/// Runs and ranks a scenario family. Returns `None` when the family leaves
/// nothing to compare against the baseline.
fn compare_family(
    input: &RunInput,
    family: ScenarioFamily,
    requested: &ScenarioMetrics,
) -> SimResult<Option<ComparisonReport>> {
    let config = &input.config;
    let mut sensitivity = None;
    let scenarios: Vec<NamedConfig> = match family {
        ScenarioFamily::None => Vec::new(),
        ScenarioFamily::Interventions => intervention_scenarios(config, &config.interventions),
        ScenarioFamily::Probabilistic => probabilistic_scenarios(config),
        ScenarioFamily::Incubation => incubation_scenarios(config),
        ScenarioFamily::Sensitivity => {
            let table = sensitivity_analysis(config);
            let configs = sensitivity_configs(config, &table);
            sensitivity = Some(table);
            configs
        }
    };

    let configs: Vec<SimulationConfig> = scenarios.iter().map(|s| s.config.clone()).collect();
    let mut outcomes = Vec::with_capacity(scenarios.len() + 1);
    for (scenario, result) in scenarios.iter().zip(ScenarioRunner::run_parallel(&configs)) {
        let output = result?;
        outcomes.push(ScenarioOutcome {
            name: scenario.name.clone(),
            metrics: measure(input, &scenario.config, &output)?,
        });
    }
    info!(?family, count = outcomes.len(), "simulated scenario family");

    // The intervention family carries its own baseline; the others are
    // measured against the requested run.
    if family != ScenarioFamily::Interventions {
        outcomes.insert(
            0,
            ScenarioOutcome {
                name: "requested".to_string(),
                metrics: requested.clone(),
            },
        );
    }
    let Some((baseline, alternatives)) = outcomes.split_first().filter(|(_, rest)| !rest.is_empty())
    else {
        warn!(?family, count = outcomes.len(), "nothing to compare, skipping family");
        return Ok(None);
    };
    let effects = compare_to_baseline(baseline, alternatives)?;
    let ranking = rank_scenarios(&outcomes, &input.weights)?;
    info!(
        recommended = %ranking.scores[ranking.recommended].name,
        "ranked scenarios"
    );

    Ok(Some(ComparisonReport {
        family,
        baseline: baseline.name.clone(),
        effects,
        ranking,
        sensitivity,
    }))
}
