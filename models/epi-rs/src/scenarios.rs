//! Families of configurations derived from a base run.

use serde::{Deserialize, Serialize};

use crate::interventions::InterventionSet;
use crate::parameters::{ModelKind, SimulationConfig};
use crate::validation::{BETA_RANGE, GAMMA_RANGE};

/// A configuration with a label. `probability` is set only for the
/// probabilistic family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedConfig {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    pub config: SimulationConfig,
}

impl NamedConfig {
    fn new(name: &str, description: &str, config: SimulationConfig) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            probability: None,
            config,
        }
    }
}

/// Scaled rates pulled back into the range the validation gate accepts.
fn clamp_rates(beta: f64, gamma: f64) -> (f64, f64) {
    (
        beta.clamp(*BETA_RANGE.start(), *BETA_RANGE.end()),
        gamma.clamp(*GAMMA_RANGE.start(), *GAMMA_RANGE.end()),
    )
}

/// Best, expected, worst and critical variants of `base` with weights
/// summing to one. Scaled rates are clamped to the accepted ranges.
pub fn probabilistic_scenarios(base: &SimulationConfig) -> Vec<NamedConfig> {
    let variants = [
        ("best case", "highly effective interventions, high adherence", 0.15, 0.6, 1.2),
        ("expected", "moderately effective interventions", 0.50, 0.8, 1.0),
        ("worst case", "low adherence, more transmissible variant", 0.25, 1.3, 0.9),
        ("critical", "interventions collapse, high transmissibility", 0.10, 1.5, 0.85),
    ];
    variants
        .into_iter()
        .map(|(name, description, probability, beta_factor, gamma_factor)| {
            let (beta, gamma) = clamp_rates(base.beta * beta_factor, base.gamma * gamma_factor);
            NamedConfig {
                probability: Some(probability),
                ..NamedConfig::new(name, description, base.with_rates(beta, gamma))
            }
        })
        .collect()
}

/// SEIR runs of `base` with short, typical and long incubation periods.
pub fn incubation_scenarios(base: &SimulationConfig) -> Vec<NamedConfig> {
    let seir = SimulationConfig {
        model: ModelKind::Seir,
        ..base.clone()
    };
    [
        ("short incubation", "2.5 day latent period", 0.4),
        ("typical incubation", "5.5 day latent period", 0.18),
        ("long incubation", "12 day latent period", 0.08),
    ]
    .into_iter()
    .map(|(name, description, sigma)| NamedConfig::new(name, description, seir.with_sigma(sigma)))
    .collect()
}

/// The baseline, each intervention on its own, then all of them together.
pub fn intervention_scenarios(
    base: &SimulationConfig,
    interventions: &InterventionSet,
) -> Vec<NamedConfig> {
    let mut scenarios = vec![NamedConfig::new(
        "baseline",
        "no interventions",
        base.with_interventions(InterventionSet::default()),
    )];
    for intervention in interventions.iter() {
        scenarios.push(NamedConfig::new(
            intervention.name(),
            &intervention.describe(),
            base.with_interventions(InterventionSet::default().with(intervention.clone())),
        ));
    }
    if interventions.len() > 1 {
        scenarios.push(NamedConfig::new(
            "combined",
            &interventions.describe(),
            base.with_interventions(interventions.clone()),
        ));
    }
    scenarios
}

pub const SENSITIVITY_FACTORS: [f64; 5] = [0.8, 0.9, 1.0, 1.1, 1.2];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateVariation {
    pub factor: f64,
    pub beta: f64,
    pub gamma: f64,
    #[serde(rename = "R0")]
    pub r0: f64,
    pub infectious_period: f64,
}

impl RateVariation {
    fn new(factor: f64, beta: f64, gamma: f64) -> Self {
        let (beta, gamma) = clamp_rates(beta, gamma);
        Self {
            factor,
            beta,
            gamma,
            r0: beta / gamma,
            infectious_period: 1.0 / gamma,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensitivity {
    pub beta_variations: Vec<RateVariation>,
    pub gamma_variations: Vec<RateVariation>,
    /// Transmission rate at which R0 drops to one for the base gamma.
    pub beta_max: f64,
    /// Recovery rate at which R0 drops to one for the base beta.
    pub gamma_min: f64,
}

/// One-at-a-time perturbation of beta and gamma around `base`.
pub fn sensitivity_analysis(base: &SimulationConfig) -> Sensitivity {
    let (beta, gamma) = (base.beta, base.gamma);
    Sensitivity {
        beta_variations: SENSITIVITY_FACTORS
            .iter()
            .map(|&factor| RateVariation::new(factor, beta * factor, gamma))
            .collect(),
        gamma_variations: SENSITIVITY_FACTORS
            .iter()
            .map(|&factor| RateVariation::new(factor, beta, gamma * factor))
            .collect(),
        beta_max: gamma,
        gamma_min: beta,
    }
}

/// Configurations behind every entry of a [`Sensitivity`] table, beta
/// variations first.
pub fn sensitivity_configs(base: &SimulationConfig, sensitivity: &Sensitivity) -> Vec<NamedConfig> {
    let beta = sensitivity.beta_variations.iter().map(|v| ("beta", v));
    let gamma = sensitivity.gamma_variations.iter().map(|v| ("gamma", v));
    beta.chain(gamma)
        .map(|(rate, variation)| {
            NamedConfig::new(
                &format!("{rate} x{}", variation.factor),
                &format!("R0 {:.2}", variation.r0),
                base.with_rates(variation.beta, variation.gamma),
            )
        })
        .collect()
}
