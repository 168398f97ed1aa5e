//! Plausibility checks before a run, consistency checks after it, and a
//! quality assessment of regional capacity data. All advisory output is
//! returned as plain strings; nothing here mutates its input.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::interventions::Intervention;
use crate::parameters::{ModelKind, RegionProfile, SimulationConfig};
use crate::runner::Trajectory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(rename = "R0")]
    pub r0: f64,
    pub infectious_period: f64,
}

fn check_fraction(name: &str, value: f64, errors: &mut Vec<String>) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(format!("{name} must be between 0 and 1, got {value}"));
    }
}

fn check_intervention(intervention: &Intervention, errors: &mut Vec<String>) {
    if !(intervention.start_day() >= 0.0) {
        errors.push(format!("{} start day must be >= 0", intervention.name()));
    }
    match intervention {
        Intervention::Quarantine(q) => {
            check_fraction("quarantine effectiveness", q.effectiveness, errors);
            if !(q.duration >= 0.0) {
                errors.push("quarantine duration must be >= 0".to_string());
            }
        }
        Intervention::SocialDistancing(d) => {
            check_fraction("social distancing reduction", d.reduction, errors)
        }
        Intervention::Vaccination(v) => {
            check_fraction("vaccination daily rate", v.daily_rate, errors)
        }
        Intervention::Testing(t) => {
            check_fraction("testing effectiveness", t.effectiveness, errors)
        }
        Intervention::Treatment(t) => {
            check_fraction("treatment effectiveness", t.effectiveness, errors)
        }
    }
}

/// Transmission rates the gate accepts.
pub const BETA_RANGE: RangeInclusive<f64> = 0.0..=2.0;
/// Recovery rates the gate accepts.
pub const GAMMA_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Gate run before any integration. `errors` block the simulation;
/// `warnings` and `recommendations` never do.
pub fn validate(config: &SimulationConfig) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();

    let beta = config.beta;
    let gamma = config.gamma;

    if !BETA_RANGE.contains(&beta) {
        errors.push("beta must be between 0 and 2 (typical values 0.1-0.8)".to_string());
    } else if beta > 0.8 {
        warnings.push("beta above 0.8 indicates an extremely contagious disease".to_string());
    } else if beta < 0.1 {
        warnings.push("beta below 0.1 may not capture significant transmission".to_string());
    }

    let infectious_period = 1.0 / gamma;
    if !GAMMA_RANGE.contains(&gamma) {
        errors.push("gamma must be between 0 and 1 (typical values 0.05-0.3)".to_string());
    } else if infectious_period < 2.0 {
        warnings.push(format!("very short infectious period ({infectious_period:.1} days)"));
    } else if infectious_period > 30.0 {
        warnings.push(format!("very long infectious period ({infectious_period:.1} days)"));
    }

    let r0 = config.base_rates().basic_reproduction_number();
    if r0 > 10.0 {
        warnings.push(format!("R0 = {r0:.2} is extremely high, check the parameters"));
    } else if r0 > 5.0 {
        warnings.push(format!("R0 = {r0:.2} indicates high transmissibility (e.g. measles)"));
    }
    if r0 > 2.0 {
        recommendations.push("moderate-to-high R0: early intervention is critical".to_string());
    } else if r0 > 1.0 {
        recommendations.push("R0 above 1 but controllable with adequate interventions".to_string());
    } else if !r0.is_nan() {
        recommendations.push("R0 below 1: the outbreak tends to self-extinguish".to_string());
    }

    if config.model == ModelKind::Seir && !(config.sigma > 0.0 && config.sigma <= 1.0) {
        errors.push("sigma must be in (0, 1] for the SEIR model".to_string());
    }

    if config.i0 < 1.0 || config.i0.is_nan() {
        errors.push("at least 1 initial infectious individual is required".to_string());
    } else if config.i0 / config.population() > 0.05 {
        warnings.push("more than 5% of the population is infectious at the start".to_string());
    }
    for (name, value) in [("S0", config.s0), ("E0", config.e0), ("R0", config.r0)] {
        if !(value >= 0.0) {
            errors.push(format!("{name} must be non-negative"));
        }
    }
    if config.model == ModelKind::Sir && config.e0 > 0.0 {
        warnings.push("E0 is ignored by the SIR model".to_string());
    }

    if !(config.dt > 0.0) {
        errors.push("time step dt must be positive".to_string());
    } else if config.dt > 1.0 {
        warnings.push(format!("time step dt = {} days is coarse for RK4", config.dt));
    }
    if !(config.days > 0.0) {
        errors.push("simulation horizon must be positive".to_string());
    }
    if !(config.conservation_tolerance > 0.0) {
        errors.push("conservation tolerance must be positive".to_string());
    }

    for intervention in config.interventions.iter() {
        check_intervention(intervention, &mut errors);
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        recommendations,
        r0,
        infectious_period,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryCheck {
    pub is_valid: bool,
    pub issues: Vec<String>,
    /// Final-sample conservation error, in percent of `N`.
    pub conservation_error_percent: f64,
}

/// Post-hoc consistency of a finished trajectory. Any issue here means the
/// integrator's in-loop safeguards failed.
pub fn check_trajectory(trajectory: &Trajectory) -> TrajectoryCheck {
    let mut issues = Vec::new();
    let len = trajectory.len();
    if len == 0 {
        return TrajectoryCheck {
            is_valid: false,
            issues: vec!["trajectory is empty".to_string()],
            conservation_error_percent: 0.0,
        };
    }

    let n0 = trajectory.population();
    let stride = (len / 10).max(1);
    for index in (0..len).step_by(stride) {
        let error = ((trajectory.total_at(index) - n0) / n0).abs();
        if error > 0.01 {
            issues.push(format!(
                "conservation error at t={:.1}: {:.2}%",
                trajectory.time[index],
                error * 100.0
            ));
        }
    }

    let has_negative = trajectory
        .susceptible
        .iter()
        .chain(trajectory.exposed.iter().flatten())
        .chain(&trajectory.infectious)
        .chain(&trajectory.recovered)
        .any(|value| *value < 0.0);
    if has_negative {
        issues.push("negative compartment values detected".to_string());
    }

    if trajectory
        .recovered
        .windows(2)
        .any(|pair| pair[1] < pair[0] - 0.01)
    {
        issues.push("recovered compartment decreases".to_string());
    }

    if len >= 2 {
        let last = trajectory.infectious[len - 1];
        let previous = trajectory.infectious[len - 2];
        if previous > 0.0 && (last - previous).abs() / previous > 0.001 && last > 100.0 {
            issues.push("simulation may not have converged by the horizon".to_string());
        }
    }

    let conservation_error_percent = ((trajectory.total_at(len - 1) - n0) / n0 * 100.0).abs();

    TrajectoryCheck {
        is_valid: issues.is_empty(),
        issues,
        conservation_error_percent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Reliability {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub completeness: u32,
    pub reliability: Reliability,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Sanity of the capacity data a region supplies to the metrics layer.
pub fn assess_data_quality(region: &RegionProfile) -> DataQuality {
    let mut completeness: u32 = 100;
    let mut reliability = Reliability::High;
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    if !(region.population > 0.0) {
        issues.push("missing required field: population".to_string());
        completeness -= 20;
    }
    if region.hospital_capacity.is_none() {
        issues.push("missing required field: hospitalCapacity".to_string());
        completeness -= 20;
    }

    if region.population > 0.0 && region.population < 100_000.0 {
        warnings.push("population below 100k, results may not be representative".to_string());
    }

    if let Some(capacity) = region.hospital_capacity
        && region.population > 0.0
    {
        let icu_per_100k = capacity.icu_beds / region.population * 100_000.0;
        if icu_per_100k < 5.0 {
            warnings.push(format!("very low ICU capacity ({icu_per_100k:.1} beds per 100k)"));
            reliability = Reliability::Medium;
        } else if icu_per_100k > 50.0 {
            warnings.push(format!(
                "unusually high ICU capacity ({icu_per_100k:.1} beds per 100k), verify the data"
            ));
        }
    }

    if completeness < 80 {
        reliability = Reliability::Low;
    }

    DataQuality {
        completeness,
        reliability,
        issues,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interventions::{InterventionSet, Quarantine};
    use crate::parameters::{BaseRates, HospitalCapacity};

    #[test]
    fn test_valid_reference_config() {
        let report = validate(&SimulationConfig::sir(9900.0, 100.0, 0.0, 0.4, 0.1, 160.0));
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!((report.r0 - 4.0).abs() < 1e-12);
        assert!((report.infectious_period - 10.0).abs() < 1e-12);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("early intervention is critical"));
    }

    #[test]
    fn test_hard_errors() {
        let report = validate(&SimulationConfig::sir(1000.0, 0.5, 0.0, -0.1, 1.5, 100.0));
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_soft_warnings_do_not_block() {
        // beta > 0.8, infectious period 1.1 days, 9% initially infectious.
        let report = validate(&SimulationConfig::sir(1000.0, 100.0, 0.0, 0.9, 0.9, 100.0));
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 3, "{:?}", report.warnings);

        let report = validate(&SimulationConfig::sir(10_000.0, 10.0, 0.0, 0.6, 0.02, 100.0));
        assert!(report.is_valid);
        // long infectious period and R0 = 30
        assert_eq!(report.warnings.len(), 2, "{:?}", report.warnings);
    }

    #[test]
    fn test_recommendation_bands() {
        let subcritical = validate(&SimulationConfig::sir(1000.0, 10.0, 0.0, 0.1, 0.2, 10.0));
        assert!(subcritical.recommendations[0].contains("self-extinguish"));
        let moderate = validate(&SimulationConfig::sir(1000.0, 10.0, 0.0, 0.15, 0.1, 10.0));
        assert!(moderate.recommendations[0].contains("controllable"));
    }

    #[test]
    fn test_seir_sigma_and_intervention_ranges() {
        let config = SimulationConfig::seir(
            1000.0,
            10.0,
            10.0,
            0.0,
            BaseRates {
                beta: 0.3,
                gamma: 0.1,
                sigma: 0.0,
            },
            100.0,
        )
        .with_interventions(InterventionSet::new(vec![Intervention::Quarantine(
            Quarantine {
                start_day: 10.0,
                duration: 30.0,
                effectiveness: 1.4,
            },
        )]));
        let report = validate(&config);
        assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    }

    fn trajectory(recovered: Vec<f64>, infectious: Vec<f64>) -> Trajectory {
        let len = recovered.len();
        let susceptible = recovered
            .iter()
            .zip(&infectious)
            .map(|(r, i)| 1000.0 - r - i)
            .collect();
        Trajectory {
            model: ModelKind::Sir,
            dt: 1.0,
            time: (0..len).map(|t| t as f64).collect(),
            susceptible,
            exposed: None,
            infectious,
            recovered,
        }
    }

    #[test]
    fn test_check_trajectory_clean() {
        let check = check_trajectory(&trajectory(
            vec![0.0, 10.0, 20.0, 30.0],
            vec![10.0, 8.0, 5.0, 4.999],
        ));
        assert!(check.is_valid, "{:?}", check.issues);
        assert!(check.conservation_error_percent < 1e-9);
    }

    #[test]
    fn test_check_trajectory_flags_problems() {
        let mut bad = trajectory(vec![0.0, 10.0, 5.0, 30.0], vec![10.0, 200.0, 300.0, 400.0]);
        bad.susceptible[3] = -5.0;
        let check = check_trajectory(&bad);
        assert!(!check.is_valid);
        assert!(check.issues.iter().any(|i| i.contains("negative")));
        assert!(check.issues.iter().any(|i| i.contains("decreases")));
        assert!(check.issues.iter().any(|i| i.contains("converged")));
        assert!(check.issues.iter().any(|i| i.contains("conservation")));
    }

    #[test]
    fn test_data_quality() {
        let region = RegionProfile {
            name: "La Paz".to_string(),
            population: 3_000_000.0,
            hospital_capacity: Some(HospitalCapacity {
                total_beds: 4200.0,
                icu_beds: 42.0,
                ventilators: 280.0,
                health_workers: 8500.0,
            }),
        };
        let quality = assess_data_quality(&region);
        assert_eq!(quality.completeness, 100);
        assert_eq!(quality.reliability, Reliability::Medium);
        assert_eq!(quality.warnings.len(), 1);

        let missing = assess_data_quality(&RegionProfile {
            name: String::new(),
            population: 50_000.0,
            hospital_capacity: None,
        });
        assert_eq!(missing.completeness, 80);
        assert_eq!(missing.reliability, Reliability::High);
        assert_eq!(missing.issues.len(), 1);
        assert_eq!(missing.warnings.len(), 1);
    }
}
