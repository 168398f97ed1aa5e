//! Threshold-based early-warning alerts.

use serde::{Deserialize, Serialize};

use crate::metrics::{HospitalDemand, log_linear_slope};
use crate::runner::Trajectory;

/// Severity, ordered from no alert up to critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
    Critical,
}

impl AlertLevel {
    /// 1 is the most urgent.
    pub fn priority(self) -> u8 {
        match self {
            AlertLevel::Critical => 1,
            AlertLevel::Red => 2,
            AlertLevel::Orange => 3,
            AlertLevel::Yellow => 4,
            AlertLevel::Green => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    ExponentialGrowth,
    RapidGrowth,
    SustainedGrowth,
    HospitalCollapse,
    IcuSaturation,
    HospitalPressure,
    PreventiveAlert,
    HighPrevalence,
    SignificantPrevalence,
    VentilatorCrisis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub kind: AlertKind,
    pub message: String,
    pub action: String,
    pub priority: u8,
}

impl Alert {
    fn new(level: AlertLevel, kind: AlertKind, message: String, action: &str) -> Self {
        Self {
            level,
            kind,
            message,
            action: action.to_string(),
            priority: level.priority(),
        }
    }
}

/// Quantities the alert checks look at, all as fractions (1.0 = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInputs {
    /// Infectious count now over the count one week earlier.
    pub growth_factor: f64,
    pub icu_occupancy: f64,
    pub ventilator_occupancy: f64,
    pub attack_rate: f64,
}

impl AlertInputs {
    /// Week-over-week growth is read at the end of the trajectory; ICU and
    /// ventilator occupancy use the peak demand over the whole run.
    pub fn from_trajectory(
        trajectory: &Trajectory,
        demand: &HospitalDemand,
        population: f64,
    ) -> Self {
        let infectious = &trajectory.infectious;
        let last = infectious.len().saturating_sub(1);
        let week_ago = last.saturating_sub(7 * trajectory.samples_per_day());
        let current = infectious.get(last).copied().unwrap_or(0.0);
        let previous = infectious.get(week_ago).copied().unwrap_or(0.0);
        let growth_factor = if previous > 0.0 {
            current / previous
        } else if current > 0.0 {
            f64::INFINITY
        } else {
            1.0
        };
        Self {
            growth_factor,
            icu_occupancy: demand.icu.peak / demand.icu.capacity,
            ventilator_occupancy: demand.ventilators.peak / demand.ventilators.capacity,
            attack_rate: trajectory.final_recovered() / population,
        }
    }
}

pub fn check_growth(growth_factor: f64) -> Option<Alert> {
    if growth_factor > 2.0 {
        Some(Alert::new(
            AlertLevel::Critical,
            AlertKind::ExponentialGrowth,
            format!("cases doubling in under 7 days (factor {growth_factor:.2}x)"),
            "activate emergency protocol: immediate strict quarantine",
        ))
    } else if growth_factor > 1.5 {
        Some(Alert::new(
            AlertLevel::Red,
            AlertKind::RapidGrowth,
            format!(
                "accelerated case growth ({:.0}% in 7 days)",
                (growth_factor - 1.0) * 100.0
            ),
            "implement non-pharmaceutical interventions urgently",
        ))
    } else if growth_factor > 1.2 {
        Some(Alert::new(
            AlertLevel::Orange,
            AlertKind::SustainedGrowth,
            format!(
                "sustained growth trend ({:.0}% in 7 days)",
                (growth_factor - 1.0) * 100.0
            ),
            "prepare mitigation measures and intensify monitoring",
        ))
    } else {
        None
    }
}

pub fn check_icu_occupancy(occupancy: f64) -> Option<Alert> {
    let percent = occupancy * 100.0;
    if occupancy > 1.0 {
        Some(Alert::new(
            AlertLevel::Critical,
            AlertKind::HospitalCollapse,
            format!("ICU capacity exceeded: {percent:.0}%"),
            "expand ICU capacity, transfer patients, request external support",
        ))
    } else if occupancy > 0.85 {
        Some(Alert::new(
            AlertLevel::Red,
            AlertKind::IcuSaturation,
            format!("ICU close to saturation: {percent:.0}%"),
            "activate hospital expansion plan, suspend elective surgery",
        ))
    } else if occupancy > 0.70 {
        Some(Alert::new(
            AlertLevel::Orange,
            AlertKind::HospitalPressure,
            format!("significant ICU occupancy: {percent:.0}%"),
            "prepare triage protocols, increase health staff",
        ))
    } else if occupancy > 0.50 {
        Some(Alert::new(
            AlertLevel::Yellow,
            AlertKind::PreventiveAlert,
            format!("moderate ICU occupancy: {percent:.0}%"),
            "monitor closely, prepare response protocols",
        ))
    } else {
        None
    }
}

pub fn check_attack_rate(attack_rate: f64) -> Option<Alert> {
    let percent = attack_rate * 100.0;
    if attack_rate > 0.5 {
        Some(Alert::new(
            AlertLevel::Red,
            AlertKind::HighPrevalence,
            format!("more than half of the population affected ({percent:.1}%)"),
            "advanced epidemic: focus on protecting vulnerable groups",
        ))
    } else if attack_rate > 0.3 {
        Some(Alert::new(
            AlertLevel::Orange,
            AlertKind::SignificantPrevalence,
            format!("{percent:.1}% of the population has been infected"),
            "strengthen care and follow-up systems",
        ))
    } else {
        None
    }
}

pub fn check_ventilator_occupancy(occupancy: f64) -> Option<Alert> {
    (occupancy > 0.9).then(|| {
        Alert::new(
            AlertLevel::Critical,
            AlertKind::VentilatorCrisis,
            format!("ventilators nearly exhausted: {:.0}%", occupancy * 100.0),
            "acquire or request additional ventilators",
        )
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReport {
    pub overall_risk_level: AlertLevel,
    /// Sorted by priority, most urgent first.
    pub alerts: Vec<Alert>,
    pub inputs: AlertInputs,
}

/// Runs every check independently. The overall level is the most severe
/// level among the triggered alerts, or green if none fired.
pub fn early_warning_alerts(inputs: &AlertInputs) -> AlertReport {
    let mut alerts: Vec<Alert> = [
        check_growth(inputs.growth_factor),
        check_icu_occupancy(inputs.icu_occupancy),
        check_attack_rate(inputs.attack_rate),
        check_ventilator_occupancy(inputs.ventilator_occupancy),
    ]
    .into_iter()
    .flatten()
    .collect();
    alerts.sort_by_key(|alert| alert.priority);

    let overall_risk_level = alerts
        .iter()
        .map(|alert| alert.level)
        .max()
        .unwrap_or(AlertLevel::Green);

    AlertReport {
        overall_risk_level,
        alerts,
        inputs: *inputs,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrowthRisk {
    Low,
    Moderate,
    High,
    Critical,
}

/// Recent exponential growth read from the last week of the trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthIndicators {
    /// Daily log-linear growth rate over the trailing 7 days.
    pub growth_rate_7d: f64,
    /// Growth rate of the second half of that week minus the first half.
    pub acceleration: f64,
    pub risk_level: GrowthRisk,
    pub warnings: Vec<String>,
}

impl GrowthIndicators {
    pub fn compute(trajectory: &Trajectory) -> Self {
        let len = trajectory.len();
        let window = (7 * trajectory.samples_per_day()).min(len);
        let start = len - window;
        let infectious = &trajectory.infectious[start..];
        let time = &trajectory.time[start..];
        let middle = window / 2;

        let growth_rate_7d = log_linear_slope(infectious, time).unwrap_or(0.0);
        let first_half = log_linear_slope(&infectious[..middle], &time[..middle]).unwrap_or(0.0);
        let second_half = log_linear_slope(&infectious[middle..], &time[middle..]).unwrap_or(0.0);
        let acceleration = second_half - first_half;

        let mut warnings = Vec::new();
        let mut risk_level = if growth_rate_7d > 0.15 {
            warnings.push("rapid exponential growth detected (>15% daily)".to_string());
            GrowthRisk::Critical
        } else if growth_rate_7d > 0.08 {
            warnings.push("moderate exponential growth (8-15% daily)".to_string());
            GrowthRisk::High
        } else if growth_rate_7d > 0.03 {
            warnings.push("sustained growth (3-8% daily)".to_string());
            GrowthRisk::Moderate
        } else {
            GrowthRisk::Low
        };

        if acceleration > 0.05 {
            warnings.push("case growth is accelerating".to_string());
            if risk_level == GrowthRisk::Moderate {
                risk_level = GrowthRisk::High;
            }
        }

        Self {
            growth_rate_7d,
            acceleration,
            risk_level,
            warnings,
        }
    }
}

/// Response tier recommended for a given ICU occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterventionLevel {
    Normal,
    Alert,
    Moderate,
    Severe,
    Critical,
}

impl InterventionLevel {
    pub fn from_icu_occupancy(occupancy: f64) -> Self {
        if occupancy >= 0.95 {
            InterventionLevel::Critical
        } else if occupancy >= 0.85 {
            InterventionLevel::Severe
        } else if occupancy >= 0.70 {
            InterventionLevel::Moderate
        } else if occupancy >= 0.50 {
            InterventionLevel::Alert
        } else {
            InterventionLevel::Normal
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            InterventionLevel::Normal => "normal situation: routine epidemiological surveillance",
            InterventionLevel::Alert => "epidemiological alert: intensive monitoring",
            InterventionLevel::Moderate => "moderate restrictions: social distancing",
            InterventionLevel::Severe => "strict quarantine: close non-essential activities",
            InterventionLevel::Critical => "health emergency: total quarantine and curfew",
        }
    }
}
