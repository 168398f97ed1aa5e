use serde::{Deserialize, Serialize};

use crate::interventions::InterventionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelKind {
    #[default]
    #[serde(rename = "SIR")]
    Sir,
    #[serde(rename = "SEIR")]
    Seir,
}

impl ModelKind {
    pub fn compartments(self) -> usize {
        match self {
            ModelKind::Sir => 3,
            ModelKind::Seir => 4,
        }
    }
}

/// Transmission (`beta`), recovery (`gamma`) and E→I progression (`sigma`)
/// rates, per day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseRates {
    pub beta: f64,
    pub gamma: f64,
    pub sigma: f64,
}

impl BaseRates {
    pub fn basic_reproduction_number(&self) -> f64 {
        self.beta / self.gamma
    }
}

/// Inputs for one deterministic run. Immutable once built: variants are
/// produced with the `with_*` constructors rather than by mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub model: ModelKind,
    #[serde(rename = "S0")]
    pub s0: f64,
    #[serde(rename = "E0")]
    pub e0: f64,
    #[serde(rename = "I0")]
    pub i0: f64,
    #[serde(rename = "R0")]
    pub r0: f64,
    pub beta: f64,
    pub gamma: f64,
    pub sigma: f64,
    pub days: f64,
    pub dt: f64,
    /// Allowed relative drift of the compartment total before rescaling.
    pub conservation_tolerance: f64,
    pub interventions: InterventionSet,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Sir,
            s0: 1_000_000.0,
            e0: 0.0,
            i0: 100.0,
            r0: 0.0,
            beta: 0.4,
            gamma: 0.1,
            sigma: 0.2,
            days: 365.0,
            dt: 0.2,
            conservation_tolerance: 0.01,
            interventions: InterventionSet::default(),
        }
    }
}

impl SimulationConfig {
    pub fn sir(s0: f64, i0: f64, r0: f64, beta: f64, gamma: f64, days: f64) -> Self {
        Self {
            model: ModelKind::Sir,
            s0,
            e0: 0.0,
            i0,
            r0,
            beta,
            gamma,
            days,
            ..Self::default()
        }
    }

    pub fn seir(
        s0: f64,
        e0: f64,
        i0: f64,
        r0: f64,
        rates: BaseRates,
        days: f64,
    ) -> Self {
        Self {
            model: ModelKind::Seir,
            s0,
            e0,
            i0,
            r0,
            beta: rates.beta,
            gamma: rates.gamma,
            sigma: rates.sigma,
            days,
            ..Self::default()
        }
    }

    pub fn with_interventions(&self, interventions: InterventionSet) -> Self {
        Self {
            interventions,
            ..self.clone()
        }
    }

    pub fn with_rates(&self, beta: f64, gamma: f64) -> Self {
        Self {
            beta,
            gamma,
            ..self.clone()
        }
    }

    pub fn with_sigma(&self, sigma: f64) -> Self {
        Self {
            sigma,
            ..self.clone()
        }
    }

    pub fn with_step(&self, dt: f64) -> Self {
        Self { dt, ..self.clone() }
    }

    pub fn base_rates(&self) -> BaseRates {
        BaseRates {
            beta: self.beta,
            gamma: self.gamma,
            sigma: self.sigma,
        }
    }

    /// Conserved total `N`. `E0` only counts for SEIR.
    pub fn population(&self) -> f64 {
        match self.model {
            ModelKind::Sir => self.s0 + self.i0 + self.r0,
            ModelKind::Seir => self.s0 + self.e0 + self.i0 + self.r0,
        }
    }

    /// Number of fixed-size steps covering the horizon: `floor(days / dt)`.
    pub fn steps(&self) -> usize {
        if self.dt <= 0.0 || self.days <= 0.0 {
            return 0;
        }
        // Guards against 160.0 / 0.2 landing a hair under 800.
        (self.days / self.dt + 1e-9).floor() as usize
    }
}

/// Health-system capacity for one region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalCapacity {
    pub total_beds: f64,
    pub icu_beds: f64,
    pub ventilators: f64,
    pub health_workers: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionProfile {
    #[serde(default)]
    pub name: String,
    pub population: f64,
    pub hospital_capacity: Option<HospitalCapacity>,
}

/// Fraction of currently infectious people needing each level of care.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClinicalRates {
    pub hospitalization: f64,
    pub icu: f64,
    pub ventilator: f64,
    /// Infection fatality ratio while ICU demand stays within capacity.
    pub base_fatality: f64,
    /// Infection fatality ratio once ICU capacity has been exceeded.
    pub collapsed_fatality: f64,
}

impl Default for ClinicalRates {
    fn default() -> Self {
        Self {
            hospitalization: 0.15,
            icu: 0.05,
            ventilator: 0.025,
            base_fatality: 0.006,
            collapsed_fatality: 0.025,
        }
    }
}

/// Unit costs in local currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostModel {
    pub per_hospitalization: f64,
    pub per_icu_day: f64,
    pub per_death: f64,
    pub workforce_share: f64,
    pub missed_workdays: f64,
    pub daily_wage: f64,
    pub gdp_per_capita: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            per_hospitalization: 15_000.0,
            per_icu_day: 3_500.0,
            per_death: 50_000.0,
            workforce_share: 0.65,
            missed_workdays: 14.0,
            daily_wage: 150.0,
            gdp_per_capita: 25_000.0,
        }
    }
}
