//! Decision metrics derived from a finished trajectory.
//!
//! Each function is a pure transform; [`ScenarioMetrics::compute`] bundles
//! them together with regional capacity data.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::alerts::{
    AlertInputs, AlertReport, GrowthIndicators, InterventionLevel, early_warning_alerts,
};
use crate::error::{SimError, SimResult};
use crate::parameters::{
    BaseRates, ClinicalRates, CostModel, HospitalCapacity, ModelKind, RegionProfile,
};
use crate::runner::{SimulationOutput, Trajectory};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub index: usize,
    pub day: f64,
    pub value: f64,
}

/// First sample holding the maximum of `series`.
pub fn find_peak(series: &[f64], time: &[f64]) -> Option<Peak> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &value) in series.iter().enumerate() {
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, value)| Peak {
        index,
        day: time[index],
        value,
    })
}

pub fn attack_rate(trajectory: &Trajectory, population: f64) -> f64 {
    trajectory.final_recovered() / population
}

/// Growth of R over the run, less the people who reached it by vaccination.
pub fn total_infected(trajectory: &Trajectory, vaccinated: f64) -> f64 {
    match (trajectory.recovered.first(), trajectory.recovered.last()) {
        (Some(first), Some(last)) => (last - first - vaccinated).max(0.0),
        _ => 0.0,
    }
}

/// `beta / gamma` for both models; the latent period changes the time course
/// but not the threshold.
pub fn basic_reproduction_number(_model: ModelKind, rates: &BaseRates) -> f64 {
    rates.basic_reproduction_number()
}

pub fn effective_reproduction(trajectory: &Trajectory, r0: f64) -> Vec<f64> {
    let population = trajectory.population();
    trajectory
        .susceptible
        .iter()
        .map(|s| r0 * s / population)
        .collect()
}

/// Ordinary least-squares slope of `ln(values)` against `time`, skipping
/// non-positive values. `None` with fewer than two usable points.
pub fn log_linear_slope(values: &[f64], time: &[f64]) -> Option<f64> {
    let points: Vec<(f64, f64)> = values
        .iter()
        .zip(time)
        .filter(|(v, _)| **v > 0.0)
        .map(|(v, t)| (*t, v.ln()))
        .collect();
    if points.len() < 2 {
        return None;
    }
    let design = DMatrix::from_fn(points.len(), 2, |row, col| {
        if col == 0 { 1.0 } else { points[row].0 }
    });
    let observed = DVector::from_iterator(points.len(), points.iter().map(|p| p.1));
    let transposed = design.transpose();
    let coefficients = (&transposed * &design).try_inverse()? * (&transposed * observed);
    Some(coefficients[1])
}

/// Exponential growth rate over the opening window of the epidemic.
pub fn initial_growth_rate(trajectory: &Trajectory) -> Option<f64> {
    let len = trajectory.len();
    let window = usize::min(20, (len as f64 * 0.15).floor() as usize);
    log_linear_slope(
        &trajectory.infectious[..window],
        &trajectory.time[..window],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoublingMethod {
    DirectObservation,
    LogLinearFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoublingTime {
    pub days: f64,
    pub method: DoublingMethod,
}

/// Looks for `I` doubling inside the first 20% of samples (ignoring counts
/// of 10 or fewer), then falls back to `ln 2 / r` from the log-linear fit.
/// `None` when no positive growth is found.
pub fn doubling_time(trajectory: &Trajectory) -> Option<DoublingTime> {
    let infectious = &trajectory.infectious;
    let early = (infectious.len() as f64 * 0.2).floor() as usize;
    if let Some(&first) = infectious.first() {
        for index in 1..early {
            if infectious[index] >= 2.0 * first && infectious[index] > 10.0 {
                return Some(DoublingTime {
                    days: trajectory.time[index] - trajectory.time[0],
                    method: DoublingMethod::DirectObservation,
                });
            }
        }
    }

    match initial_growth_rate(trajectory) {
        Some(rate) if rate > 0.0 => Some(DoublingTime {
            days: std::f64::consts::LN_2 / rate,
            method: DoublingMethod::LogLinearFit,
        }),
        _ => None,
    }
}

/// Demand for one level of care against its capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareDemand {
    pub series: Vec<f64>,
    pub peak: f64,
    pub capacity: f64,
    pub occupancy_percent: f64,
    /// Distinct simulated days on which demand exceeded capacity.
    pub saturation_days: usize,
    /// Area under the demand curve, in patient-days.
    pub patient_days: f64,
}

impl CareDemand {
    pub fn from_series(series: Vec<f64>, time: &[f64], capacity: f64) -> Self {
        let peak = series.iter().copied().fold(0.0, f64::max);
        let mut saturated: Vec<i64> = series
            .iter()
            .zip(time)
            .filter(|(demand, _)| **demand > capacity)
            .map(|(_, t)| t.floor() as i64)
            .collect();
        saturated.dedup();
        let patient_days = trapezoid(&series, time);
        Self {
            peak,
            capacity,
            occupancy_percent: peak / capacity * 100.0,
            saturation_days: saturated.len(),
            patient_days,
            series,
        }
    }

    pub fn exceeds_capacity(&self) -> bool {
        self.peak > self.capacity
    }
}

fn trapezoid(values: &[f64], time: &[f64]) -> f64 {
    values
        .windows(2)
        .zip(time.windows(2))
        .map(|(v, t)| (v[0] + v[1]) / 2.0 * (t[1] - t[0]))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalDemand {
    pub hospital: CareDemand,
    pub icu: CareDemand,
    pub ventilators: CareDemand,
}

impl HospitalDemand {
    pub fn compute(
        trajectory: &Trajectory,
        capacity: &HospitalCapacity,
        clinical: &ClinicalRates,
    ) -> Self {
        let demand = |ratio: f64, beds: f64| {
            let series = trajectory.infectious.iter().map(|i| ratio * i).collect();
            CareDemand::from_series(series, &trajectory.time, beds)
        };
        Self {
            hospital: demand(clinical.hospitalization, capacity.total_beds),
            icu: demand(clinical.icu, capacity.icu_beds),
            ventilators: demand(clinical.ventilator, capacity.ventilators),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MortalityEstimate {
    pub estimated_deaths: f64,
    pub deaths_without_collapse: f64,
    pub additional_deaths: f64,
    pub fatality_ratio: f64,
    pub hospital_collapse: bool,
}

impl MortalityEstimate {
    /// Applies the collapsed-care fatality ratio whenever ICU demand ever
    /// exceeded ICU capacity.
    pub fn compute(total_infected: f64, icu: &CareDemand, clinical: &ClinicalRates) -> Self {
        let hospital_collapse = icu.exceeds_capacity();
        let fatality_ratio = if hospital_collapse {
            clinical.collapsed_fatality
        } else {
            clinical.base_fatality
        };
        let estimated_deaths = total_infected * fatality_ratio;
        let deaths_without_collapse = total_infected * clinical.base_fatality;
        Self {
            estimated_deaths,
            deaths_without_collapse,
            additional_deaths: (estimated_deaths - deaths_without_collapse).max(0.0),
            fatality_ratio,
            hospital_collapse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicImpact {
    pub hospitalization_costs: f64,
    pub icu_costs: f64,
    pub mortality_costs: f64,
    pub workforce_loss: f64,
    pub total_cost: f64,
    pub cost_per_capita: f64,
    /// Total cost over `population × gdp_per_capita`.
    pub gdp_fraction: f64,
}

impl EconomicImpact {
    pub fn compute(
        total_infected: f64,
        demand: &HospitalDemand,
        mortality: &MortalityEstimate,
        population: f64,
        clinical: &ClinicalRates,
        costs: &CostModel,
    ) -> Self {
        let hospitalization_costs =
            total_infected * clinical.hospitalization * costs.per_hospitalization;
        let icu_costs = demand.icu.patient_days * costs.per_icu_day;
        let mortality_costs = mortality.estimated_deaths * costs.per_death;
        let workforce_loss =
            total_infected * costs.workforce_share * costs.missed_workdays * costs.daily_wage;
        let total_cost = hospitalization_costs + icu_costs + mortality_costs + workforce_loss;
        Self {
            hospitalization_costs,
            icu_costs,
            mortality_costs,
            workforce_loss,
            total_cost,
            cost_per_capita: total_cost / population,
            gdp_fraction: total_cost / (population * costs.gdp_per_capita),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpidemicSummary {
    pub peak: Peak,
    /// Excludes vaccinated people, unlike `attack_rate`.
    pub total_infected: f64,
    pub attack_rate: f64,
    /// First day after the peak with fewer than one infectious person.
    pub extinction_day: Option<f64>,
    pub infected_person_days: f64,
}

impl EpidemicSummary {
    pub fn compute(trajectory: &Trajectory, population: f64, vaccinated: f64) -> SimResult<Self> {
        let peak = find_peak(&trajectory.infectious, &trajectory.time)
            .ok_or(SimError::EmptyTrajectory)?;
        let extinction_day = trajectory
            .infectious
            .iter()
            .zip(&trajectory.time)
            .skip(peak.index + 1)
            .find(|(i, _)| **i < 1.0)
            .map(|(_, t)| *t);
        Ok(Self {
            peak,
            total_infected: total_infected(trajectory, vaccinated),
            attack_rate: attack_rate(trajectory, population),
            extinction_day,
            infected_person_days: trapezoid(&trajectory.infectious, &trajectory.time),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    pub summary: EpidemicSummary,
    #[serde(rename = "R0")]
    pub r0: f64,
    pub effective_reproduction: Vec<f64>,
    pub doubling_time: Option<DoublingTime>,
    pub hospital_demand: HospitalDemand,
    pub mortality: MortalityEstimate,
    pub economic_impact: EconomicImpact,
    pub growth: GrowthIndicators,
    pub alerts: AlertReport,
    pub intervention_level: InterventionLevel,
}

impl ScenarioMetrics {
    pub fn compute(
        output: &SimulationOutput,
        rates: &BaseRates,
        region: &RegionProfile,
        clinical: &ClinicalRates,
        costs: &CostModel,
    ) -> SimResult<Self> {
        let trajectory = &output.trajectory;
        if trajectory.is_empty() {
            return Err(SimError::EmptyTrajectory);
        }
        let capacity = region.hospital_capacity.ok_or_else(|| {
            SimError::InvalidCapacity(format!("region '{}' has no hospital capacity", region.name))
        })?;
        if !(region.population > 0.0) {
            return Err(SimError::InvalidCapacity("population must be positive".to_string()));
        }
        if !(capacity.icu_beds > 0.0 && capacity.ventilators > 0.0 && capacity.total_beds > 0.0) {
            return Err(SimError::InvalidCapacity(
                "bed, ICU and ventilator counts must be positive".to_string(),
            ));
        }

        let summary = EpidemicSummary::compute(
            trajectory,
            region.population,
            output.diagnostics.total_vaccinated,
        )?;
        let r0 = basic_reproduction_number(trajectory.model, rates);
        let hospital_demand = HospitalDemand::compute(trajectory, &capacity, clinical);
        let mortality =
            MortalityEstimate::compute(summary.total_infected, &hospital_demand.icu, clinical);
        let economic_impact = EconomicImpact::compute(
            summary.total_infected,
            &hospital_demand,
            &mortality,
            region.population,
            clinical,
            costs,
        );
        let alerts = early_warning_alerts(&AlertInputs::from_trajectory(
            trajectory,
            &hospital_demand,
            region.population,
        ));
        let intervention_level =
            InterventionLevel::from_icu_occupancy(hospital_demand.icu.occupancy_percent / 100.0);

        Ok(Self {
            summary,
            r0,
            effective_reproduction: effective_reproduction(trajectory, r0),
            doubling_time: doubling_time(trajectory),
            hospital_demand,
            mortality,
            economic_impact,
            growth: GrowthIndicators::compute(trajectory),
            alerts,
            intervention_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertLevel;
    use crate::interventions::{Intervention, InterventionSet, Vaccination};
    use crate::parameters::SimulationConfig;
    use crate::runner::ScenarioRunner;

    fn capacity(icu_beds: f64) -> HospitalCapacity {
        HospitalCapacity {
            total_beds: 2_000.0,
            icu_beds,
            ventilators: 150.0,
            health_workers: 5_000.0,
        }
    }

    fn reference() -> (SimulationConfig, Trajectory) {
        let config = SimulationConfig::sir(9900.0, 100.0, 0.0, 0.4, 0.1, 160.0);
        let trajectory = ScenarioRunner::run(&config).unwrap().trajectory;
        (config, trajectory)
    }

    #[test]
    fn test_reference_scenario_metrics() {
        let (config, trajectory) = reference();
        let r0 = basic_reproduction_number(config.model, &config.base_rates());
        assert!((r0 - 4.0).abs() < 1e-12);

        let peak = find_peak(&trajectory.infectious, &trajectory.time).unwrap();
        assert!(peak.value > 100.0);
        assert!(peak.day < 160.0);
        assert!(attack_rate(&trajectory, config.population()) > 0.9);
    }

    #[test]
    fn test_find_peak_takes_first_maximum() {
        let peak = find_peak(&[1.0, 5.0, 3.0, 5.0], &[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(peak.index, 1);
        assert_eq!(peak.day, 1.0);
        assert!(find_peak(&[], &[]).is_none());
    }

    #[test]
    fn test_effective_reproduction_tracks_susceptibles() {
        let (_, trajectory) = reference();
        let r_eff = effective_reproduction(&trajectory, 4.0);
        assert_eq!(r_eff.len(), trajectory.len());
        assert!((r_eff[0] - 4.0 * 0.99).abs() < 1e-12);
        assert!(r_eff.last().unwrap() < &1.0);
    }

    #[test]
    fn test_log_linear_slope_recovers_exponent() {
        let time: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let values: Vec<f64> = time.iter().map(|t| 3.0 * (0.23 * t).exp()).collect();
        let slope = log_linear_slope(&values, &time).unwrap();
        assert!((slope - 0.23).abs() < 1e-9);
        assert!(log_linear_slope(&[1.0], &[0.0]).is_none());
    }

    #[test]
    fn test_doubling_time_for_pure_exponential_growth() {
        let growth_rate = 0.2 * std::f64::consts::LN_2;
        let config = SimulationConfig::sir(10_000_000.0, 10.0, 0.0, growth_rate, 0.0, 160.0);
        let trajectory = ScenarioRunner::run(&config).unwrap().trajectory;
        let expected = std::f64::consts::LN_2 / growth_rate;

        let fitted = initial_growth_rate(&trajectory).unwrap();
        let fitted_doubling = std::f64::consts::LN_2 / fitted;
        assert!((fitted_doubling - expected).abs() / expected < 0.05);

        // Direct observation is quantized to the sampling step.
        let doubling = doubling_time(&trajectory).unwrap();
        assert_eq!(doubling.method, DoublingMethod::DirectObservation);
        assert!((doubling.days - expected).abs() <= trajectory.dt + 1e-9);
    }

    #[test]
    fn test_doubling_time_absent_without_growth() {
        let config = SimulationConfig::sir(9900.0, 100.0, 0.0, 0.1, 0.2, 160.0);
        let trajectory = ScenarioRunner::run(&config).unwrap().trajectory;
        assert!(doubling_time(&trajectory).is_none());
    }

    #[test]
    fn test_care_demand_saturation_days() {
        let time: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
        let series = vec![1.0, 2.0, 6.0, 7.0, 4.0, 6.0, 2.0, 1.0, 0.0, 0.0];
        let demand = CareDemand::from_series(series, &time, 5.0);
        assert_eq!(demand.peak, 7.0);
        assert!((demand.occupancy_percent - 140.0).abs() < 1e-12);
        // samples at t=1.0, 1.5 (day 1) and t=2.5 (day 2)
        assert_eq!(demand.saturation_days, 2);
        assert!(demand.exceeds_capacity());
    }

    #[test]
    fn test_mortality_depends_on_icu_capacity() {
        let clinical = ClinicalRates::default();
        let time = vec![0.0, 1.0];
        let within = CareDemand::from_series(vec![10.0, 20.0], &time, 20.0);
        let over = CareDemand::from_series(vec![10.0, 21.0], &time, 20.0);

        let low = MortalityEstimate::compute(10_000.0, &within, &clinical);
        assert!(!low.hospital_collapse);
        assert!((low.estimated_deaths - 60.0).abs() < 1e-9);
        assert_eq!(low.additional_deaths, 0.0);

        let high = MortalityEstimate::compute(10_000.0, &over, &clinical);
        assert!(high.hospital_collapse);
        assert!((high.estimated_deaths - 250.0).abs() < 1e-9);
        assert!((high.additional_deaths - 190.0).abs() < 1e-9);
    }

    #[test]
    fn test_economic_impact_components() {
        let (_, trajectory) = reference();
        let clinical = ClinicalRates::default();
        let costs = CostModel::default();
        let demand = HospitalDemand::compute(&trajectory, &capacity(100.0), &clinical);
        let mortality = MortalityEstimate::compute(1_000.0, &demand.icu, &clinical);
        let impact =
            EconomicImpact::compute(1_000.0, &demand, &mortality, 10_000.0, &clinical, &costs);
        assert!((impact.workforce_loss - 1_000.0 * 0.65 * 14.0 * 150.0).abs() < 1e-6);
        assert!((impact.hospitalization_costs - 150.0 * 15_000.0).abs() < 1e-6);
        let sum = impact.hospitalization_costs
            + impact.icu_costs
            + impact.mortality_costs
            + impact.workforce_loss;
        assert!((impact.total_cost - sum).abs() < 1e-6);
        assert!((impact.cost_per_capita - impact.total_cost / 10_000.0).abs() < 1e-9);
        assert!((impact.gdp_fraction - impact.cost_per_capita / 25_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_extinction_and_burden() {
        let config = SimulationConfig::sir(9900.0, 100.0, 0.0, 0.4, 0.1, 365.0);
        let trajectory = ScenarioRunner::run(&config).unwrap().trajectory;
        let summary = EpidemicSummary::compute(&trajectory, config.population(), 0.0).unwrap();
        let extinction = summary.extinction_day.unwrap();
        assert!(extinction > summary.peak.day);
        // Each infection lasts 1/gamma = 10 days on average.
        assert!((summary.infected_person_days / summary.total_infected - 10.0).abs() < 0.5);
    }

    #[test]
    fn test_vaccinated_are_not_infections() {
        let vaccination = InterventionSet::new(vec![Intervention::Vaccination(Vaccination {
            start_day: 0.0,
            daily_rate: 0.01,
        })]);
        let config = SimulationConfig::sir(9900.0, 100.0, 0.0, 0.4, 0.1, 160.0)
            .with_interventions(vaccination);
        let output = ScenarioRunner::run(&config).unwrap();
        let vaccinated = output.diagnostics.total_vaccinated;
        let trajectory = &output.trajectory;
        let summary =
            EpidemicSummary::compute(trajectory, config.population(), vaccinated).unwrap();

        assert!(vaccinated > 1_000.0);
        assert!(summary.total_infected > 0.0);
        assert!((summary.total_infected + vaccinated - trajectory.final_recovered()).abs() < 1e-6);
        assert!((summary.attack_rate - trajectory.final_recovered() / 10_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_scenario_metrics_bundle() {
        let (config, trajectory) = reference();
        let region = RegionProfile {
            name: "test".to_string(),
            population: config.population(),
            hospital_capacity: Some(capacity(100.0)),
        };
        let output = ScenarioRunner::run(&config).unwrap();
        let metrics = ScenarioMetrics::compute(
            &output,
            &config.base_rates(),
            &region,
            &ClinicalRates::default(),
            &CostModel::default(),
        )
        .unwrap();
        assert!(metrics.mortality.hospital_collapse);
        assert!(metrics.hospital_demand.icu.saturation_days > 0);
        assert_eq!(metrics.alerts.overall_risk_level, AlertLevel::Critical);
        assert_eq!(metrics.effective_reproduction.len(), trajectory.len());
    }

    #[test]
    fn test_scenario_metrics_requires_capacity() {
        let (config, _) = reference();
        let region = RegionProfile {
            name: "nowhere".to_string(),
            population: 10_000.0,
            hospital_capacity: None,
        };
        let output = ScenarioRunner::run(&config).unwrap();
        let err = ScenarioMetrics::compute(
            &output,
            &config.base_rates(),
            &region,
            &ClinicalRates::default(),
            &CostModel::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidCapacity(_)));
    }
}
