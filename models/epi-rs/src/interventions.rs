//! Time-dependent public-health interventions.
//!
//! Every intervention kind folds into [`EffectiveRates`] through
//! [`InterventionSet::evaluate`]. Rate effects compose multiplicatively;
//! vaccination is a separate S→R transfer applied by the integrator.

use serde::{Deserialize, Serialize};

use crate::parameters::BaseRates;

/// Contact reduction active only inside `[start_day, start_day + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quarantine {
    pub start_day: f64,
    pub duration: f64,
    pub effectiveness: f64,
}

/// Standing contact reduction from `start_day` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialDistancing {
    pub start_day: f64,
    pub reduction: f64,
}

/// Moves `daily_rate · N` people per day straight from S to R.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vaccination {
    pub start_day: f64,
    pub daily_rate: f64,
}

/// Mass testing and isolation. Shortens the effective infectious period by
/// scaling gamma with `1 + effectiveness / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testing {
    pub start_day: f64,
    pub effectiveness: f64,
}

/// Improved clinical treatment, scales gamma with `1 + effectiveness`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub start_day: f64,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Intervention {
    Quarantine(Quarantine),
    SocialDistancing(SocialDistancing),
    Vaccination(Vaccination),
    Testing(Testing),
    Treatment(Treatment),
}

impl Intervention {
    pub fn start_day(&self) -> f64 {
        match self {
            Intervention::Quarantine(q) => q.start_day,
            Intervention::SocialDistancing(d) => d.start_day,
            Intervention::Vaccination(v) => v.start_day,
            Intervention::Testing(t) => t.start_day,
            Intervention::Treatment(t) => t.start_day,
        }
    }

    pub fn is_active(&self, t: f64) -> bool {
        match self {
            Intervention::Quarantine(q) => t >= q.start_day && t < q.start_day + q.duration,
            _ => t >= self.start_day(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Intervention::Quarantine(_) => "quarantine",
            Intervention::SocialDistancing(_) => "social distancing",
            Intervention::Vaccination(_) => "vaccination",
            Intervention::Testing(_) => "testing",
            Intervention::Treatment(_) => "treatment",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Intervention::Quarantine(q) => format!(
                "quarantine {:.0}% effective from day {} for {} days",
                q.effectiveness * 100.0,
                q.start_day,
                q.duration
            ),
            Intervention::SocialDistancing(d) => format!(
                "social distancing cutting contacts {:.0}% from day {}",
                d.reduction * 100.0,
                d.start_day
            ),
            Intervention::Vaccination(v) => format!(
                "vaccination of {:.2}% of the population per day from day {}",
                v.daily_rate * 100.0,
                v.start_day
            ),
            Intervention::Testing(t) => format!(
                "testing and isolation {:.0}% effective from day {}",
                t.effectiveness * 100.0,
                t.start_day
            ),
            Intervention::Treatment(t) => format!(
                "treatment {:.0}% effective from day {}",
                t.effectiveness * 100.0,
                t.start_day
            ),
        }
    }

    /// Folds this intervention's effect at `t` into `rates`.
    fn apply(&self, t: f64, rates: &mut EffectiveRates) {
        if !self.is_active(t) {
            return;
        }
        match self {
            Intervention::Quarantine(q) => rates.beta *= 1.0 - q.effectiveness,
            Intervention::SocialDistancing(d) => rates.beta *= 1.0 - d.reduction,
            Intervention::Vaccination(v) => rates.vaccination_rate += v.daily_rate,
            Intervention::Testing(test) => rates.gamma *= 1.0 + 0.5 * test.effectiveness,
            Intervention::Treatment(treat) => rates.gamma *= 1.0 + treat.effectiveness,
        }
    }
}

/// Rates in force at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveRates {
    pub beta: f64,
    pub gamma: f64,
    pub sigma: f64,
    /// Fraction of the total population moved from S to R per day.
    pub vaccination_rate: f64,
}

impl From<BaseRates> for EffectiveRates {
    fn from(base: BaseRates) -> Self {
        Self {
            beta: base.beta,
            gamma: base.gamma,
            sigma: base.sigma,
            vaccination_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterventionSet(Vec<Intervention>);

impl InterventionSet {
    pub fn new(interventions: Vec<Intervention>) -> Self {
        Self(interventions)
    }

    pub fn as_slice(&self) -> &[Intervention] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intervention> {
        self.0.iter()
    }

    /// Returns a new set with `intervention` appended.
    pub fn with(&self, intervention: Intervention) -> Self {
        let mut interventions = self.0.clone();
        interventions.push(intervention);
        Self(interventions)
    }

    /// Effective rates at time `t`. Pure in `(t, base, self)`.
    pub fn evaluate(&self, t: f64, base: BaseRates) -> EffectiveRates {
        self.0
            .iter()
            .fold(EffectiveRates::from(base), |mut rates, intervention| {
                intervention.apply(t, &mut rates);
                rates
            })
    }

    pub fn describe(&self) -> String {
        if self.0.is_empty() {
            return "no intervention".to_string();
        }
        self.0
            .iter()
            .map(Intervention::describe)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl FromIterator<Intervention> for InterventionSet {
    fn from_iter<T: IntoIterator<Item = Intervention>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: BaseRates = BaseRates {
        beta: 0.4,
        gamma: 0.1,
        sigma: 0.2,
    };

    fn quarantine(start_day: f64, duration: f64, effectiveness: f64) -> Intervention {
        Intervention::Quarantine(Quarantine {
            start_day,
            duration,
            effectiveness,
        })
    }

    fn distancing(start_day: f64, reduction: f64) -> Intervention {
        Intervention::SocialDistancing(SocialDistancing {
            start_day,
            reduction,
        })
    }

    #[test]
    fn test_no_interventions_returns_base_rates() {
        let rates = InterventionSet::default().evaluate(12.0, BASE);
        assert_eq!(rates, EffectiveRates::from(BASE));
    }

    #[test]
    fn test_quarantine_and_distancing_compose_multiplicatively() {
        let set = InterventionSet::new(vec![quarantine(0.0, 100.0, 0.7), distancing(0.0, 0.5)]);
        for t in [0.0, 10.0, 55.5, 99.8] {
            let rates = set.evaluate(t, BASE);
            assert!((rates.beta - 0.06).abs() < 1e-12, "t={t} beta={}", rates.beta);
            assert_eq!(rates.gamma, BASE.gamma);
        }
    }

    #[test]
    fn test_quarantine_window_is_half_open() {
        let set = InterventionSet::new(vec![quarantine(30.0, 60.0, 0.7)]);
        assert_eq!(set.evaluate(29.8, BASE).beta, 0.4);
        assert!((set.evaluate(30.0, BASE).beta - 0.12).abs() < 1e-12);
        assert!((set.evaluate(89.8, BASE).beta - 0.12).abs() < 1e-12);
        assert_eq!(set.evaluate(90.0, BASE).beta, 0.4);
    }

    #[test]
    fn test_standing_policies_stay_on() {
        let set = InterventionSet::new(vec![
            distancing(20.0, 0.5),
            Intervention::Vaccination(Vaccination {
                start_day: 60.0,
                daily_rate: 0.005,
            }),
            Intervention::Treatment(Treatment {
                start_day: 10.0,
                effectiveness: 0.2,
            }),
        ]);
        let early = set.evaluate(5.0, BASE);
        assert_eq!(early, EffectiveRates::from(BASE));

        let late = set.evaluate(1_000.0, BASE);
        assert!((late.beta - 0.2).abs() < 1e-12);
        assert!((late.gamma - 0.12).abs() < 1e-12);
        assert_eq!(late.vaccination_rate, 0.005);
        assert_eq!(late.sigma, BASE.sigma);
    }

    #[test]
    fn test_testing_and_treatment_stack_on_gamma() {
        let set = InterventionSet::new(vec![
            Intervention::Testing(Testing {
                start_day: 0.0,
                effectiveness: 0.6,
            }),
            Intervention::Treatment(Treatment {
                start_day: 0.0,
                effectiveness: 0.5,
            }),
        ]);
        let rates = set.evaluate(1.0, BASE);
        assert!((rates.gamma - 0.1 * 1.3 * 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_tagged_variants() {
        let set: InterventionSet = serde_json::from_str(
            r#"[
                {"kind": "socialDistancing", "startDay": 20, "reduction": 0.5},
                {"kind": "vaccination", "startDay": 60, "dailyRate": 0.005}
            ]"#,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[0], distancing(20.0, 0.5));
        assert!(set.describe().contains("vaccination"));
    }
}
