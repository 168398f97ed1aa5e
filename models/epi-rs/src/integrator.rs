//! Fixed-step classical RK4 for the compartmental models.
//!
//! ```text
//! k1 = f(y, t)
//! k2 = f(y + dt/2·k1, t + dt/2)
//! k3 = f(y + dt/2·k2, t + dt/2)
//! k4 = f(y + dt·k3, t + dt)
//! y' = y + dt/6·(k1 + 2k2 + 2k3 + k4)
//! ```
//!
//! After every step the state is clamped to be non-negative, vaccination
//! moves people from S to R, and the total is rescaled to `N` if it drifted
//! by more than the configured tolerance. None of these raise errors.

use nalgebra::DVector;

use crate::interventions::EffectiveRates;
use crate::parameters::ModelKind;

pub type State = DVector<f64>;

/// Position of each compartment inside a state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub susceptible: usize,
    pub exposed: Option<usize>,
    pub infectious: usize,
    pub recovered: usize,
}

impl ModelKind {
    pub fn layout(self) -> Layout {
        match self {
            ModelKind::Sir => Layout {
                susceptible: 0,
                exposed: None,
                infectious: 1,
                recovered: 2,
            },
            ModelKind::Seir => Layout {
                susceptible: 0,
                exposed: Some(1),
                infectious: 2,
                recovered: 3,
            },
        }
    }

    /// Right-hand side of the model for fixed rates.
    pub fn derivatives(self, y: &State, rates: &EffectiveRates, population: f64) -> State {
        match self {
            ModelKind::Sir => {
                let (s, i) = (y[0], y[1]);
                let infection = rates.beta * s * i / population;
                let recovery = rates.gamma * i;
                DVector::from_vec(vec![-infection, infection - recovery, recovery])
            }
            ModelKind::Seir => {
                let (s, e, i) = (y[0], y[1], y[2]);
                let infection = rates.beta * s * i / population;
                let progression = rates.sigma * e;
                let recovery = rates.gamma * i;
                DVector::from_vec(vec![
                    -infection,
                    infection - progression,
                    progression - recovery,
                    recovery,
                ])
            }
        }
    }
}

/// One classical RK4 step of `dy/dt = f(y, t)`.
pub fn rk4_step<F>(f: F, y: &State, t: f64, dt: f64) -> State
where
    F: Fn(&State, f64) -> State,
{
    let half_dt = 0.5 * dt;
    let k1 = f(y, t);
    let k2 = f(&(y + &k1 * half_dt), t + half_dt);
    let k3 = f(&(y + &k2 * half_dt), t + half_dt);
    let k4 = f(&(y + &k3 * dt), t + dt);
    y + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// What the post-step safeguards did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepCorrections {
    pub clamped: bool,
    pub rescaled: bool,
    pub vaccinated: f64,
}

pub struct Integrator {
    pub model: ModelKind,
    pub population: f64,
    pub dt: f64,
    pub tolerance: f64,
}

impl Integrator {
    /// Advances `y` from `t` by one step. `rates` are held fixed for the
    /// whole step, including the four stage evaluations.
    pub fn step(&self, y: &State, t: f64, rates: &EffectiveRates) -> (State, StepCorrections) {
        let model = self.model;
        let population = self.population;
        let mut next = rk4_step(
            |state, _t| model.derivatives(state, rates, population),
            y,
            t,
            self.dt,
        );
        let mut corrections = StepCorrections::default();

        for value in next.iter_mut() {
            if *value < 0.0 {
                *value = 0.0;
                corrections.clamped = true;
            }
        }

        if rates.vaccination_rate > 0.0 {
            let layout = model.layout();
            let moved = next[layout.susceptible].min(rates.vaccination_rate * self.dt * population);
            next[layout.susceptible] -= moved;
            next[layout.recovered] += moved;
            corrections.vaccinated = moved;
        }

        let total = next.sum();
        if total > 0.0 && (total - population).abs() > self.tolerance * population {
            next *= population / total;
            corrections.rescaled = true;
        }

        (next, corrections)
    }
}
