use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("invalid simulation config: {}", .errors.join("; "))]
    InvalidConfig { errors: Vec<String> },

    #[error("trajectory has no samples")]
    EmptyTrajectory,

    #[error("at least {required} scenarios are needed, got {found}")]
    InsufficientScenarios { required: usize, found: usize },

    #[error("invalid capacity data: {0}")]
    InvalidCapacity(String),
}

pub type SimResult<T> = Result<T, SimError>;
