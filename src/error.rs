//! Error types for planning and recipe import

/// Errors that abort a planning request.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no recipe produces '{0}'")]
    UncraftableRoot(String),
    #[error("target rate must be a positive number, got {0}")]
    InvalidRate(f64),
    #[error("invalid planner setting: {0}")]
    InvalidConfig(String),
}

/// A recipe definition line that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("line {line}: not a recipe definition")]
    Syntax { line: usize },
    #[error("line {line}: bad quantity '{text}'")]
    Quantity { line: usize, text: String },
    #[error("line {line}: recipe '{id}' has no inputs")]
    NoInputs { line: usize, id: String },
}
