use thiserror::Error;

/// Reasons a meal cannot be saved. All are recoverable: the draft is kept so
/// the user can fix it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Add at least one ingredient")]
    NoIngredients,

    #[error("Choose a pain score between 1 and 5")]
    MissingPain,

    #[error("Pain score must be between 1 and 5 (got {0})")]
    PainOutOfRange(i64),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No entry at position {0}")]
    NoSuchEntry(usize),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
