use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ValidationError {
    #[error("Make sure you entered the pill name and selected a time")]
    MissingName,

    #[error("Make sure you entered the pill name and selected a time")]
    MissingTime,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("Preference store lock was poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
