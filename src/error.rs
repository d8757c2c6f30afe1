use std::fmt;
use thiserror::Error;

use crate::kpi::KpiType;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record source error: {0}")]
    DataSource(String),

    #[error("Calculation of {kpi} failed: {message}")]
    Calculation { kpi: KpiType, message: String },

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid period format: {0}")]
    PeriodParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The indicator a calculation failure belongs to, if any.
    pub fn failed_kpi(&self) -> Option<KpiType> {
        match self {
            Error::Calculation { kpi, .. } => Some(*kpi),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Error::Migration(e.to_string())
    }
}

impl<E: fmt::Display> From<tokio_rusqlite::Error<E>> for Error {
    fn from(e: tokio_rusqlite::Error<E>) -> Self {
        Error::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
