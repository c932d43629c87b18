use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Date {0} not found in series")]
    DateNotFound(NaiveDate),

    #[error("Invalid stop: {0}")]
    InvalidStop(String),

    #[error("Invalid risk: {0}")]
    InvalidRisk(String),

    #[error("Invalid consolidation range: {0}")]
    InvalidRange(String),
}
