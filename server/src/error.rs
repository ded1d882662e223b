use common::ContestantId;
use thiserror::Error;

/// Why a contestant was refused entry into the queues
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmissionError {
    #[error("engine is not started")]
    NotStarted,
    #[error("engine has been destroyed")]
    Destroyed,
    #[error("contestant has no valid id")]
    InvalidId,
    #[error("contestant member count must be at least 1")]
    EmptyRoster,
    #[error("contestant member count {member_count} is above side capacity {capacity}")]
    RosterTooLarge { member_count: u32, capacity: u32 },
    #[error("contestant skill rating must be a finite number")]
    InvalidRating,
    #[error("contestant tolerance must be a finite, non-negative number")]
    InvalidTolerance,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WithdrawalError {
    #[error("contestant {0} is not in matching")]
    NotFound(ContestantId),
    #[error("engine has been destroyed")]
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    #[error("engine has already been destroyed")]
    Destroyed,
    #[error("no tokio runtime available to schedule matching rounds")]
    NoRuntime,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("fighter_num must be a positive even number, got {0}")]
    InvalidFighterNum(u32),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("failed to parse matching config: {0}")]
    Parse(String),
}
