pub mod batch_updater;
pub mod engine;
pub mod record_creator;
pub mod run_log;
pub mod session;
pub mod source;
pub mod token;

pub use crate::domain::model::{
    Action, Failure, FailureReason, ImportReport, Record, Success, Token, Unit, UnitResult,
    ID_FIELD, UNKNOWN_ID,
};
pub use crate::domain::ports::TokenProvider;
pub use crate::utils::error::Result;
