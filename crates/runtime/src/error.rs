use crate::model::ModelError;
use thiserror::Error;

/// Turn-level failures.
///
/// Tool problems never show up here; they are reported to the model as
/// tool results. Either variant ends the current turn only; the engine stays
/// usable for the next one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("model backend unavailable after {attempts} attempt(s): {source}")]
    BackendUnavailable {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    #[error("no final answer after {rounds} model rounds")]
    ToolLoopExceeded { rounds: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
