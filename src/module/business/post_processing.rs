use crate::domain::analysis::{strategies, AnalysisError, Row, Strategy};
use crate::library::helpers::panic_message;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Reasons why the data of a reply could not be post-processed
#[derive(Debug, Error)]
pub enum PostProcessingError {
    /// The data is not a list of records
    #[error("expected a list of records")]
    UnexpectedData(#[source] serde_json::Error),
    /// The records do not carry the data required by the strategy
    #[error("analysis failed")]
    Analysis(#[from] AnalysisError),
    /// The strategy panicked
    #[error("post-processing panicked: {0}")]
    Panicked(String),
}

/// Table of post-processing strategies keyed by the action whose replies they transform
///
/// Actions without a strategy are passed through unchanged.
#[derive(Clone)]
pub struct PostProcessors {
    strategies: HashMap<String, Strategy>,
}

impl Default for PostProcessors {
    fn default() -> Self {
        strategies()
            .into_iter()
            .fold(Self::empty(), |processors, (action, strategy)| {
                processors.register(action, strategy)
            })
    }
}

impl PostProcessors {
    /// Creates a table without any strategies, passing every reply through
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registers a strategy for an action, replacing any previous one
    pub fn register(mut self, action: impl Into<String>, strategy: Strategy) -> Self {
        self.strategies.insert(action.into(), strategy);
        self
    }

    /// Whether replies to the action are transformed
    pub fn transforms(&self, action: &str) -> bool {
        self.strategies.contains_key(action)
    }

    /// Transforms the data of a reply to the given action
    ///
    /// Panics raised by the strategy are caught and reported as an error.
    pub fn apply(&self, action: &str, data: Value) -> Result<Value, PostProcessingError> {
        let strategy = match self.strategies.get(action) {
            Some(strategy) => *strategy,
            None => return Ok(data),
        };

        let rows: Vec<Row> =
            serde_json::from_value(data).map_err(PostProcessingError::UnexpectedData)?;

        match catch_unwind(AssertUnwindSafe(|| strategy(&rows))) {
            Ok(result) => Ok(result?),
            Err(payload) => Err(PostProcessingError::Panicked(panic_message(
                payload.as_ref(),
            ))),
        }
    }
}
