use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::library::BoxedError;

/// Type erased, serializable error which retains the error chain information
///
/// Handlers may fail for reasons only they understand. Before such a failure is put on the
/// wire as the `msg` of a failed response, it is flattened into this structure so that the
/// calling tier receives the complete chain of causes as one readable line.
///
/// When the Error from which this is created contains another BlackboxError in its
/// source chain, it will be consumed and integrated so that the causes are not repeated.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct BlackboxError {
    causes: Vec<String>,
}

impl BlackboxError {
    /// Creates a new instance from any error type
    pub fn new<E: Error + 'static>(e: E) -> Self {
        (&e as &(dyn Error + 'static)).into()
    }

    /// Creates a new instance from a boxed error type
    pub fn from_boxed(e: &BoxedError) -> Self {
        (e.as_ref() as &(dyn Error + 'static)).into()
    }

    /// Creates an instance which carries a single message and no further causes
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            causes: vec![message.into()],
        }
    }

    /// Individual causes, outermost first
    pub fn causes(&self) -> &[String] {
        &self.causes
    }
}

impl Error for BlackboxError {}

impl Display for BlackboxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.causes.is_empty() {
            return write!(f, "unknown error");
        }

        write!(f, "{}", self.causes.join(": "))
    }
}

impl From<&(dyn Error + 'static)> for BlackboxError {
    fn from(e: &(dyn Error + 'static)) -> Self {
        let mut source: Option<&(dyn Error + 'static)> = Some(e);
        let mut causes: Vec<String> = Vec::new();

        while let Some(error) = source {
            // Integrate any child BlackboxErrors and use ToString for anything else
            if let Some(blackbox_error) = error.downcast_ref::<BlackboxError>() {
                causes.extend(blackbox_error.causes.iter().cloned());
            } else {
                causes.push(error.to_string());
            }

            source = error.source();
        }

        Self { causes }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    enum TestError {
        #[error("query failed")]
        Internal(#[from] BlackboxError),
    }

    #[test]
    fn handle_no_cause() {
        let error = BlackboxError { causes: Vec::new() };
        assert_eq!(error.to_string(), "unknown error");
    }

    #[test]
    fn consume_nested() {
        let lower_error = BlackboxError {
            causes: vec![String::from("cause1"), String::from("cause2")],
        };
        let middle_error = TestError::from(lower_error);
        let high_error = BlackboxError::new(middle_error);

        assert_eq!(high_error.causes(), ["query failed", "cause1", "cause2"]);
    }

    #[test]
    fn format_on_one_line() {
        let boxed: BoxedError = Box::new(TestError::from(BlackboxError::message("no such table")));
        let formatted = BlackboxError::from_boxed(&boxed).to_string();

        assert_eq!(formatted, "query failed: no such table");
    }
}
