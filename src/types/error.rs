use std::{error::Error, fmt};
use thiserror::Error;

/// Failures raised while introspecting a host class.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("introspection of {type_name} denied: {reason}")]
    IntrospectionDenied { type_name: String, reason: String },
    #[error("{type_name} inherits from restricted class {restricted}")]
    RestrictedAncestor { type_name: String, restricted: String },
}

/// An error thrown by a host operation or instantiator.
///
/// The optional cause is kept as a boxed error so script-level handlers can
/// still walk down to the root failure through [`Error::source`].
#[derive(Debug)]
pub struct HostError {
    message: String,
    cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}
