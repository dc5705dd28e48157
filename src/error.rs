use crate::types::{HostError, TypeError};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDirection {
    Read,
    Write,
}

impl fmt::Display for AccessDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDirection::Read => write!(f, "readable"),
            AccessDirection::Write => write!(f, "settable"),
        }
    }
}

/// Broad classification of [`BridgeError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A type could not be described or is hidden from scripts.
    Configuration,
    /// No operation fits, or the value cannot be called or constructed.
    Resolution,
    /// A property lacks the accessor the script tried to use.
    Access,
    /// A host operation threw, or its arguments did not convert.
    Invocation,
    Construction,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Configuration(#[from] TypeError),
    #[error("host type {0} is not visible to scripts")]
    ClassHidden(String),
    #[error("no such operation: {0}")]
    NoSuchOperation(String),
    #[error("no overload of {name} accepts {arity} argument(s)")]
    NoMatchingOperation { name: String, arity: usize },
    #[error("property {name} is not {direction}")]
    Access {
        name: String,
        direction: AccessDirection,
    },
    #[error("{operation} failed: {source}")]
    Invocation {
        operation: String,
        #[source]
        source: HostError,
    },
    #[error("could not construct {type_name}: {message}")]
    Construction { type_name: String, message: String },
    #[error("cannot convert {from} to {to}")]
    Coercion { from: String, to: String },
    #[error("{0} is not a function")]
    NotCallable(String),
    #[error("{0} is not a constructor")]
    NotConstructible(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Configuration(_) | BridgeError::ClassHidden(_) => ErrorKind::Configuration,
            BridgeError::NoSuchOperation(_)
            | BridgeError::NoMatchingOperation { .. }
            | BridgeError::NotCallable(_)
            | BridgeError::NotConstructible(_) => ErrorKind::Resolution,
            BridgeError::Access { .. } => ErrorKind::Access,
            BridgeError::Invocation { .. } | BridgeError::Coercion { .. } => ErrorKind::Invocation,
            BridgeError::Construction { .. } => ErrorKind::Construction,
        }
    }

    pub(crate) fn not_readable(name: impl Into<String>) -> Self {
        BridgeError::Access {
            name: name.into(),
            direction: AccessDirection::Read,
        }
    }

    pub(crate) fn not_settable(name: impl Into<String>) -> Self {
        BridgeError::Access {
            name: name.into(),
            direction: AccessDirection::Write,
        }
    }
}
