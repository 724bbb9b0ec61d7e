use crate::controller::ProfileState;
use aie_hal::HalError;
use resources::{ErrorClass, ResourceError};
use serde::{Deserialize, Serialize};
use signal_path::PathError;
use std::fmt;
use thiserror::Error;

/// Status returned to callers that only need a coarse outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    Failure,
    InvalidArgs,
}

impl StatusCode {
    pub fn of<T>(result: &Result<T, ProfileError>) -> Self {
        match result {
            Ok(_) => StatusCode::Ok,
            Err(err) => err.status(),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Ok => write!(f, "ok"),
            StatusCode::Failure => write!(f, "failure"),
            StatusCode::InvalidArgs => write!(f, "invalid arguments"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[source] PathError),

    #[error("Capacity exhausted: {0}")]
    CapacityExhausted(#[source] ResourceError),

    #[error("Cannot {operation} while {state}")]
    PreconditionViolation {
        operation: &'static str,
        state: ProfileState,
    },

    #[error("Resource error: {0}")]
    Resource(#[source] ResourceError),

    #[error("Device error: {0}")]
    Hal(#[from] HalError),
}

impl ProfileError {
    pub(crate) fn precondition(operation: &'static str, state: ProfileState) -> Self {
        ProfileError::PreconditionViolation { operation, state }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ProfileError::InvalidArgument(_) => ErrorClass::InvalidArgument,
            ProfileError::CapacityExhausted(_) => ErrorClass::CapacityExhausted,
            ProfileError::PreconditionViolation { .. } => ErrorClass::PreconditionViolation,
            ProfileError::Resource(err) => err.class(),
            ProfileError::Hal(_) => ErrorClass::Device,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.class() {
            ErrorClass::InvalidArgument => StatusCode::InvalidArgs,
            _ => StatusCode::Failure,
        }
    }
}

impl From<ResourceError> for ProfileError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Hal(hal) => ProfileError::Hal(hal),
            err => match err.class() {
                ErrorClass::CapacityExhausted => ProfileError::CapacityExhausted(err),
                ErrorClass::InvalidArgument => {
                    ProfileError::InvalidArgument(PathError::Resource(err))
                }
                _ => ProfileError::Resource(err),
            },
        }
    }
}

impl From<PathError> for ProfileError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Resource(err) => err.into(),
            err => ProfileError::InvalidArgument(err),
        }
    }
}
