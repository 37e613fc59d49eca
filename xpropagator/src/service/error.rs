//! Service error taxonomy.
//!
//! Everything a handler can fail with, mapped onto the three status
//! codes the external transport understands. The transport layer calls
//! [`ServiceError::code`] and renders the display string as the status
//! message.

use thiserror::Error;

use crate::api::SinkSendError;
use crate::gate::GateError;
use crate::registry::RegistryError;

/// Status code consumed by the external transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed request: never retried.
    InvalidArgument,
    /// Engine or pipeline failure.
    Internal,
    /// The request's cancellation fired.
    Cancelled,
}

/// Errors surfaced by the service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request validation or parsing failed.
    #[error("{0}")]
    InvalidArgument(String),

    /// The engine returned a non-zero code.
    #[error("engine call failed: rc={rc}: {msg}")]
    Native {
        /// Raw engine return code.
        rc: i32,
        /// Engine last-error message.
        msg: String,
    },

    /// Internal pipeline failure.
    #[error("{0}")]
    Internal(String),

    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,

    /// The transport failed mid-stream.
    #[error(transparent)]
    StreamSend(#[from] SinkSendError),
}

impl ServiceError {
    /// The transport status code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ServiceError::Native { .. }
            | ServiceError::Internal(_)
            | ServiceError::StreamSend(_) => ErrorCode::Internal,
            ServiceError::Cancelled => ErrorCode::Cancelled,
        }
    }
}

impl From<GateError> for ServiceError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Cancelled => ServiceError::Cancelled,
            GateError::Native { rc, msg } => ServiceError::Native { rc, msg },
        }
    }
}

impl From<RegistryError> for ServiceError {
    fn from(e: RegistryError) -> Self {
        match e {
            // A malformed catalog number is the client's mistake.
            RegistryError::Parse(_) => ServiceError::InvalidArgument(e.to_string()),
            RegistryError::Cancelled => ServiceError::Cancelled,
            RegistryError::Gate(gate) => gate.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tle::TleError;

    #[test]
    fn codes_map_per_taxonomy() {
        assert_eq!(
            ServiceError::InvalidArgument("x".into()).code(),
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            ServiceError::Native {
                rc: 5,
                msg: "boom".into()
            }
            .code(),
            ErrorCode::Internal
        );
        assert_eq!(
            ServiceError::Internal("x".into()).code(),
            ErrorCode::Internal
        );
        assert_eq!(ServiceError::Cancelled.code(), ErrorCode::Cancelled);
        assert_eq!(
            ServiceError::StreamSend(SinkSendError("gone".into())).code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn registry_parse_error_becomes_invalid_argument() {
        let err: ServiceError = RegistryError::Parse(TleError::LineTooShort).into();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.to_string().contains("catalog number"));
    }

    #[test]
    fn registry_cancellations_become_cancelled() {
        let err: ServiceError = RegistryError::Cancelled.into();
        assert_eq!(err.code(), ErrorCode::Cancelled);
        let err: ServiceError = RegistryError::Gate(GateError::Cancelled).into();
        assert_eq!(err.code(), ErrorCode::Cancelled);
    }

    #[test]
    fn gate_native_error_keeps_rc_and_message() {
        let err: ServiceError = GateError::Native {
            rc: -3,
            msg: "bad elset".into(),
        }
        .into();
        match err {
            ServiceError::Native { rc, msg } => {
                assert_eq!(rc, -3);
                assert_eq!(msg, "bad elset");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
