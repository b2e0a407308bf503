// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Wandler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Wandler operations.
#[derive(Debug, Error)]
pub enum WandlerError {
    // -- Wire protocol errors --
    #[error("malformed frame: {0}")]
    Framing(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    // -- Dispatch errors --
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("input could not be decoded: {0}")]
    Decode(String),

    #[error("conversion failed: {0}")]
    Conversion(String),

    // -- Security errors --
    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("TLS error: {0}")]
    Tls(String),

    // -- Ambient --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WandlerError>;

/// Failure kind carried in a failure response on the wire.
///
/// This is the closed set a server may report back to a client. Local
/// transport failures (`Framing`, `Connect`, `Timeout`) never appear here —
/// they are produced on the client's own side, so a caller can always tell
/// "server unreachable" apart from "server rejected the request".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Operation name not in the supported set.
    UnsupportedOperation,
    /// Missing or malformed parameter for the chosen operation.
    InvalidParameter,
    /// The capability provider rejected the input bytes as not matching
    /// the declared format.
    Decode,
    /// Any other provider-level failure (encode error, render error, ...).
    Internal,
}

impl WandlerError {
    /// Classify this error for a wire failure response.
    ///
    /// Every dispatch-side error maps to exactly one wire kind; nothing
    /// escapes the dispatcher as a raw error.
    pub fn wire_kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::Decode(_) => ErrorKind::Decode,
            _ => ErrorKind::Internal,
        }
    }
}

impl ErrorKind {
    /// Reconstruct a `WandlerError` from a wire kind and the server's
    /// message, surfacing the message verbatim.
    pub fn into_error(self, message: String) -> WandlerError {
        match self {
            Self::UnsupportedOperation => WandlerError::UnsupportedOperation(message),
            Self::InvalidParameter => WandlerError::InvalidParameter(message),
            Self::Decode => WandlerError::Decode(message),
            Self::Internal => WandlerError::Conversion(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_map_to_their_wire_kind() {
        assert_eq!(
            WandlerError::UnsupportedOperation("x".into()).wire_kind(),
            ErrorKind::UnsupportedOperation
        );
        assert_eq!(
            WandlerError::InvalidParameter("x".into()).wire_kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(WandlerError::Decode("x".into()).wire_kind(), ErrorKind::Decode);
        assert_eq!(
            WandlerError::Conversion("x".into()).wire_kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn wire_kind_round_trips_through_into_error() {
        for kind in [
            ErrorKind::UnsupportedOperation,
            ErrorKind::InvalidParameter,
            ErrorKind::Decode,
            ErrorKind::Internal,
        ] {
            let err = kind.into_error("server said no".into());
            assert_eq!(err.wire_kind(), kind);
            assert!(err.to_string().contains("server said no"));
        }
    }

    #[test]
    fn wire_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnsupportedOperation).unwrap();
        assert_eq!(json, "\"unsupported_operation\"");
    }
}
