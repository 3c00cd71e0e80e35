//! Error taxonomy shared by the validation and payment paths.
//!
//! Every failure names where it came from so an operator can tell apart
//! "our data was malformed", "the counterparty rejected us" and
//! "we could not reach the counterparty".

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The decode or encode step at which malformed data was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The outer transaction envelope.
    Transaction,
    /// The base64 layer around the nested payment data.
    PaymentDataEncoding,
    /// The JSON inside the base64 layer.
    PaymentData,
    /// The static merchant validation request body.
    RequestBody,
    ValidationUrl,
    /// Rendering the gateway submission document.
    Document,
    /// A value that cannot be carried in an XML document.
    DocumentContent,
    /// Reading the gateway's reply document.
    Acknowledgement,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Transaction => "transaction",
            Stage::PaymentDataEncoding => "payment-data-encoding",
            Stage::PaymentData => "payment-data",
            Stage::RequestBody => "request-body",
            Stage::ValidationUrl => "validation-url",
            Stage::Document => "document",
            Stage::DocumentContent => "document-content",
            Stage::Acknowledgement => "acknowledgement",
        };
        f.write_str(name)
    }
}

/// Coarse classification used by the front door to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Never retried.
    Encoding,
    /// Network or TLS failure. Safe to retry at a higher layer.
    Transport,
    /// The counterparty answered with a non-success status.
    Rejected,
    /// Local setup problem: missing settings or unusable credentials.
    Configuration,
}

#[must_use = "errors should be handled or propagated"]
#[derive(Debug, Error)]
pub enum Error {
    #[error("encoding failure at {stage}: {reason}")]
    Encoding { stage: Stage, reason: String },

    /// Carries the status line, e.g. `401 Unauthorized`.
    #[error("rejected by counterparty: {0}")]
    RejectedByGateway(String),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The merchant certificate or key could not be loaded or used.
    #[error("merchant identity error: {0}")]
    Identity(String),
}

impl Error {
    pub fn encoding(stage: Stage, reason: impl fmt::Display) -> Self {
        Error::Encoding {
            stage,
            reason: reason.to_string(),
        }
    }

    /// A JSON failure reduced to its category and position. serde_json
    /// quotes offending values in its messages, and those may be token data.
    pub fn json(stage: Stage, e: &serde_json::Error) -> Self {
        let category = match e.classify() {
            serde_json::error::Category::Io => "io error",
            serde_json::error::Category::Syntax => "syntax error",
            serde_json::error::Category::Data => "unexpected shape",
            serde_json::error::Category::Eof => "unexpected end of input",
        };
        Error::encoding(
            stage,
            format!("{} at line {} column {}", category, e.line(), e.column()),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Encoding { .. } => ErrorKind::Encoding,
            Error::RejectedByGateway(_) => ErrorKind::Rejected,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Configuration(_) | Error::Identity(_) => ErrorKind::Configuration,
        }
    }

    /// The stage of an encoding failure, if this is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Encoding { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::Identity(e.to_string())
    }
}

#[cfg(test)]
mod error_tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_stage_names() {
        let err = Error::encoding(Stage::PaymentDataEncoding, "invalid byte");
        assert_eq!(
            err.to_string(),
            "encoding failure at payment-data-encoding: invalid byte"
        );
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert_eq!(err.stage(), Some(Stage::PaymentDataEncoding));
    }

    #[test]
    fn test_rejection_kind() {
        let err = Error::RejectedByGateway("401 Unauthorized".into());
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.stage(), None);
        assert_eq!(err.to_string(), "rejected by counterparty: 401 Unauthorized");
    }

    #[test]
    fn test_json_reason_omits_values() {
        let e = serde_json::from_str::<Vec<u8>>(r#"["MIAGCSqGSIb3DQEHAqCAMIACAQEx"]"#).unwrap_err();
        let err = Error::json(Stage::PaymentData, &e);
        let rendered = err.to_string();
        assert!(rendered.starts_with("encoding failure at payment-data: unexpected shape at line 1 column"));
        assert!(!rendered.contains("MIAGCSqGSIb3DQEHAqCAMIACAQEx"));
    }

    #[test]
    fn test_identity_is_configuration() {
        assert_eq!(
            Error::Identity("no key".into()).kind(),
            ErrorKind::Configuration
        );
    }
}
