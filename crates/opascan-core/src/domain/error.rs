//! Scan error taxonomy.

use std::time::Duration;

use opascan_storage::StorageError;

use crate::gateway::GatewayError;
use crate::parameters::ParameterError;

/// Errors that abort a scan.
///
/// Every variant is terminal for the scan that raised it: no partial
/// result is produced and nothing is retried. Entrypoints decide how to
/// report them.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Input or rule location yielded no documents.
    #[error(transparent)]
    NotFound(StorageError),

    /// No runner can be selected, or a document does not fit its dialect.
    #[error("invalid dialect: {0}")]
    InvalidDialect(String),

    #[error("parameter parse error: {0}")]
    ParameterParse(#[from] ParameterError),

    #[error("policy compile failed: {0}")]
    Compile(String),

    #[error("policy evaluation failed: {0}")]
    Evaluation(String),

    /// Storage I/O failure other than "not found".
    #[error("storage transport failed: {0}")]
    Transport(StorageError),

    #[error("document {uri} could not be decoded: {reason}")]
    Decode { uri: String, reason: String },

    /// Two fragments disagree on a leaf value under a strict merge.
    #[error("merge conflict at {path}")]
    MergeConflict { path: String },

    #[error("scan timed out after {0:?}")]
    Timeout(Duration),

    #[error("unknown policy library: {0}")]
    UnknownLibrary(String),
}

impl From<StorageError> for ScanError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            ScanError::NotFound(err)
        } else {
            ScanError::Transport(err)
        }
    }
}

impl From<GatewayError> for ScanError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Compile(msg) => ScanError::Compile(msg),
            GatewayError::Evaluation(msg) => ScanError::Evaluation(msg),
        }
    }
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_classified() {
        let err: ScanError = StorageError::PathNotFound {
            path: "tfplan.json".to_string(),
        }
        .into();
        assert!(matches!(err, ScanError::NotFound(_)));
        assert_eq!(err.to_string(), "Input file tfplan.json does not exist.");

        let err: ScanError = StorageError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, ScanError::Transport(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    fn chain(err: &ScanError) -> Vec<String> {
        std::iter::successors(Some(err as &dyn std::error::Error), |e| e.source())
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn storage_messages_are_reported_once() {
        let err: ScanError = StorageError::PathNotFound {
            path: "tfplan.json".to_string(),
        }
        .into();
        assert_eq!(chain(&err), vec!["Input file tfplan.json does not exist."]);

        let err: ScanError = StorageError::Transport("connection reset".to_string()).into();
        let messages = chain(&err).join("\n");
        assert_eq!(messages.matches("connection reset").count(), 1);
    }

    #[test]
    fn gateway_errors_are_classified() {
        let err: ScanError = GatewayError::Compile("rego_parse_error".to_string()).into();
        assert!(matches!(err, ScanError::Compile(_)));

        let err: ScanError = GatewayError::Evaluation("eval_conflict_error".to_string()).into();
        assert!(matches!(err, ScanError::Evaluation(_)));
    }

    #[test]
    fn decode_error_names_document() {
        let err = ScanError::Decode {
            uri: "infra/vpc.json".to_string(),
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.to_string().contains("infra/vpc.json"));
    }
}
