use thiserror::Error;

/// Failure of a typed object operation.
///
/// `NotFound` and `Conflict` are distinct variants so callers can branch on them;
/// everything the backend itself reports ends up in `Backend`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error(
        "{kind} {namespace}/{name} was modified concurrently (resource version {expected}, stored {actual})"
    )]
    Conflict {
        kind: &'static str,
        namespace: String,
        name: String,
        expected: u64,
        actual: u64,
    },
    #[error("failed to encode or decode {kind}: {source}")]
    Codec {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl ClientError {
    pub fn not_found(kind: &'static str, namespace: &str, name: &str) -> Self {
        ClientError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, namespace: &str, name: &str) -> Self {
        ClientError::AlreadyExists {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict { .. })
    }
}
