//! Error types raised by the CouchDB score store.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required setting is absent.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// The database could not be reached or created.
    #[error("failed to reach CouchDB database `{database}`")]
    Database {
        /// Database name.
        database: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// The database endpoint answered with an unexpected status.
    #[error("unexpected CouchDB database response status {status} for `{database}`")]
    DatabaseStatus {
        /// Database name.
        database: String,
        /// Status received.
        status: StatusCode,
    },
    /// A request could not be sent.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        /// Request path.
        path: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// A request was answered with an unexpected status.
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus {
        /// Request path.
        path: String,
        /// Status received.
        status: StatusCode,
    },
    /// A response body could not be decoded.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        /// Request path.
        path: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// A score document does not match the expected layout.
    #[error("invalid score document `{doc_id}`")]
    InvalidDocument {
        /// Document identifier.
        doc_id: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::InvalidDocument { doc_id, source } => StorageError::Corrupt {
                key: doc_id,
                reason: source.to_string(),
            },
            other => StorageError::unavailable("couchdb".into(), other),
        }
    }
}
