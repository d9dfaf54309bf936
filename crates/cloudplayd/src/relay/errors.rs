//! Failures raised by individual relay credential sources.

use thiserror::Error;

/// Reasons a configured relay source failed to produce entries.
///
/// These never abort a session: the provider chain records them and moves on
/// to the next source.
#[derive(Debug, Error)]
pub enum RelayProviderError {
    /// The configured API endpoint could not be turned into a request URL.
    #[error("invalid relay endpoint '{endpoint}': {reason}")]
    Endpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Why the endpoint was rejected.
        reason: String,
    },
    /// Building the HTTP client failed.
    #[error("failed to build relay HTTP client: {source}")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request did not complete (connection failure, timeout, body read).
    #[error("relay request failed: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The API answered with a non-success status.
    #[error("relay API answered with status {status}")]
    Status {
        /// HTTP status code returned by the API.
        status: u16,
    },
    /// The response body was not a relay server list.
    #[error("malformed relay response: {reason}")]
    MalformedBody {
        /// Description of the decoding failure.
        reason: String,
    },
    /// The response listed no servers.
    #[error("relay API returned an empty server list")]
    EmptyServerList,
    /// The shared secret could not key the HMAC.
    #[error("failed to derive relay credential: {reason}")]
    Hmac {
        /// Description of the keying failure.
        reason: String,
    },
}

/// Reasons a time-limited relay credential fails verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialRejection {
    /// The username did not start with a numeric expiry timestamp.
    #[error("relay username '{username}' lacks an expiry timestamp")]
    MalformedUsername {
        /// Offending username.
        username: String,
    },
    /// The credential expired before the verification time.
    #[error("relay credential expired at {expired_at} (now {now})")]
    Expired {
        /// Expiry encoded in the username.
        expired_at: u64,
        /// Verification time.
        now: u64,
    },
    /// The credential was not valid base64.
    #[error("relay credential is not valid base64")]
    Encoding,
    /// The credential did not match the recomputed HMAC.
    #[error("relay credential does not match")]
    Mismatch,
}
