//! Errors from the provider HTTP layer.

/// Errors from the provider REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider HTTP error ({status}): {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The provider returned 2xx but the envelope carried a non-zero
    /// code, i.e. a logical failure.
    #[error("Provider error {code}: {message}")]
    Api {
        /// Provider envelope code.
        code: i64,
        /// Provider-supplied message, passed through verbatim.
        message: String,
    },
}
