//! The provider's response envelope.
//!
//! Every provider endpoint wraps its payload as
//! `{ "code": <i64>, "message": <string?>, "data": <payload?> }`.
//! Success is recognized only via `code == 0`; HTTP-level success does
//! not imply logical success.

use serde::Deserialize;

use crate::error::ProviderError;

/// Logical-success discriminator value.
pub const CODE_OK: i64 = 0;

/// Generic provider response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning a non-zero code (or an absent payload
    /// on a nominally successful response) into [`ProviderError::Api`].
    pub fn into_data(self) -> Result<T, ProviderError> {
        if self.code != CODE_OK {
            return Err(ProviderError::Api {
                code: self.code,
                message: self
                    .message
                    .unwrap_or_else(|| "no message provided".to_string()),
            });
        }
        self.data.ok_or(ProviderError::Api {
            code: CODE_OK,
            message: "success envelope carried no data".to_string(),
        })
    }
}
