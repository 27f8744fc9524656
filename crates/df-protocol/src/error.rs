//! Errors raised while decoding service payloads.

/// Payload decoding failure.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid {what} payload: {source}")]
    InvalidPayload {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{what} payload is missing field '{field}'")]
    MissingField { what: &'static str, field: &'static str },
}

impl ProtocolError {
    /// Wrap a serde error for the named payload.
    pub fn invalid(what: &'static str, source: serde_json::Error) -> Self {
        Self::InvalidPayload { what, source }
    }
}

/// Decode a raw JSON value into a typed payload.
pub fn decode<T: serde::de::DeserializeOwned>(
    what: &'static str,
    value: &serde_json::Value,
) -> Result<T, ProtocolError> {
    T::deserialize(value).map_err(|e| ProtocolError::invalid(what, e))
}
