//! Conversions from external infrastructure errors into domain errors.

use nestbuffer_domain::NestBufferError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub NestBufferError);

impl From<InfraError> for NestBufferError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<NestBufferError> for InfraError {
    fn from(value: NestBufferError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoNestBufferError {
    fn into_nestbuffer(self) -> NestBufferError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → NestBufferError */
/* -------------------------------------------------------------------------- */

impl IntoNestBufferError for HttpError {
    fn into_nestbuffer(self) -> NestBufferError {
        if self.is_timeout() {
            return NestBufferError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return NestBufferError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return NestBufferError::InvalidData(format!("failed to decode HTTP body: {self}"));
        }

        if self.is_builder() {
            return NestBufferError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => NestBufferError::Auth(message),
                400..=499 if code != 429 => NestBufferError::InvalidInput(message),
                _ => NestBufferError::Network(message),
            };
        }

        NestBufferError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_nestbuffer())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → NestBufferError */
/* -------------------------------------------------------------------------- */

impl IntoNestBufferError for JsonError {
    fn into_nestbuffer(self) -> NestBufferError {
        use serde_json::error::Category;

        match self.classify() {
            Category::Io => NestBufferError::Network(format!("failed to read JSON body: {self}")),
            Category::Syntax | Category::Eof => {
                NestBufferError::InvalidData(format!("malformed JSON response: {self}"))
            }
            Category::Data => {
                NestBufferError::InvalidData(format!("unexpected JSON response shape: {self}"))
            }
        }
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        Self(value.into_nestbuffer())
    }
}

/* -------------------------------------------------------------------------- */
/* toml::de::Error → NestBufferError */
/* -------------------------------------------------------------------------- */

impl IntoNestBufferError for toml::de::Error {
    fn into_nestbuffer(self) -> NestBufferError {
        NestBufferError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        Self(value.into_nestbuffer())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
