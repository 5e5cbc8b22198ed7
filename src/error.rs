//! Error types and handling for the hazard analytics service

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// External data source an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// NASA POWER daily point climate data
    NasaPower,
    /// CHIRPS daily rainfall through Earth Engine
    Chirps,
    /// NASA FIRMS fire hotspots
    Firms,
}

impl ProviderKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::NasaPower => "nasa_power",
            ProviderKind::Chirps => "chirps",
            ProviderKind::Firms => "firms",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for the hazard analytics service
#[derive(Error, Debug)]
pub enum HazardError {
    /// Malformed location, date or bbox input
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Missing credentials or invalid settings
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Upstream provider failed (network, non-2xx or malformed payload)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl HazardError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new provider error attributed to `provider`
    pub fn provider<S: Into<String>>(provider: ProviderKind, message: S) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Short machine-readable tag used in error bodies
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HazardError::Validation { .. } => "validation",
            HazardError::Configuration { .. } => "configuration",
            HazardError::Provider { .. } => "provider",
            HazardError::Io { .. } => "io",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            HazardError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            HazardError::Validation { message } => format!("Invalid input: {message}"),
            HazardError::Configuration { message } => {
                format!("Service misconfigured: {message}")
            }
            HazardError::Provider { provider, message } => {
                format!("Error building hazard features: {provider} failed: {message}")
            }
            HazardError::Io { source } => format!("File operation failed: {source}"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<ProviderKind>,
}

impl IntoResponse for HazardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::debug!(kind = self.kind(), "{}", self);
        }

        let provider = match &self {
            HazardError::Provider { provider, .. } => Some(*provider),
            _ => None,
        };
        let body = ErrorBody {
            error: self.kind(),
            message: self.user_message(),
            provider,
        };
        (status, Json(body)).into_response()
    }
}
