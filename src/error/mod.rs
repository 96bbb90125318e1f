use {
    axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    sqlx::migrate::MigrateError,
    thiserror::Error,
    url::ParseError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("SQLx migrate error: {0}")]
    SqlxMigrate(#[from] MigrateError),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Cannot parse URL")]
    ParseError(#[from] ParseError),

    #[error("Failed to read dotenv file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provider not found: {0}")]
    ProviderNotFoundError(String),

    #[error("Sign up is disabled")]
    SignUpDisabled,

    #[error("Account linking refused for provider `{provider}`: {reason}")]
    AccountLinkingError { provider: String, reason: String },

    #[error("Request to {url} failed with status {status}")]
    Fetch { url: String, status: StatusCode },
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::ProviderNotFoundError(msg) => (
                StatusCode::NOT_FOUND,
                format!("OAuth provider not found: {msg}"),
            ),
            Self::SignUpDisabled => (StatusCode::FORBIDDEN, self.to_string()),
            Self::AccountLinkingError { .. } => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Fetch { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        (status, format!("{status}: {error_message}")).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_not_found_maps_to_404() {
        let response = Error::ProviderNotFoundError("gitlab".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn sign_up_disabled_maps_to_403() {
        let response = Error::SignUpDisabled.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_rate_limit_is_passed_through() {
        let response = Error::Fetch {
            url: "https://api.github.com/user".into(),
            status: StatusCode::TOO_MANY_REQUESTS,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let response = Error::ConfigError("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
