use axum::http::StatusCode;
use thiserror::Error;

/// Failure reported by a directory client.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to connect to directory: {0}")]
    Connect(String),

    #[error("bind rejected (rc={code}): {message}")]
    Bind { code: u32, message: String },

    #[error("search failed: {0}")]
    Search(String),

    #[error("directory operation timed out")]
    Timeout,
}

/// Why a credential check did not succeed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    InvalidInput,

    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(#[source] DirectoryError),

    #[error("service account bind failed: {0}")]
    ServiceAuthFailed(#[source] DirectoryError),

    #[error("user not found or ambiguous")]
    UserNotFoundOrAmbiguous,

    #[error("invalid credentials")]
    InvalidCredentials,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput => StatusCode::BAD_REQUEST,
            AuthError::UserNotFoundOrAmbiguous | AuthError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::DirectoryUnavailable(_) | AuthError::ServiceAuthFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to return to the client. Server-side failures share one message.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidInput => "Username and password are required",
            AuthError::UserNotFoundOrAmbiguous => "User not found or multiple entries",
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::DirectoryUnavailable(_) | AuthError::ServiceAuthFailed(_) => {
                "Directory service error"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::InvalidInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::UserNotFoundOrAmbiguous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::DirectoryUnavailable(DirectoryError::Timeout).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::ServiceAuthFailed(DirectoryError::Bind { code: 49, message: String::new() }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_do_not_name_the_step() {
        let connect = AuthError::DirectoryUnavailable(DirectoryError::Connect("refused".into()));
        let bind = AuthError::ServiceAuthFailed(DirectoryError::Bind {
            code: 49,
            message: "invalidCredentials".into(),
        });
        assert_eq!(connect.public_message(), bind.public_message());
        assert!(!connect.public_message().contains("refused"));
    }
}
