use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Provider(#[from] crate::providers::ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state error: {0}")]
    State(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_auth_error_display() {
        let err = AppError::Auth("invalid token".to_string());
        assert_eq!(err.to_string(), "authentication failed: invalid token");
    }

    #[test]
    fn test_state_error_display() {
        let err = AppError::State("corrupt file".to_string());
        assert_eq!(err.to_string(), "state error: corrupt file");
    }

    #[test]
    fn test_manifest_error_display() {
        let err = AppError::Manifest("duplicate resource address 'a.b'".to_string());
        assert_eq!(
            err.to_string(),
            "manifest error: duplicate resource address 'a.b'"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("missing token".to_string());
        assert_eq!(err.to_string(), "configuration error: missing token");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_provider_error_from_conversion() {
        let provider_err = crate::providers::ProviderError::UnknownProvider("aws".to_string());
        let app_err: AppError = provider_err.into();
        assert!(matches!(app_err, AppError::Provider(_)));
        assert!(app_err.to_string().contains("unknown provider: aws"));
    }
}
