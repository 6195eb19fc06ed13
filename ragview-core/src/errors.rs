use thiserror::Error;

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ClientError(Box<ErrorKind>);

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("HttpError: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("SerdeJsonError: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("TomlError: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl<E> From<E> for ClientError
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        ClientError(Box::new(ErrorKind::from(err)))
    }
}

impl ClientError {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// HTTP status of a non-2xx response, if that is what this error is.
    pub fn status(&self) -> Option<u16> {
        match self.kind() {
            ErrorKind::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_exposed_only_for_status_errors() {
        let err: ClientError = ErrorKind::Status {
            status: 502,
            body: "bad gateway".to_string(),
        }
        .into();
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("502"));

        let err: ClientError = ErrorKind::UnsupportedFileType("team.gif".to_string()).into();
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Unsupported file type: team.gif");
    }
}
