//! Types d'erreurs pour vldevice

/// Erreurs d'enregistrement, de heartbeat et de contrôle du player
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Registration rejected: {0}")]
    Registration(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Remote(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Command(err.to_string())
    }
}

/// Type Result spécialisé pour vldevice
pub type Result<T> = std::result::Result<T, Error>;
