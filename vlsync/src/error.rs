//! Types d'erreurs pour vlsync

/// Erreurs du cycle de synchronisation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Échec côté service distant : timeout, connexion, statut non-2xx
    /// ou corps de réponse illisible. Fait échouer le cycle entier.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Échec d'écriture ou de lecture sur le cache local.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Enregistrement distant invalide (champ manquant ou mal typé).
    /// Traité à la granularité de la playlist ou de la vidéo fautive.
    #[error("Data error: {0}")]
    Data(String),

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
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Data(err.to_string())
    }
}

/// Type Result spécialisé pour vlsync
pub type Result<T> = std::result::Result<T, Error>;
