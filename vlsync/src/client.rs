//! Client HTTP du catalogue distant
//!
//! Fournit l'accès en lecture seule au service qui assigne les playlists
//! au player : liste des playlists actives et téléchargement des vidéos.
//! Le client ne fait aucun retry interne ; c'est l'orchestrateur qui
//! décide de retenter au tick suivant.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::model::{decode_manifest, Manifest};

/// URL par défaut du service distant
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Timeout par défaut des requêtes HTTP (30 secondes)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// User-Agent par défaut
pub const DEFAULT_USER_AGENT: &str = "VLAgent/0.1 (vlsync)";

/// Indices transmis au catalogue pour limiter la réponse
///
/// Le serveur peut utiliser `last_update` et la liste des playlists déjà
/// connues pour ne renvoyer que ce qui a changé ; les deux champs sont
/// facultatifs.
#[derive(Debug, Clone, Default)]
pub struct SyncHints {
    pub last_update: Option<chrono::DateTime<chrono::Utc>>,
    pub playlist_ids: Vec<String>,
}

/// Accès au catalogue distant, abstrait pour les tests
///
/// L'implémentation de production est [`CatalogClient`] ; les tests
/// substituent un double contrôlant les réponses et comptant les appels.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Récupère le manifeste des playlists assignées à `device_id`
    async fn active_playlists(&self, device_id: &str, hints: &SyncHints) -> Result<Manifest>;

    /// Télécharge une vidéo vers `dest` et retourne le nombre d'octets
    ///
    /// Le fichier `dest` est écrit en streaming. Si le serveur annonce
    /// un `Content-Length`, le nombre d'octets écrits doit lui
    /// correspondre, sinon le téléchargement est une erreur.
    async fn download_video(&self, video_id: &str, dest: &Path) -> Result<u64>;
}

/// Client HTTP du catalogue de playlists
///
/// Sans état et sans cache interne ; le cache de contenu est géré par
/// les couches supérieures.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Crée un client avec les réglages par défaut
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Crée un builder pour configurer le client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Crée un client à partir d'un `reqwest::Client` existant
    ///
    /// Utile pour partager un pool de connexions HTTP.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// URL de base du service distant
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn active_playlists_url(&self, device_id: &str, hints: &SyncHints) -> String {
        let mut url = format!("{}/playlists/active/{}", self.base_url, device_id);
        let mut params = Vec::new();
        if let Some(last_update) = &hints.last_update {
            params.push(format!("last_update={}", last_update.to_rfc3339()));
        }
        if !hints.playlist_ids.is_empty() {
            params.push(format!("playlist_ids={}", hints.playlist_ids.join(",")));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    fn download_url(&self, video_id: &str) -> String {
        format!("{}/videos/{}/download", self.base_url, video_id)
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn active_playlists(&self, device_id: &str, hints: &SyncHints) -> Result<Manifest> {
        let url = self.active_playlists_url(device_id, hints);
        tracing::debug!("Fetching active playlists: {}", url);

        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "catalog returned status {} for {}",
                response.status(),
                url
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("malformed catalog response: {e}")))?;

        decode_manifest(payload)
    }

    async fn download_video(&self, video_id: &str, dest: &Path) -> Result<u64> {
        let url = self.download_url(video_id);
        tracing::debug!("Downloading video {} from {}", video_id, url);

        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "download of video {} returned status {}",
                video_id,
                response.status()
            )));
        }

        let expected_size = response.content_length();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| Error::Remote(format!("stream error for video {video_id}: {e}")))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if let Some(expected) = expected_size {
            if written != expected {
                return Err(Error::Remote(format!(
                    "video {video_id} truncated: {written} bytes written, {expected} announced"
                )));
            }
        }

        Ok(written)
    }
}

/// Builder de [`CatalogClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Crée un builder avec les réglages par défaut
    pub fn new() -> Self {
        Self::default()
    }

    /// Fournit un client HTTP déjà construit
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Change l'URL de base du service distant
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Change le timeout des requêtes
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Change le User-Agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Construit le client
    pub fn build(self) -> Result<CatalogClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Remote(format!("cannot build HTTP client: {e}")))?,
        };

        Ok(CatalogClient {
            client,
            base_url: self.base_url,
            timeout: self.timeout,
        })
    }
}
