//! Extension pour intégrer la synchronisation dans vlconfig
//!
//! Ce module fournit le trait `SyncConfigExt` qui permet de construire
//! les réglages de l'orchestrateur et le client du catalogue depuis
//! `vlconfig::Config`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use vlconfig::Config;

use crate::client::CatalogClient;
use crate::orchestrator::SyncSettings;

/// Nom de répertoire par défaut du cache vidéo, relatif au répertoire
/// de configuration
const DEFAULT_CACHE_DIR: &str = "videos";

/// Trait d'extension pour construire la synchronisation depuis la
/// configuration
pub trait SyncConfigExt {
    /// Répertoire du cache vidéo, créé s'il n'existait pas
    fn get_video_cache_dir(&self) -> Result<String>;

    /// Réglages de l'orchestrateur (identifiant du player + cache)
    fn sync_settings(&self) -> Result<SyncSettings>;

    /// Client du catalogue configuré (URL distante + timeout)
    fn create_catalog_client(&self) -> Result<CatalogClient>;
}

impl SyncConfigExt for Config {
    fn get_video_cache_dir(&self) -> Result<String> {
        self.get_managed_dir(&["cache", "directory"], DEFAULT_CACHE_DIR)
    }

    fn sync_settings(&self) -> Result<SyncSettings> {
        Ok(SyncSettings {
            device_id: self.get_device_id()?,
            cache_dir: PathBuf::from(self.get_video_cache_dir()?),
        })
    }

    fn create_catalog_client(&self) -> Result<CatalogClient> {
        let timeout = self.get_remote_timeout_secs()? as u64;
        CatalogClient::builder()
            .base_url(self.get_remote_base_url())
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| anyhow::anyhow!("cannot build catalog client: {e}"))
    }
}
