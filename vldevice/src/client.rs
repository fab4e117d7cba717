//! Enregistrement du player et heartbeat périodique
//!
//! Le player se déclare auprès du service distant au démarrage puis lui
//! envoie son état à intervalle fixe. Après trois heartbeats consécutifs
//! en échec le player se ré-enregistre, le serveur ayant pu perdre sa
//! trace.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::service::SystemdUnit;

/// Timeout par défaut des requêtes HTTP (30 secondes)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Heartbeats consécutifs en échec avant ré-enregistrement
pub const MAX_HEARTBEAT_FAILURES: u32 = 3;

/// Fichier device-tree exposant le modèle de la carte
const MODEL_PATH: &str = "/proc/device-tree/model";

/// Identité du player transmise à l'enregistrement
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl DeviceInfo {
    /// Construit l'identité du player, modèle matériel inclus si lisible
    pub fn collect(device_id: impl Into<String>, name: impl Into<String>) -> Self {
        let model = std::fs::read_to_string(MODEL_PATH)
            .ok()
            .map(|s| s.trim_end_matches('\0').trim().to_string());
        Self {
            device_id: device_id.into(),
            name: name.into(),
            model,
        }
    }
}

/// État périodique transmis par le heartbeat
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    /// État de l'unité systemd de lecture (`active`, `inactive`, ...)
    pub player_status: String,
}

/// Client HTTP d'enregistrement et de heartbeat
#[derive(Debug, Clone)]
pub struct DeviceClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl DeviceClient {
    /// Crée un client pour le service distant donné
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Remote(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Crée un client à partir d'un `reqwest::Client` existant
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Enregistre le player auprès du service distant
    ///
    /// Un 400 "already registered" est un succès : le player garde son
    /// identité d'une exécution à l'autre.
    pub async fn register(&self, info: &DeviceInfo) -> Result<()> {
        let url = format!("{}/devices/register", self.base_url);
        tracing::info!("Registering device {} at {}", info.device_id, url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(info)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                if body.contains("already registered") {
                    tracing::info!("Device {} already registered", info.device_id);
                    Ok(())
                } else {
                    Err(Error::Registration(body))
                }
            }
            status => Err(Error::Remote(format!(
                "registration returned status {status}"
            ))),
        }
    }

    /// Envoie un heartbeat avec l'état courant du player
    pub async fn send_status(&self, status: &DeviceStatus) -> Result<()> {
        let url = format!("{}/devices/status", self.base_url);
        tracing::debug!("Sending status for device {}", status.device_id);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(status)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "status update returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Compte les heartbeats en échec et décide du ré-enregistrement
#[derive(Debug)]
pub struct HeartbeatMonitor {
    consecutive_failures: u32,
    max_failures: u32,
}

impl HeartbeatMonitor {
    pub fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures,
        }
    }

    /// Enregistre le résultat d'un heartbeat ; vrai si le player doit
    /// se ré-enregistrer
    pub fn record(&mut self, success: bool) -> bool {
        if success {
            self.consecutive_failures = 0;
            return false;
        }
        self.consecutive_failures += 1;
        tracing::warn!(
            "Heartbeat failed ({}/{})",
            self.consecutive_failures,
            self.max_failures
        );
        if self.consecutive_failures >= self.max_failures {
            self.consecutive_failures = 0;
            return true;
        }
        false
    }
}

/// Boucle de heartbeat, à lancer dans une tâche dédiée
///
/// Ne retourne jamais : un échec d'envoi est compté et, après
/// [`MAX_HEARTBEAT_FAILURES`] échecs consécutifs, le player se
/// ré-enregistre puis la boucle reprend.
pub async fn run_heartbeat(
    client: DeviceClient,
    info: DeviceInfo,
    player: SystemdUnit,
    interval: Duration,
) {
    let mut monitor = HeartbeatMonitor::new(MAX_HEARTBEAT_FAILURES);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await; // le premier tick est immédiat, on l'ignore

    loop {
        ticker.tick().await;
        let status = DeviceStatus {
            device_id: info.device_id.clone(),
            player_status: player.active_state().await,
        };
        let success = match client.send_status(&status).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Cannot send heartbeat: {}", err);
                false
            }
        };
        if monitor.record(success) {
            tracing::warn!("Too many heartbeat failures, registering again");
            if let Err(err) = client.register(&info).await {
                tracing::warn!("Re-registration failed: {}", err);
            }
        }
    }
}
