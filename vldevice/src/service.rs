//! Contrôle de l'unité systemd de lecture
//!
//! Le service de lecture est un processus séparé qui lit le m3u fusionné
//! en boucle ; après un cycle qui a changé le contenu il est redémarré
//! pour recharger sa playlist.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Code de sortie systemctl pour une unité inexistante
const SYSTEMCTL_NO_SUCH_UNIT: i32 = 4;

/// Une unité systemd pilotée par le player
#[derive(Debug, Clone)]
pub struct SystemdUnit {
    unit: String,
}

impl SystemdUnit {
    /// Crée un contrôleur pour l'unité donnée (ex: `videoloop.service`)
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }

    /// Nom de l'unité contrôlée
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// État de l'unité (`active`, `inactive`, `failed`, ...)
    ///
    /// Retourne `unknown` si systemctl est indisponible, pour que le
    /// heartbeat puisse toujours être envoyé.
    pub async fn active_state(&self) -> String {
        match Command::new("systemctl")
            .args(["is-active", &self.unit])
            .output()
            .await
        {
            Ok(output) => String::from_utf8_lossy(&output.stdout).trim().to_string(),
            Err(err) => {
                tracing::warn!("Cannot query state of {}: {}", self.unit, err);
                "unknown".to_string()
            }
        }
    }

    /// Redémarre l'unité de lecture
    ///
    /// Une unité absente (code systemctl 4) est tolérée : le player
    /// fonctionne aussi sur des machines sans service de lecture, par
    /// exemple en développement.
    pub async fn restart(&self) -> Result<()> {
        tracing::info!("Restarting unit {}", self.unit);

        let status = Command::new("systemctl")
            .args(["status", &self.unit])
            .output()
            .await?;
        if status.status.code() == Some(SYSTEMCTL_NO_SUCH_UNIT) {
            tracing::warn!("Unit {} does not exist, restart skipped", self.unit);
            return Ok(());
        }

        let restart = Command::new("systemctl")
            .args(["restart", &self.unit])
            .output()
            .await?;
        if restart.status.success() {
            tracing::info!("Unit {} restarted", self.unit);
            Ok(())
        } else {
            Err(Error::Command(format!(
                "systemctl restart {} failed: {}",
                self.unit,
                String::from_utf8_lossy(&restart.stderr).trim()
            )))
        }
    }
}

#[async_trait]
impl vlsync::PlayerControl for SystemdUnit {
    async fn reload(&self) -> anyhow::Result<()> {
        self.restart().await.map_err(anyhow::Error::from)
    }
}
