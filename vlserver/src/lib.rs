//! # vlserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple et ergonomique pour créer
//! le serveur HTTP local du player avec Axum.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **API de haut niveau** : Interface simple pour créer des serveurs HTTP avec Axum
//! - 📚 **Documentation OpenAPI** : Génération automatique de Swagger UI
//! - ⚡ **Arrêt gracieux** : Gestion propre de l'arrêt sur Ctrl+C
//!
//! ## Architecture
//!
//! La crate est organisée en plusieurs modules :
//!
//! - [`server`] : Implémentation du serveur principal et du builder
//! - [`logging`] : Initialisation du subscriber tracing du binaire
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use vlserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     vlserver::init_logging();
//!
//!     // Création et démarrage du serveur
//!     let mut server = ServerBuilder::new("MyServer", "http://localhost:8090", 8090)
//!         .build();
//!
//!     // Ajout d'une route JSON
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     // Démarrage
//!     server.start().await;
//!     server.wait().await;
//! }
//! ```

pub mod logging;
pub mod server;

pub use logging::init_logging;
pub use server::{Server, ServerBuilder, ServerInfo};
