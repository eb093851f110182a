//! plauderei-server – Bibliotheks-Root
//!
//! Verdrahtet Speicher, Moderation, Vermittlungs-Engine und die
//! TCP-Verbindungsschicht und stellt den Einstiegspunkt fuer
//! Integrationstests bereit.

pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use plauderei_matching::{MatchingService, PresenceRegistry};
use plauderei_moderation::classifier::NullKlassifizierer;
use plauderei_moderation::gate::ModerationGate;
use plauderei_moderation::tracker::ViolationTracker;
use plauderei_signaling::{SignalingConfig, SignalingServer, SignalingState};
use plauderei_storage::MemoryDb;

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Speicher und Moderations-Pipeline aufbauen
    /// 2. Vermittlungs-Engine verdrahten
    /// 3. TCP-Listener starten
    /// 4. Auf Ctrl-C warten, dann Sessions zwangsbeenden
    pub async fn starten(self) -> Result<()> {
        let bind_addr: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse: {}", self.config.tcp_bind_adresse()))?;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %bind_addr,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        // In-Memory-Speicher; eine dauerhafte Implementierung lebt
        // ausserhalb des Kerns
        let repo = Arc::new(MemoryDb::neu());

        // Moderations-Pipeline: ohne konfigurierten Klassifizierer wird
        // nichts beanstandet (fail-open)
        let tracker = ViolationTracker::neu(Arc::clone(&repo));
        let gate = ModerationGate::neu(Arc::new(NullKlassifizierer), Arc::clone(&tracker));
        tracing::info!("Moderations-Pipeline ohne externen Klassifizierer (fail-open)");

        // Vermittlungs-Engine
        let presence = PresenceRegistry::neu();
        let matching = MatchingService::neu(presence, gate, repo);

        let signaling_config = SignalingConfig {
            max_clients: self.config.server.max_clients,
            keepalive_sek: self.config.verbindung.keepalive_sek,
            verbindungs_timeout_sek: self.config.verbindung.timeout_sek,
        };
        let state = SignalingState::neu(signaling_config, matching, tracker);
        let server = SignalingServer::neu(state, bind_addr);

        // Ctrl-C loest das Shutdown-Signal aus
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen");
                return;
            }
            tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            let _ = shutdown_tx.send(true);
        });

        server.starten(shutdown_rx).await?;

        tracing::info!("Server beendet");
        Ok(())
    }
}
