//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer `ClientConnection`.
//!
//! ## Concurrency-Modell
//! Da die Repository- und Klassifizierer-Traits async fn ohne
//! Send-Garantie verwenden (async_fn_in_trait), laufen alle
//! Verbindungs-Tasks in einer `tokio::task::LocalSet` auf einem
//! single-threaded Executor. Dies ist korrekt fuer einen einzelnen
//! Server-Prozess.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::LocalSet;

use plauderei_moderation::classifier::Klassifizierer;
use plauderei_storage::{BlockRepository, MessageRepository, SessionRepository};

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// TCP-Server der Verbindungsschicht
///
/// Bindet einen TCP-Socket und akzeptiert Verbindungen in einer Loop.
/// Jede Verbindung wird als lokaler Task in der `LocalSet` ausgefuehrt.
pub struct SignalingServer<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    state: Arc<SignalingState<S, K, B>>,
    bind_addr: SocketAddr,
}

impl<S, K, B> SignalingServer<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    /// Erstellt einen neuen SignalingServer
    pub fn neu(state: Arc<SignalingState<S, K, B>>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Startet den TCP-Listener und akzeptiert Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    /// Verwendet eine `LocalSet` fuer alle Verbindungs-Tasks.
    pub async fn starten(
        self,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let local = LocalSet::new();
        let ergebnis = local.run_until(self.accept_loop(shutdown_rx)).await;
        // Restliche Verbindungs-Tasks (Abschiedsnachrichten, Records)
        // zu Ende laufen lassen
        local.await;
        ergebnis
    }

    /// Interne Accept-Loop (laeuft innerhalb der LocalSet)
    async fn accept_loop(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let lokale_addr = listener.local_addr()?;

        tracing::info!(
            adresse = %lokale_addr,
            "TCP-Server gestartet"
        );

        // Zaehlt alle angenommenen Verbindungen, auch unbegruesste
        let verbindungen = Arc::new(AtomicUsize::new(0));

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            // Client-Limit pruefen
                            let aktiv = verbindungen.load(Ordering::Acquire);
                            if aktiv >= self.state.config.max_clients as usize {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    aktiv,
                                    max = self.state.config.max_clients,
                                    "Server voll – Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }
                            verbindungen.fetch_add(1, Ordering::AcqRel);

                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                            let verbindung = ClientConnection::neu(
                                Arc::clone(&self.state),
                                peer_addr,
                            );
                            let shutdown_rx_clone = shutdown_rx.clone();
                            let zaehler = Arc::clone(&verbindungen);

                            // Lokaler Task – kein Send erforderlich
                            tokio::task::spawn_local(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                                zaehler.fetch_sub(1, Ordering::AcqRel);
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        // Laufende Sessions beenden bevor die Verbindungs-Tasks ihre
        // Abschiedsnachricht senden
        self.state.matching.zwangs_beenden_alle();

        tracing::info!("TCP-Server gestoppt");
        Ok(())
    }

    /// Gibt die Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
