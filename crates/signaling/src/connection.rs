//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task.
//!
//! ## State Machine
//! ```text
//! Verbunden --hello--> Begruesst
//!     |                    |
//!     +------ Trennen -----+
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Client muss innerhalb von `verbindungs_timeout_sek` irgendein
//!   Frame schicken
//! - Bei Timeout wird die Verbindung getrennt

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use plauderei_moderation::classifier::Klassifizierer;
use plauderei_protocol::events::ServerEvent;
use plauderei_protocol::wire::ServerCodec;
use plauderei_storage::{BlockRepository, MessageRepository, SessionRepository};

use crate::dispatcher::{DispatcherContext, EventDispatcher};
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `ServerCodec`, dispatcht an den `EventDispatcher`
/// und schreibt Antworten sowie die von der Engine ueber die
/// PresenceRegistry zugestellten Events zurueck. Laeuft in einem
/// eigenen lokalen tokio-Task.
pub struct ClientConnection<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    state: Arc<SignalingState<S, K, B>>,
    peer_addr: SocketAddr,
}

impl<S, K, B> ClientConnection<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState<S, K, B>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Diese Methode laeuft bis die Verbindung getrennt wird oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let origin = peer_addr.ip().to_string();
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(stream, ServerCodec::new());

        // Herkunftspruefung vor allem anderen; Speicherfehler sind
        // im Tracker fail-open
        if self.state.tracker.ist_blockiert(&origin).await {
            tracing::info!(peer = %peer_addr, "Blockierte Herkunft abgewiesen");
            let _ = framed
                .send(ServerEvent::Kicked {
                    reason: "Herkunft blockiert".to_string(),
                })
                .await;
            return;
        }

        // Engine -> TCP: wird nach der Begruessung mit der
        // PresenceRegistry verknuepft
        let mut presence_rx: Option<tokio::sync::mpsc::Receiver<ServerEvent>> = None;

        let mut ctx = DispatcherContext::neu(peer_addr);
        let dispatcher = EventDispatcher::neu(Arc::clone(&self.state));

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;
        // Die Identitaet gehoert inzwischen einer neueren Verbindung
        let mut registrierung_ersetzt = false;

        loop {
            let jetzt = Instant::now();

            // Timeout-Pruefung
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout");
                break;
            }

            // Naechsten Ping-Zeitpunkt berechnen
            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehendes Event vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(event)) => {
                            letzter_empfang = Instant::now();

                            let war_begruesst = ctx.identity.is_some();
                            if let Some(antwort) = dispatcher.dispatch(event, &mut ctx).await {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %e,
                                        "Senden fehlgeschlagen"
                                    );
                                    break;
                                }
                            }

                            // Nach erfolgreicher Begruessung: Engine-Events abonnieren
                            if !war_begruesst {
                                if let Some(identity) = ctx.identity {
                                    presence_rx = Some(
                                        self.state
                                            .matching
                                            .presence()
                                            .registrieren(identity.user_id, origin.clone()),
                                    );
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehendes Event aus der Engine
                ausgehend = empfangen(&mut presence_rx) => {
                    match ausgehend {
                        Some(event) => {
                            if let Err(e) = framed.send(event).await {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    fehler = %e,
                                    "Engine-Event-Senden fehlgeschlagen"
                                );
                                break;
                            }
                        }
                        None => {
                            // Registrierung wurde ersetzt (Neuverbindung
                            // derselben Identitaet)
                            tracing::info!(peer = %peer_addr, "Registrierung ersetzt – Verbindung wird getrennt");
                            registrierung_ersetzt = true;
                            break;
                        }
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if jetzt >= naechster_ping {
                        let ts = std::time::SystemTime::now()
                            .duration_since(std::time::UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_millis() as u64;

                        if let Err(e) = framed.send(ServerEvent::Ping { timestamp_ms: ts }).await {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Ping-Senden fehlgeschlagen"
                            );
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ServerEvent::fehler("Server wird heruntergefahren");
                        let _ = framed.send(abschied).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende: Presence, Warteschlange und
        // Session der Identitaet abraeumen. Nicht wenn eine neuere
        // Verbindung die Identitaet uebernommen hat.
        if !registrierung_ersetzt {
            dispatcher.client_cleanup(&ctx);
        }

        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}

/// Empfaengt aus der optionalen Engine-Queue
///
/// Vor der Begruessung existiert keine Queue; der Zweig bleibt dann
/// dauerhaft pending statt den select-Loop zu beschaeftigen.
async fn empfangen(
    rx: &mut Option<tokio::sync::mpsc::Receiver<ServerEvent>>,
) -> Option<ServerEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
