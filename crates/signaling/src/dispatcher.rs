//! Event-Dispatcher – Routet ClientEvents an die richtigen Handler
//!
//! Der Dispatcher empfaengt ClientEvents von einer ClientConnection,
//! prueft den Verbindungszustand und gibt die direkte Antwort zurueck.
//!
//! ## Zustandspruefung
//! - `hello` nur im Zustand `Verbunden` (noch keine Identitaet)
//! - `ping`/`pong` immer erlaubt
//! - Alle anderen Events erst nach der Begruessung

use std::net::SocketAddr;
use std::sync::Arc;

use plauderei_core::types::Identity;
use plauderei_moderation::classifier::Klassifizierer;
use plauderei_protocol::events::{ClientEvent, ServerEvent};
use plauderei_storage::{BlockRepository, MessageRepository, SessionRepository};

use crate::handlers::{chat_handler, match_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Peer-Adresse, die IP ist der Herkunfts-Schluessel
    pub peer_addr: SocketAddr,
    /// Identitaet nach der Begruessung (None im Zustand `Verbunden`)
    pub identity: Option<Identity>,
}

impl DispatcherContext {
    pub fn neu(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            identity: None,
        }
    }

    /// Herkunfts-Schluessel der Verbindung
    pub fn origin(&self) -> String {
        self.peer_addr.ip().to_string()
    }
}

/// Zentraler Event-Dispatcher
pub struct EventDispatcher<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    state: Arc<SignalingState<S, K, B>>,
}

impl<S, K, B> EventDispatcher<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<S, K, B>>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes ClientEvent und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine direkte Antwort faellig ist; die
    /// Zustell-Events der Engine laufen ueber die PresenceRegistry.
    pub async fn dispatch(
        &self,
        event: ClientEvent,
        ctx: &mut DispatcherContext,
    ) -> Option<ServerEvent> {
        match event {
            // ---------------------------------------------------------------
            // Begruessung
            // ---------------------------------------------------------------
            ClientEvent::Hello {
                user_id,
                durable_account,
            } => {
                if ctx.identity.is_some() {
                    return Some(ServerEvent::fehler("Bereits begruesst"));
                }

                let identity = match user_id {
                    Some(user_id) => Identity {
                        user_id,
                        durable_account,
                    },
                    None => Identity::gast(),
                };
                ctx.identity = Some(identity);
                tracing::debug!(
                    user_id = %identity.user_id,
                    durable = identity.durable_account,
                    "Verbindung begruesst"
                );

                Some(ServerEvent::HelloAck {
                    user_id: identity.user_id,
                })
            }

            // ---------------------------------------------------------------
            // Keepalive
            // ---------------------------------------------------------------
            ClientEvent::Ping { timestamp_ms } => Some(ServerEvent::Pong { timestamp_ms }),

            ClientEvent::Pong { .. } => {
                // Pong-Antworten vom Client werden nur geloggt (RTT-Messung)
                tracing::trace!("Pong empfangen (RTT-Messung)");
                None
            }

            // ---------------------------------------------------------------
            // Begruessung erfordernde Events
            // ---------------------------------------------------------------
            event => {
                let Some(identity) = ctx.identity else {
                    return Some(ServerEvent::fehler(
                        "Nicht begruesst – bitte zuerst hello senden",
                    ));
                };
                let user_id = identity.user_id;

                match event {
                    ClientEvent::FindMatch => match_handler::handle_find_match(user_id, &self.state),
                    ClientEvent::SendMessage { content } => {
                        chat_handler::handle_send_message(user_id, &content, &self.state).await
                    }
                    ClientEvent::SkipPartner => {
                        match_handler::handle_skip_partner(user_id, &self.state)
                    }
                    ClientEvent::DisconnectChat => {
                        match_handler::handle_disconnect_chat(user_id, &self.state)
                    }
                    // Oben bereits behandelt
                    ClientEvent::Hello { .. } | ClientEvent::Ping { .. } | ClientEvent::Pong { .. } => {
                        None
                    }
                }
            }
        }
    }

    /// Raeumt eine Verbindung nach dem Trennen ab
    pub fn client_cleanup(&self, ctx: &DispatcherContext) {
        if let Some(identity) = ctx.identity {
            self.state.matching.getrennt(&identity.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauderei_core::types::UserId;
    use plauderei_matching::{MatchingService, PresenceRegistry};
    use plauderei_moderation::classifier::NullKlassifizierer;
    use plauderei_moderation::gate::ModerationGate;
    use plauderei_moderation::tracker::ViolationTracker;
    use plauderei_storage::MemoryDb;

    type TestDispatcher = EventDispatcher<MemoryDb, NullKlassifizierer, MemoryDb>;

    fn dispatcher() -> TestDispatcher {
        let repo = Arc::new(MemoryDb::neu());
        let tracker = ViolationTracker::neu(Arc::clone(&repo));
        let gate = ModerationGate::neu(Arc::new(NullKlassifizierer), Arc::clone(&tracker));
        let matching = MatchingService::neu(PresenceRegistry::neu(), gate, repo);
        let state = SignalingState::neu(crate::SignalingConfig::default(), matching, tracker);
        EventDispatcher::neu(state)
    }

    fn ctx() -> DispatcherContext {
        DispatcherContext::neu("127.0.0.1:50000".parse().unwrap())
    }

    #[tokio::test]
    async fn hello_ohne_user_id_muenzt_gast() {
        let dispatcher = dispatcher();
        let mut ctx = ctx();

        let antwort = dispatcher
            .dispatch(
                ClientEvent::Hello {
                    user_id: None,
                    durable_account: false,
                },
                &mut ctx,
            )
            .await;

        let Some(ServerEvent::HelloAck { user_id }) = antwort else {
            panic!("erwartet hello_ack, war {antwort:?}");
        };
        let identity = ctx.identity.unwrap();
        assert_eq!(identity.user_id, user_id);
        assert!(!identity.durable_account);
    }

    #[tokio::test]
    async fn hello_uebernimmt_gelieferte_user_id() {
        let dispatcher = dispatcher();
        let mut ctx = ctx();
        let geliefert = UserId::new();

        let antwort = dispatcher
            .dispatch(
                ClientEvent::Hello {
                    user_id: Some(geliefert),
                    durable_account: true,
                },
                &mut ctx,
            )
            .await;

        assert_eq!(antwort, Some(ServerEvent::HelloAck { user_id: geliefert }));
        assert!(ctx.identity.unwrap().durable_account);
    }

    #[tokio::test]
    async fn doppeltes_hello_wird_abgelehnt() {
        let dispatcher = dispatcher();
        let mut ctx = ctx();
        let hello = ClientEvent::Hello {
            user_id: None,
            durable_account: false,
        };

        dispatcher.dispatch(hello.clone(), &mut ctx).await;
        let vorher = ctx.identity;
        let antwort = dispatcher.dispatch(hello, &mut ctx).await;

        assert!(matches!(antwort, Some(ServerEvent::Error { .. })));
        assert_eq!(ctx.identity, vorher, "Identitaet bleibt unveraendert");
    }

    #[tokio::test]
    async fn events_vor_begruessung_werden_abgelehnt() {
        let dispatcher = dispatcher();
        let mut ctx = ctx();

        for event in [
            ClientEvent::FindMatch,
            ClientEvent::SendMessage {
                content: "hallo".into(),
            },
            ClientEvent::SkipPartner,
            ClientEvent::DisconnectChat,
        ] {
            let antwort = dispatcher.dispatch(event, &mut ctx).await;
            assert!(matches!(antwort, Some(ServerEvent::Error { .. })));
        }
    }

    #[tokio::test]
    async fn ping_wird_mit_pong_beantwortet() {
        let dispatcher = dispatcher();
        let mut ctx = ctx();

        let antwort = dispatcher
            .dispatch(ClientEvent::Ping { timestamp_ms: 42 }, &mut ctx)
            .await;
        assert_eq!(antwort, Some(ServerEvent::Pong { timestamp_ms: 42 }));

        let antwort = dispatcher
            .dispatch(ClientEvent::Pong { timestamp_ms: 42 }, &mut ctx)
            .await;
        assert_eq!(antwort, None);
    }

    #[tokio::test]
    async fn find_match_nach_hello_antwortet_nicht_direkt() {
        let dispatcher = dispatcher();
        let mut ctx = ctx();
        dispatcher
            .dispatch(
                ClientEvent::Hello {
                    user_id: None,
                    durable_account: false,
                },
                &mut ctx,
            )
            .await;

        // waiting_for_match laeuft ueber die PresenceRegistry, nicht
        // als direkte Antwort
        let antwort = dispatcher.dispatch(ClientEvent::FindMatch, &mut ctx).await;
        assert_eq!(antwort, None);
    }

    #[tokio::test]
    async fn send_message_ohne_session_ist_fehler() {
        let dispatcher = dispatcher();
        let mut ctx = ctx();
        dispatcher
            .dispatch(
                ClientEvent::Hello {
                    user_id: None,
                    durable_account: false,
                },
                &mut ctx,
            )
            .await;

        let antwort = dispatcher
            .dispatch(
                ClientEvent::SendMessage {
                    content: "hallo".into(),
                },
                &mut ctx,
            )
            .await;
        assert!(matches!(antwort, Some(ServerEvent::Error { .. })));
    }
}
