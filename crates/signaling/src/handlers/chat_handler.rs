//! Handler fuer den Nachrichtenpfad
//!
//! `send_message` laeuft durch die Engine inklusive Moderations-Gate.
//! Der Sender bekommt nur bei Beanstandung oder Kick eine direkte
//! Antwort; zugestellte Nachrichten bestaetigt der Server nicht.

use plauderei_core::types::UserId;
use plauderei_matching::service::RelayErgebnis;
use plauderei_moderation::classifier::Klassifizierer;
use plauderei_protocol::events::ServerEvent;
use plauderei_storage::{BlockRepository, MessageRepository, SessionRepository};

use crate::handlers::fehler_event;
use crate::server_state::SignalingState;

/// Verarbeitet `send_message`
pub async fn handle_send_message<S, K, B>(
    user_id: UserId,
    content: &str,
    state: &SignalingState<S, K, B>,
) -> Option<ServerEvent>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    match state.matching.nachricht_weiterleiten(user_id, content).await {
        Ok(RelayErgebnis::Zugestellt) => None,
        Ok(RelayErgebnis::Verfallen) => None,
        Ok(RelayErgebnis::Beanstandet { severity, grund }) => Some(ServerEvent::ModerationFlag {
            reason: grund,
            severity,
        }),
        Ok(RelayErgebnis::SessionBeendet { grund }) => {
            Some(ServerEvent::Kicked { reason: grund })
        }
        Err(e) => Some(fehler_event(e)),
    }
}
