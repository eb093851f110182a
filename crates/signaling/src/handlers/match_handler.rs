//! Handler fuer Vermittlungs-Events
//!
//! `find_match`, `skip_partner` und `disconnect_chat`. Die Zustell-
//! Events (`waiting_for_match`, `user_matched`, `partner_disconnected`)
//! verschickt die Engine selbst ueber die PresenceRegistry; die Handler
//! liefern nur direkte Fehlerantworten an den Aufrufer.

use plauderei_core::types::{EndReason, UserId};
use plauderei_matching::service::MatchErgebnis;
use plauderei_moderation::classifier::Klassifizierer;
use plauderei_protocol::events::ServerEvent;
use plauderei_storage::{BlockRepository, MessageRepository, SessionRepository};

use crate::handlers::fehler_event;
use crate::server_state::SignalingState;

/// Verarbeitet `find_match`
pub fn handle_find_match<S, K, B>(
    user_id: UserId,
    state: &SignalingState<S, K, B>,
) -> Option<ServerEvent>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    match state.matching.partner_suchen(user_id) {
        Ok(MatchErgebnis::Wartend) | Ok(MatchErgebnis::Vermittelt { .. }) => None,
        Err(e) => Some(fehler_event(e)),
    }
}

/// Verarbeitet `skip_partner`
///
/// Beendet die aktuelle Session mit Grund `Skipped` und stellt den
/// Aufrufer sofort wieder zur Vermittlung an.
pub fn handle_skip_partner<S, K, B>(
    user_id: UserId,
    state: &SignalingState<S, K, B>,
) -> Option<ServerEvent>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    match state.matching.beenden_fuer(&user_id, EndReason::Skipped) {
        Ok(true) => {}
        Ok(false) => {
            return Some(ServerEvent::fehler("Keine aktive Session"));
        }
        Err(e) => return Some(fehler_event(e)),
    }

    match state.matching.partner_suchen(user_id) {
        Ok(_) => None,
        Err(e) => Some(fehler_event(e)),
    }
}

/// Verarbeitet `disconnect_chat`
///
/// Beendet die aktuelle Session mit Grund `Ended`; der Aufrufer bleibt
/// verbunden und unvermittelt.
pub fn handle_disconnect_chat<S, K, B>(
    user_id: UserId,
    state: &SignalingState<S, K, B>,
) -> Option<ServerEvent>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    match state.matching.beenden_fuer(&user_id, EndReason::Ended) {
        Ok(true) => None,
        Ok(false) => Some(ServerEvent::fehler("Keine aktive Session")),
        Err(e) => Some(fehler_event(e)),
    }
}
