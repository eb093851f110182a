//! Event-Handler fuer die vom Dispatcher gerouteten Client-Events

pub mod chat_handler;
pub mod match_handler;

use plauderei_core::error::PlaudereiError;
use plauderei_protocol::events::ServerEvent;

/// Mappt einen Engine-Fehler auf das `error`-Event fuer den Aufrufer
///
/// Benutzerfehler gehen mit voller Meldung raus; alles andere wird
/// geloggt und nur als generischer interner Fehler gemeldet.
pub(crate) fn fehler_event(fehler: PlaudereiError) -> ServerEvent {
    if fehler.ist_benutzer_fehler() {
        ServerEvent::fehler(fehler.to_string())
    } else {
        tracing::error!(fehler = %fehler, "Handler-Fehler");
        ServerEvent::fehler("Interner Fehler")
    }
}
