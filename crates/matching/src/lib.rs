//! plauderei-matching – Pairing- und Session-Engine
//!
//! Dieses Crate implementiert den Kern des Systems: die Warteschlange,
//! den Session-Index mit seiner Zustandsmaschine und den Nachrichtenpfad
//! durch das Moderations-Gate.
//!
//! ## Architektur
//!
//! ```text
//! MatchingService (eine Instanz pro Prozess, beim Start konstruiert)
//!     |
//!     +-- Mutex<Inner>         – MatchQueue + SessionIndex unter EINER
//!     |                          Sperre: eine Vermittlung beruehrt beide
//!     +-- Session-Sperren      – eine async-Sperre pro Session fuer die
//!     |                          Serialisierung der Klassifizierung
//!     +-- PresenceRegistry     – UserId -> Verbindungs-Handle
//!     +-- ModerationGate       – Klassifizierung im Nachrichtenpfad
//!     +-- Storage (Best-Effort, fire-and-forget)
//! ```
//!
//! ## Invarianten
//! - Eine Identitaet ist zu jedem Zeitpunkt in hoechstens einem von
//!   {Warteschlange, Session-Index}.
//! - Eine Session existiert genau dann im Index, wenn beide Teilnehmer-
//!   Mappings auf sie zeigen.
//! - `Active -> Ended` ist terminal; eine neue Paarung erzeugt immer
//!   eine frische Session-ID.

pub mod presence;
pub mod queue;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use presence::{ClientSender, PresenceRegistry};
pub use queue::MatchQueue;
pub use service::{MatchErgebnis, MatchingService, RelayErgebnis};
pub use session::{Session, SessionIndex, SessionStatus};
