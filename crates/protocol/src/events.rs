//! Echtzeit-Event-Kontrakt
//!
//! Alle Events die ueber die TCP-Verbindung zwischen Client und Kern
//! ausgetauscht werden.
//!
//! ## Design
//! - Tagged Enums: `{"event": "...", "data": {...}}` via serde
//! - Event-Namen in snake_case, JSON-Serialisierung (TCP, nicht zeitkritisch)
//! - Keine Request-IDs: der Kontrakt ist rein ereignisbasiert

use chrono::{DateTime, Utc};
use plauderei_core::types::{EndReason, SessionId, Severity, UserId};
use serde::{Deserialize, Serialize};

/// Events vom Client an den Kern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Identitaetslieferung beim Verbindungsaufbau
    ///
    /// `user_id` kommt von der externen Identitaetsschicht; fehlt sie,
    /// wird serverseitig eine Gast-Identitaet gemuenzt. Der Kern prueft
    /// nichts nach.
    Hello {
        user_id: Option<UserId>,
        #[serde(default)]
        durable_account: bool,
    },
    /// Paarung anfordern
    FindMatch,
    /// Nachricht an die aktuelle Session senden
    SendMessage { content: String },
    /// Aktuelle Session mit Grund `Skipped` beenden und neu anstellen
    SkipPartner,
    /// Aktuelle Session mit Grund `Ended` beenden
    DisconnectChat,
    /// Keepalive
    Ping { timestamp_ms: u64 },
    /// Antwort auf Server-Ping
    Pong { timestamp_ms: u64 },
}

/// Events vom Kern an den Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Bestaetigung der Identitaetslieferung mit der wirksamen UserId
    HelloAck { user_id: UserId },
    /// In die Warteschlange eingereiht, noch kein Partner
    WaitingForMatch,
    /// Paarung erfolgreich
    UserMatched { session_id: SessionId },
    /// Nachricht des Partners
    ReceiveMessage {
        content: String,
        sender_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// Eigene Nachricht wurde beanstandet und nicht zugestellt
    ModerationFlag { reason: String, severity: Severity },
    /// Eigene Session wegen schwerem Verstoss beendet
    Kicked { reason: String },
    /// Partner hat die Session verlassen
    PartnerDisconnected { reason: EndReason },
    /// Anfrage abgelehnt (z.B. keine aktive Session)
    Error { message: String },
    /// Keepalive
    Ping { timestamp_ms: u64 },
    /// Antwort auf Client-Ping
    Pong { timestamp_ms: u64 },
}

impl ServerEvent {
    /// Erstellt ein `error`-Event mit kurzer Meldung
    pub fn fehler(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
