//! Speicher-Modelle fuer Plauderei
//!
//! Diese Typen repraesentieren die an den Speicher-Kollaborateur
//! uebergebenen Datensaetze. Sie sind von den Domain-Typen getrennt und
//! dienen als reine Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use plauderei_core::types::{EndReason, SessionId, Severity, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Session-Datensatz im Speicher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub participant_a: UserId,
    pub participant_b: UserId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Endgrund, `None` solange die Session laeuft
    pub end_reason: Option<EndReason>,
}

/// Daten zum Anlegen eines neuen Session-Records
#[derive(Debug, Clone)]
pub struct NeueSession {
    pub id: SessionId,
    pub participant_a: UserId,
    pub participant_b: UserId,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Nachrichten-Datensatz im Speicher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub sender_id: UserId,
    pub content: String,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Anhaengen eines Nachrichten-Records
#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub session_id: SessionId,
    pub sender_id: UserId,
    pub content: &'a str,
    pub flagged: bool,
    pub flag_reason: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Block-Datensatz im Speicher, gekeyt nach Netzwerk-Herkunft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub subject_key: String,
    pub reason: String,
    pub severity: Severity,
    /// `None` = permanenter Block
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BlockRecord {
    /// `true` wenn der Block zum Zeitpunkt `jetzt` noch wirksam ist
    pub fn ist_aktiv(&self, jetzt: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|e| e > jetzt)
    }
}

/// Daten zum Anwenden eines Blocks
#[derive(Debug, Clone)]
pub struct NeuerBlock<'a> {
    pub subject_key: &'a str,
    pub reason: &'a str,
    pub severity: Severity,
    pub expires_at: Option<DateTime<Utc>>,
}
