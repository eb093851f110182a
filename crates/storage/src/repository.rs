//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt den Kern von der konkreten
//! Speicher-Implementierung. Alle Aufrufe sind Best-Effort: der Kern
//! loggt Fehlschlaege und wartet nie auf den Speicher.
//!
//! Hinweis: async fn im Trait ohne Send-Garantie (async_fn_in_trait) –
//! die Verbindungs-Tasks laufen deshalb in einer `tokio::task::LocalSet`.

use plauderei_core::types::{EndReason, SessionId};

use crate::error::DbResult;
use crate::models::{BlockRecord, MessageRecord, NeueNachricht, NeuerBlock, NeueSession, SessionRecord};

/// Repository fuer Session-Records
#[allow(async_fn_in_trait)]
pub trait SessionRepository: Send + Sync {
    /// Legt einen Session-Record beim Pairing an
    async fn create_session(&self, data: NeueSession) -> DbResult<SessionRecord>;

    /// Schliesst einen Session-Record bei Terminierung
    ///
    /// Gibt `false` zurueck wenn kein offener Record existiert.
    async fn close_session(
        &self,
        id: SessionId,
        ended_at: chrono::DateTime<chrono::Utc>,
        reason: EndReason,
    ) -> DbResult<bool>;

    /// Laedt einen Session-Record
    async fn get_session(&self, id: SessionId) -> DbResult<Option<SessionRecord>>;
}

/// Repository fuer Nachrichten-Records
#[allow(async_fn_in_trait)]
pub trait MessageRepository: Send + Sync {
    /// Haengt einen Nachrichten-Record an (auch fuer beanstandete Nachrichten)
    async fn append_message(&self, data: NeueNachricht<'_>) -> DbResult<MessageRecord>;

    /// Laedt alle Nachrichten-Records einer Session
    async fn messages_for_session(&self, id: SessionId) -> DbResult<Vec<MessageRecord>>;
}

/// Repository fuer Herkunfts-Blocks
#[allow(async_fn_in_trait)]
pub trait BlockRepository: Send + Sync {
    /// Speichert oder ersetzt den Block fuer einen Herkunfts-Key
    async fn apply_block(&self, data: NeuerBlock<'_>) -> DbResult<BlockRecord>;

    /// Laedt den aktuellen Block eines Herkunfts-Keys (auch abgelaufene)
    async fn current_block(&self, subject_key: &str) -> DbResult<Option<BlockRecord>>;

    /// Prueft ob ein Herkunfts-Key aktuell blockiert ist
    ///
    /// Abgelaufene Blocks zaehlen als nicht blockiert.
    async fn is_origin_blocked(&self, subject_key: &str) -> DbResult<bool>;
}
