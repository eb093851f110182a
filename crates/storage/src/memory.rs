//! In-Memory-Referenzimplementierung der Repository-Traits
//!
//! Dient als Standard-Senke fuer den Single-Instance-Betrieb und als
//! Test-Double. Kein Persistenzanspruch: ein Neustart verwirft alles,
//! was dem Best-Effort-Kontrakt des Kerns entspricht.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use plauderei_core::types::{EndReason, SessionId};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{
    BlockRecord, MessageRecord, NeueNachricht, NeuerBlock, NeueSession, SessionRecord,
};
use crate::repository::{BlockRepository, MessageRepository, SessionRepository};

/// In-Memory-Speicher fuer Sessions, Nachrichten und Blocks
#[derive(Default)]
pub struct MemoryDb {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    messages: Mutex<Vec<MessageRecord>>,
    blocks: Mutex<HashMap<String, BlockRecord>>,
}

impl MemoryDb {
    /// Erstellt einen leeren In-Memory-Speicher
    pub fn neu() -> Self {
        Self::default()
    }

    /// Gibt die Anzahl gespeicherter Session-Records zurueck
    pub fn session_anzahl(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Gibt die Anzahl gespeicherter Nachrichten-Records zurueck
    pub fn nachrichten_anzahl(&self) -> usize {
        self.messages.lock().len()
    }

    /// Gibt die IDs aller gespeicherten Session-Records zurueck
    pub fn alle_session_ids(&self) -> Vec<SessionId> {
        self.sessions.lock().keys().copied().collect()
    }
}

impl SessionRepository for MemoryDb {
    async fn create_session(&self, data: NeueSession) -> DbResult<SessionRecord> {
        let record = SessionRecord {
            id: data.id,
            participant_a: data.participant_a,
            participant_b: data.participant_b,
            started_at: data.started_at,
            ended_at: None,
            end_reason: None,
        };

        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&data.id) {
            return Err(DbError::Eindeutigkeit(format!(
                "Session-Record existiert bereits: {}",
                data.id
            )));
        }
        sessions.insert(data.id, record.clone());
        Ok(record)
    }

    async fn close_session(
        &self,
        id: SessionId,
        ended_at: DateTime<Utc>,
        reason: EndReason,
    ) -> DbResult<bool> {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&id) {
            Some(record) if record.ended_at.is_none() => {
                record.ended_at = Some(ended_at);
                record.end_reason = Some(reason);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_session(&self, id: SessionId) -> DbResult<Option<SessionRecord>> {
        Ok(self.sessions.lock().get(&id).cloned())
    }
}

impl MessageRepository for MemoryDb {
    async fn append_message(&self, data: NeueNachricht<'_>) -> DbResult<MessageRecord> {
        let record = MessageRecord {
            id: Uuid::new_v4(),
            session_id: data.session_id,
            sender_id: data.sender_id,
            content: data.content.to_string(),
            flagged: data.flagged,
            flag_reason: data.flag_reason.map(String::from),
            created_at: Utc::now(),
        };
        self.messages.lock().push(record.clone());
        Ok(record)
    }

    async fn messages_for_session(&self, id: SessionId) -> DbResult<Vec<MessageRecord>> {
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|m| m.session_id == id)
            .cloned()
            .collect())
    }
}

impl BlockRepository for MemoryDb {
    async fn apply_block(&self, data: NeuerBlock<'_>) -> DbResult<BlockRecord> {
        let record = BlockRecord {
            subject_key: data.subject_key.to_string(),
            reason: data.reason.to_string(),
            severity: data.severity,
            expires_at: data.expires_at,
            created_at: Utc::now(),
        };
        self.blocks
            .lock()
            .insert(data.subject_key.to_string(), record.clone());
        Ok(record)
    }

    async fn current_block(&self, subject_key: &str) -> DbResult<Option<BlockRecord>> {
        Ok(self.blocks.lock().get(subject_key).cloned())
    }

    async fn is_origin_blocked(&self, subject_key: &str) -> DbResult<bool> {
        let blocks = self.blocks.lock();
        Ok(blocks
            .get(subject_key)
            .is_some_and(|b| b.ist_aktiv(Utc::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauderei_core::types::{Severity, UserId};

    fn neue_session() -> NeueSession {
        NeueSession {
            id: SessionId::new(),
            participant_a: UserId::new(),
            participant_b: UserId::new(),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn session_anlegen_und_schliessen() {
        let db = MemoryDb::neu();
        let daten = neue_session();
        let id = daten.id;

        db.create_session(daten).await.unwrap();
        assert_eq!(db.session_anzahl(), 1);

        let geschlossen = db.close_session(id, Utc::now(), EndReason::Skipped).await.unwrap();
        assert!(geschlossen);

        let record = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(record.end_reason, Some(EndReason::Skipped));
        assert!(record.ended_at.is_some());
    }

    #[tokio::test]
    async fn doppeltes_schliessen_ist_wirkungslos() {
        let db = MemoryDb::neu();
        let daten = neue_session();
        let id = daten.id;
        db.create_session(daten).await.unwrap();

        assert!(db.close_session(id, Utc::now(), EndReason::Ended).await.unwrap());
        assert!(!db.close_session(id, Utc::now(), EndReason::Ended).await.unwrap());
    }

    #[tokio::test]
    async fn doppelte_session_id_abgelehnt() {
        let db = MemoryDb::neu();
        let daten = neue_session();
        db.create_session(daten.clone()).await.unwrap();
        assert!(db.create_session(daten).await.is_err());
    }

    #[tokio::test]
    async fn nachricht_anhaengen_und_laden() {
        let db = MemoryDb::neu();
        let session_id = SessionId::new();
        let sender_id = UserId::new();

        db.append_message(NeueNachricht {
            session_id,
            sender_id,
            content: "hallo",
            flagged: false,
            flag_reason: None,
        })
        .await
        .unwrap();

        db.append_message(NeueNachricht {
            session_id,
            sender_id,
            content: "beanstandet",
            flagged: true,
            flag_reason: Some("harassment"),
        })
        .await
        .unwrap();

        let nachrichten = db.messages_for_session(session_id).await.unwrap();
        assert_eq!(nachrichten.len(), 2);
        assert!(nachrichten[1].flagged);
        assert_eq!(nachrichten[1].flag_reason.as_deref(), Some("harassment"));
    }

    #[tokio::test]
    async fn block_anwenden_und_pruefen() {
        let db = MemoryDb::neu();

        db.apply_block(NeuerBlock {
            subject_key: "192.168.1.50",
            reason: "Wiederholte Verstoesse",
            severity: Severity::Medium,
            expires_at: Some(Utc::now() + chrono::Duration::days(7)),
        })
        .await
        .unwrap();

        assert!(db.is_origin_blocked("192.168.1.50").await.unwrap());
        assert!(!db.is_origin_blocked("10.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn abgelaufener_block_zaehlt_nicht() {
        let db = MemoryDb::neu();

        db.apply_block(NeuerBlock {
            subject_key: "192.168.1.51",
            reason: "Alt",
            severity: Severity::Medium,
            expires_at: Some(Utc::now() - chrono::Duration::seconds(1)),
        })
        .await
        .unwrap();

        assert!(!db.is_origin_blocked("192.168.1.51").await.unwrap());
        // Der Record selbst bleibt lesbar (fuer Block-Erweiterung)
        assert!(db.current_block("192.168.1.51").await.unwrap().is_some());
    }
}
