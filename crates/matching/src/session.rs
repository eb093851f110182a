//! SessionIndex – aktive 1:1-Sessions und ihre Zustandsmaschine
//!
//! Reine Datenstruktur; die Sperre liegt beim MatchingService. Der Index
//! haelt die bidirektionale Invariante: eine Session existiert genau
//! dann, wenn beide Teilnehmer-Mappings auf sie zeigen.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use plauderei_core::error::PlaudereiError;
use plauderei_core::types::{SessionId, UserId};

/// Lebenszyklus einer Session
///
/// `Aktiv -> Beendet` ist terminal; eine erneute Paarung erzeugt immer
/// eine neue Session mit frischer ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Aktiv,
    Beendet,
}

/// Eine aktive oder soeben beendete 1:1-Session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub participant_a: UserId,
    pub participant_b: UserId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

impl Session {
    /// Der jeweils andere Teilnehmer
    pub fn partner_von(&self, user_id: &UserId) -> Option<UserId> {
        if *user_id == self.participant_a {
            Some(self.participant_b)
        } else if *user_id == self.participant_b {
            Some(self.participant_a)
        } else {
            None
        }
    }

    pub fn ist_teilnehmer(&self, user_id: &UserId) -> bool {
        *user_id == self.participant_a || *user_id == self.participant_b
    }
}

/// Index aller aktiven Sessions
#[derive(Debug, Default)]
pub struct SessionIndex {
    sessions: HashMap<SessionId, Session>,
    by_user: HashMap<UserId, SessionId>,
}

impl SessionIndex {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erstellt eine neue aktive Session fuer zwei Teilnehmer
    ///
    /// Schlaegt fehl wenn einer der beiden bereits einer Session
    /// zugeordnet ist oder beide Teilnehmer identisch sind.
    pub fn erstellen(&mut self, a: UserId, b: UserId) -> plauderei_core::Result<Session> {
        if a == b {
            return Err(PlaudereiError::InvarianteVerletzt(
                "Session mit sich selbst".to_string(),
            ));
        }
        if self.by_user.contains_key(&a) || self.by_user.contains_key(&b) {
            return Err(PlaudereiError::InvarianteVerletzt(
                "Teilnehmer bereits in einer Session".to_string(),
            ));
        }

        let session = Session {
            id: SessionId::new(),
            participant_a: a,
            participant_b: b,
            started_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::Aktiv,
        };
        self.by_user.insert(a, session.id);
        self.by_user.insert(b, session.id);
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Aktive Session einer Identitaet
    ///
    /// Ein haengendes Teilnehmer-Mapping ohne zugehoerige Session wird
    /// bereinigt und als Invariantenverletzung gemeldet.
    pub fn session_von(&mut self, user_id: &UserId) -> plauderei_core::Result<Option<&Session>> {
        let Some(session_id) = self.by_user.get(user_id).copied() else {
            return Ok(None);
        };
        if !self.sessions.contains_key(&session_id) {
            self.by_user.remove(user_id);
            return Err(PlaudereiError::InvarianteVerletzt(format!(
                "haengendes Mapping {user_id} -> {session_id}"
            )));
        }
        Ok(self.sessions.get(&session_id))
    }

    /// Session einer Identitaet per ID (ohne Selbstheilung)
    pub fn session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Beendet eine Session und entfernt beide Teilnehmer-Mappings
    ///
    /// Gibt die beendete Session zurueck, oder `None` wenn sie nicht
    /// (mehr) existiert – das zweite Beenden derselben Session ist ein
    /// No-Op.
    pub fn beenden(&mut self, session_id: &SessionId) -> Option<Session> {
        let mut session = self.sessions.remove(session_id)?;
        self.by_user.remove(&session.participant_a);
        self.by_user.remove(&session.participant_b);
        session.ended_at = Some(Utc::now());
        session.status = SessionStatus::Beendet;
        Some(session)
    }

    /// IDs aller aktiven Sessions
    pub fn aktive_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn aktive_anzahl(&self) -> usize {
        self.sessions.len()
    }
}
