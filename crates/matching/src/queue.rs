//! MatchQueue – FIFO-Warteschlange fuer suchende Identitaeten
//!
//! Reine Datenstruktur ohne eigene Sperre; der MatchingService haelt
//! Queue und SessionIndex unter einer gemeinsamen Sperre, damit eine
//! Vermittlung beide atomar aktualisiert.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use plauderei_core::types::UserId;

/// Eintrag in der Warteschlange
#[derive(Debug, Clone)]
struct QueueEntry {
    user_id: UserId,
    enqueued_at: DateTime<Utc>,
}

/// FIFO-Warteschlange mit Duplikat-Schutz
#[derive(Debug, Default)]
pub struct MatchQueue {
    eintraege: VecDeque<QueueEntry>,
}

impl MatchQueue {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Reiht eine Identitaet am Ende ein
    ///
    /// Gibt `false` zurueck wenn sie bereits wartet; die Position
    /// bleibt dann unveraendert.
    pub fn einreihen(&mut self, user_id: UserId) -> bool {
        if self.enthaelt(&user_id) {
            return false;
        }
        self.eintraege.push_back(QueueEntry {
            user_id,
            enqueued_at: Utc::now(),
        });
        true
    }

    /// Entfernt eine Identitaet aus der Warteschlange
    pub fn entfernen(&mut self, user_id: &UserId) -> bool {
        let vorher = self.eintraege.len();
        self.eintraege.retain(|e| e.user_id != *user_id);
        self.eintraege.len() != vorher
    }

    /// Sucht einen Partner fuer `suchender`
    ///
    /// Der aelteste wartende Eintrag ungleich `suchender` wird entnommen
    /// und zurueckgegeben; ein etwaiger eigener Eintrag des Suchenden
    /// wird dabei mit entfernt. Gibt es keinen Kandidaten, wird der
    /// Suchende eingereiht (falls nicht schon wartend) und `None`
    /// geliefert.
    pub fn partner_finden(&mut self, suchender: UserId) -> Option<UserId> {
        let kandidat = self
            .eintraege
            .iter()
            .position(|e| e.user_id != suchender);

        match kandidat {
            Some(pos) => {
                let partner = self.eintraege.remove(pos).map(|e| e.user_id);
                self.entfernen(&suchender);
                partner
            }
            None => {
                self.einreihen(suchender);
                None
            }
        }
    }

    pub fn enthaelt(&self, user_id: &UserId) -> bool {
        self.eintraege.iter().any(|e| e.user_id == *user_id)
    }

    pub fn laenge(&self) -> usize {
        self.eintraege.len()
    }

    /// Wartezeit-Beginn des aeltesten Eintrags
    pub fn aeltester_seit(&self) -> Option<DateTime<Utc>> {
        self.eintraege.front().map(|e| e.enqueued_at)
    }
}
