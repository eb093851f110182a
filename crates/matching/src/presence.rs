//! PresenceRegistry – Mapping von Identitaet auf Verbindungs-Handle
//!
//! Jede begruesste Verbindung registriert sich hier mit ihrer UserId und
//! erhaelt den Empfangskanal fuer Server-Events. Zustellung ist nicht
//! blockierend: ein voller Kanal verwirft das Event statt den Absender
//! aufzuhalten.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use plauderei_core::types::UserId;
use plauderei_protocol::events::ServerEvent;

/// Kapazitaet des Sendepuffers pro Verbindung
const SENDE_PUFFER: usize = 64;

/// Sende-Handle einer registrierten Verbindung
#[derive(Debug, Clone)]
pub struct ClientSender {
    pub user_id: UserId,
    /// Herkunfts-Schluessel der Verbindung (Peer-Adresse)
    pub origin: String,
    tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Stellt ein Event nicht-blockierend zu
    ///
    /// Gibt `false` zurueck wenn der Puffer voll oder die Verbindung
    /// bereits geschlossen ist; das Event ist dann verworfen.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, "Sendepuffer voll, Event verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, "Verbindung geschlossen, Event verworfen");
                false
            }
        }
    }
}

/// Verzeichnis aller online Identitaeten
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    clients: DashMap<UserId, ClientSender>,
}

impl PresenceRegistry {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            clients: DashMap::new(),
        })
    }

    /// Registriert eine Verbindung und liefert ihren Empfangskanal
    ///
    /// Eine bereits registrierte UserId wird ersetzt; der alte Kanal
    /// schliesst sich dadurch und die alte Verbindung laeuft leer.
    pub fn registrieren(&self, user_id: UserId, origin: String) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(SENDE_PUFFER);
        let vorher = self.clients.insert(
            user_id,
            ClientSender {
                user_id,
                origin,
                tx,
            },
        );
        if vorher.is_some() {
            tracing::warn!(user_id = %user_id, "Bestehende Registrierung ersetzt");
        }
        tracing::debug!(user_id = %user_id, online = self.clients.len(), "Verbindung registriert");
        rx
    }

    /// Entfernt eine Registrierung
    pub fn entfernen(&self, user_id: &UserId) {
        if self.clients.remove(user_id).is_some() {
            tracing::debug!(user_id = %user_id, online = self.clients.len(), "Registrierung entfernt");
        }
    }

    /// Stellt ein Event an eine Identitaet zu
    ///
    /// Gibt `false` zurueck wenn die Identitaet nicht registriert ist
    /// oder die Zustellung fehlschlug.
    pub fn senden_an(&self, user_id: &UserId, event: ServerEvent) -> bool {
        match self.clients.get(user_id) {
            Some(client) => client.senden(event),
            None => false,
        }
    }

    /// Herkunfts-Schluessel einer registrierten Identitaet
    pub fn origin_von(&self, user_id: &UserId) -> Option<String> {
        self.clients.get(user_id).map(|c| c.origin.clone())
    }

    pub fn ist_registriert(&self, user_id: &UserId) -> bool {
        self.clients.contains_key(user_id)
    }

    pub fn online_anzahl(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registrieren_und_senden() {
        let registry = PresenceRegistry::neu();
        let user = UserId::new();
        let mut rx = registry.registrieren(user, "9.9.9.9".into());

        assert!(registry.ist_registriert(&user));
        assert!(registry.senden_an(&user, ServerEvent::WaitingForMatch));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::WaitingForMatch));
    }

    #[tokio::test]
    async fn senden_an_unbekannte_identitaet_schlaegt_fehl() {
        let registry = PresenceRegistry::neu();
        assert!(!registry.senden_an(&UserId::new(), ServerEvent::WaitingForMatch));
    }

    #[tokio::test]
    async fn entfernen_beendet_zustellung() {
        let registry = PresenceRegistry::neu();
        let user = UserId::new();
        let _rx = registry.registrieren(user, "9.9.9.9".into());

        registry.entfernen(&user);
        assert!(!registry.ist_registriert(&user));
        assert!(!registry.senden_an(&user, ServerEvent::WaitingForMatch));
        assert_eq!(registry.online_anzahl(), 0);
    }

    #[tokio::test]
    async fn neuregistrierung_ersetzt_alten_kanal() {
        let registry = PresenceRegistry::neu();
        let user = UserId::new();
        let mut alt = registry.registrieren(user, "9.9.9.9".into());
        let mut neu = registry.registrieren(user, "8.8.8.8".into());

        assert_eq!(registry.online_anzahl(), 1);
        assert_eq!(registry.origin_von(&user).unwrap(), "8.8.8.8");

        registry.senden_an(&user, ServerEvent::WaitingForMatch);
        assert!(neu.recv().await.is_some());
        // Alter Kanal ist verwaist und liefert nichts mehr
        assert!(alt.try_recv().is_err());
    }

    #[tokio::test]
    async fn voller_puffer_verwirft_statt_zu_blockieren() {
        let registry = PresenceRegistry::neu();
        let user = UserId::new();
        let _rx = registry.registrieren(user, "9.9.9.9".into());

        for i in 0..SENDE_PUFFER {
            assert!(registry.senden_an(&user, ServerEvent::Ping { timestamp_ms: i as u64 }));
        }
        assert!(!registry.senden_an(&user, ServerEvent::Ping { timestamp_ms: 0 }));
    }
}
