//! Gemeinsame Identifikations- und Vokabulartypen fuer Plauderei
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Teilnehmer-ID
///
/// Gilt fuer die Dauer einer Verbindung. Gastbenutzer bekommen beim
/// Verbindungsaufbau eine frisch erzeugte ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Eindeutige Session-ID (eine gepaarte Zwei-Parteien-Unterhaltung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Authentifizierte Identitaet eines Teilnehmers
///
/// Wird beim Verbindungsaufbau von der externen Identitaetsschicht
/// geliefert. Der Kern fuehrt keine eigene Verifikation durch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    /// `true` fuer registrierte Konten, `false` fuer Gaeste
    pub durable_account: bool,
}

impl Identity {
    /// Erstellt eine Gast-Identitaet mit frischer UserId
    pub fn gast() -> Self {
        Self {
            user_id: UserId::new(),
            durable_account: false,
        }
    }
}

/// Grund fuer das Ende einer Session
///
/// Die Variantennamen sind zugleich die Wire-Repraesentation im
/// `partner_disconnected`-Event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Regulaer beendet (`disconnect_chat`)
    Ended,
    /// Partner hat uebersprungen (`skip_partner`)
    Skipped,
    /// Verbindung getrennt
    Disconnected,
    /// Wegen schwerem Moderationsverstoss beendet
    Kicked,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ended => write!(f, "Ended"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Kicked => write!(f, "Kicked"),
        }
    }
}

/// Schweregrad eines Moderationsbefunds
///
/// Wird aus den Kategorie-Scores des Klassifizierers abgeleitet und
/// steuert sowohl die Session-Aktion als auch die Eskalation im
/// ViolationTracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// `true` wenn der Schweregrad als Verwarnung zaehlt (medium/high)
    pub fn ist_verwarnung(&self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_eindeutig() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b, "Zwei neue UserIds muessen verschieden sein");
    }

    #[test]
    fn session_id_display() {
        let id = SessionId(Uuid::nil());
        assert!(id.to_string().starts_with("session:"));
    }

    #[test]
    fn gast_identitaet_ist_nicht_dauerhaft() {
        let gast = Identity::gast();
        assert!(!gast.durable_account);
    }

    #[test]
    fn end_reason_wire_format() {
        let json = serde_json::to_string(&EndReason::Skipped).unwrap();
        assert_eq!(json, "\"Skipped\"");
    }

    #[test]
    fn severity_ordnung_und_verwarnung() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::High.ist_verwarnung());
        assert!(Severity::Medium.ist_verwarnung());
        assert!(!Severity::Low.ist_verwarnung());
    }

    #[test]
    fn severity_serde_kleinschreibung() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let zurueck: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(zurueck, Severity::Medium);
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let uid = UserId::new();
        let json = serde_json::to_string(&uid).unwrap();
        let uid2: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, uid2);
    }
}
