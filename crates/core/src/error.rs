//! Fehlertypen fuer Plauderei
//!
//! Zentraler Fehler-Enum entlang der Fehlertaxonomie des Systems.
//! Untermodule definieren eigene Fehler und konvertieren via `#[from]`
//! oder explizitem Mapping in diese Kategorien.

use thiserror::Error;

/// Globaler Result-Alias fuer Plauderei
pub type Result<T> = std::result::Result<T, PlaudereiError>;

/// Alle Fehlerkategorien im Plauderei-System
#[derive(Debug, Error)]
pub enum PlaudereiError {
    /// Fehlerhafte oder leere Pflichtfelder in einer Anfrage
    #[error("Ungueltige Anfrage: {0}")]
    UngueltigeAnfrage(String),

    /// Aktion im aktuellen Zustand nicht erlaubt (z.B. Nachricht ohne Session)
    #[error("Zustandskonflikt: {0}")]
    Zustandskonflikt(String),

    /// Externer Kollaborateur (Klassifizierer, Speicher) nicht erreichbar
    #[error("Externer Dienst nicht erreichbar: {0}")]
    ExternNichtErreichbar(String),

    /// Interne Invariante verletzt – wird geloggt und defensiv bereinigt
    #[error("Invariante verletzt: {0}")]
    InvarianteVerletzt(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl PlaudereiError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// `true` wenn der Fehler dem Aufrufer als `error`-Event gemeldet wird
    ///
    /// Invariantenverletzungen werden nur als generischer interner Fehler
    /// nach aussen gegeben, der volle Kontext bleibt im Log.
    pub fn ist_benutzer_fehler(&self) -> bool {
        matches!(self, Self::UngueltigeAnfrage(_) | Self::Zustandskonflikt(_))
    }
}
