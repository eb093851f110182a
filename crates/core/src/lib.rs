//! plauderei-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Plauderei-Crates gemeinsam genutzt werden: Identifikations-
//! Newtypes, das gemeinsame Vokabular der Session-Lebenszyklen und der
//! zentrale Fehler-Enum.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PlaudereiError, Result};
pub use types::{EndReason, Identity, Severity, SessionId, UserId};
