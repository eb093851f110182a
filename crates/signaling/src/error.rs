//! Fehlertypen fuer die Verbindungsschicht

use thiserror::Error;

/// Fehlertyp fuer die Verbindungsschicht
///
/// Verbindungs-Fehler einzelner Clients (Frame-Fehler, Timeouts)
/// trennen nur die betroffene Verbindung und tauchen hier nicht auf;
/// dieser Typ deckt die Fehler des Listeners selbst ab.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Bind, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

/// Result-Typ fuer die Verbindungsschicht
pub type SignalingResult<T> = Result<T, SignalingError>;
