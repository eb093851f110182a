//! Klassifizierer-Kollaborateur-Schnittstelle
//!
//! Der Kern besitzt keinen eigenen Klassifikationsalgorithmus; er
//! konsumiert nur den Ausgabe-Kontrakt eines externen Textklassifizierers:
//! ein Flagged-Bit plus Kategorie-Scores zwischen 0.0 und 1.0.
//!
//! Die dynamischen Kategorie-Schluessel des Kollaborateurs werden auf
//! einen endlichen Enum abgebildet; unbekannte Schluessel landen im
//! `Unbekannt`-Fallback statt in einem offenen Record.

use thiserror::Error;

/// Bekannte Moderations-Kategorien
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kategorie {
    /// Sexuelle Inhalte mit Minderjaehrigen (Hochrisiko)
    SexuellMinderjaehrige,
    /// Glaubwuerdige Drohung (Hochrisiko)
    GlaubwuerdigeDrohung,
    /// Grafische Gewaltdarstellung (Hochrisiko)
    GrafischeGewalt,
    /// Selbstverletzung (Hochrisiko)
    Selbstverletzung,
    /// Sexuelle Inhalte
    Sexuell,
    /// Belaestigung
    Belaestigung,
    /// Hassrede
    Hass,
    /// Gewalt
    Gewalt,
    /// Vom Kollaborateur gelieferter, hier unbekannter Schluessel
    Unbekannt(String),
}

impl Kategorie {
    /// Mappt einen Kategorie-Schluessel des Klassifizierers
    pub fn von_schluessel(schluessel: &str) -> Self {
        match schluessel {
            "sexual_minors" => Self::SexuellMinderjaehrige,
            "credible_threat" => Self::GlaubwuerdigeDrohung,
            "graphic_violence" => Self::GrafischeGewalt,
            "self_harm" => Self::Selbstverletzung,
            "sexual" => Self::Sexuell,
            "harassment" => Self::Belaestigung,
            "hate" => Self::Hass,
            "violence" => Self::Gewalt,
            other => Self::Unbekannt(other.to_string()),
        }
    }

    /// Gibt den Wire-Schluessel der Kategorie zurueck
    pub fn schluessel(&self) -> &str {
        match self {
            Self::SexuellMinderjaehrige => "sexual_minors",
            Self::GlaubwuerdigeDrohung => "credible_threat",
            Self::GrafischeGewalt => "graphic_violence",
            Self::Selbstverletzung => "self_harm",
            Self::Sexuell => "sexual",
            Self::Belaestigung => "harassment",
            Self::Hass => "hate",
            Self::Gewalt => "violence",
            Self::Unbekannt(s) => s,
        }
    }

    /// `true` fuer Kategorien der Hochrisiko-Menge
    ///
    /// Ein Score ueber der Hochrisiko-Schwelle in einer dieser Kategorien
    /// fuehrt unabhaengig vom Maximal-Score zu Schweregrad `high`.
    pub fn ist_hochrisiko(&self) -> bool {
        matches!(
            self,
            Self::SexuellMinderjaehrige
                | Self::GlaubwuerdigeDrohung
                | Self::GrafischeGewalt
                | Self::Selbstverletzung
        )
    }
}

impl std::fmt::Display for Kategorie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.schluessel())
    }
}

/// Ausgabe-Kontrakt des Klassifizierers
#[derive(Debug, Clone, Default)]
pub struct KlassifikationsErgebnis {
    /// Gesamturteil des Klassifizierers
    pub flagged: bool,
    /// Kategorie-Scores zwischen 0.0 und 1.0
    pub category_scores: Vec<(Kategorie, f64)>,
}

impl KlassifikationsErgebnis {
    /// Unauffaelliges Ergebnis ohne Scores
    pub fn unauffaellig() -> Self {
        Self::default()
    }
}

/// Fehler des Klassifizierer-Kollaborateurs
#[derive(Debug, Error)]
pub enum KlassifiziererFehler {
    #[error("Klassifizierer nicht erreichbar: {0}")]
    NichtErreichbar(String),

    #[error("Ungueltige Klassifizierer-Antwort: {0}")]
    UngueltigeAntwort(String),
}

/// Externer Textklassifizierer
///
/// Hinweis: async fn im Trait ohne Send-Garantie (async_fn_in_trait) –
/// die Verbindungs-Tasks laufen deshalb in einer `tokio::task::LocalSet`.
#[allow(async_fn_in_trait)]
pub trait Klassifizierer: Send + Sync {
    /// Bewertet einen Text und liefert Flagged-Bit plus Kategorie-Scores
    async fn klassifizieren(
        &self,
        text: &str,
    ) -> Result<KlassifikationsErgebnis, KlassifiziererFehler>;
}

/// Klassifizierer-Attrappe fuer Betrieb ohne konfigurierten Kollaborateur
///
/// Liefert immer ein unauffaelliges Ergebnis. Entspricht der Fail-Open-
/// Policy: ohne Klassifizierer wird nichts beanstandet.
#[derive(Debug, Default, Clone)]
pub struct NullKlassifizierer;

impl Klassifizierer for NullKlassifizierer {
    async fn klassifizieren(
        &self,
        _text: &str,
    ) -> Result<KlassifikationsErgebnis, KlassifiziererFehler> {
        Ok(KlassifikationsErgebnis::unauffaellig())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schluessel_round_trip() {
        for schluessel in [
            "sexual_minors",
            "credible_threat",
            "graphic_violence",
            "self_harm",
            "sexual",
            "harassment",
            "hate",
            "violence",
        ] {
            assert_eq!(Kategorie::von_schluessel(schluessel).schluessel(), schluessel);
        }
    }

    #[test]
    fn unbekannter_schluessel_faellt_in_fallback() {
        let kat = Kategorie::von_schluessel("brandneu");
        assert_eq!(kat, Kategorie::Unbekannt("brandneu".into()));
        assert!(!kat.ist_hochrisiko());
    }

    #[test]
    fn hochrisiko_menge() {
        assert!(Kategorie::SexuellMinderjaehrige.ist_hochrisiko());
        assert!(Kategorie::GlaubwuerdigeDrohung.ist_hochrisiko());
        assert!(Kategorie::GrafischeGewalt.ist_hochrisiko());
        assert!(Kategorie::Selbstverletzung.ist_hochrisiko());
        assert!(!Kategorie::Belaestigung.ist_hochrisiko());
        assert!(!Kategorie::Sexuell.ist_hochrisiko());
    }

    #[tokio::test]
    async fn null_klassifizierer_ist_unauffaellig() {
        let k = NullKlassifizierer;
        let ergebnis = k.klassifizieren("irgendein Text").await.unwrap();
        assert!(!ergebnis.flagged);
        assert!(ergebnis.category_scores.is_empty());
    }
}
