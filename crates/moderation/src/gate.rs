//! ModerationGate – Klassifizierung und Schweregrad-Mapping
//!
//! Das Gate sitzt im heissen Nachrichtenpfad: jeder Nachrichteninhalt
//! wird klassifiziert bevor er zugestellt wird.
//!
//! ## Schweregrad-Policy
//! - Hochrisiko-Kategorie mit Score > 0.8 => `high`
//! - sonst: Maximal-Score > 0.9 => `high`; > 0.7 => `medium`;
//!   Klassifizierer hat ueberhaupt beanstandet => `low`
//!
//! ## Fail-Open
//! Ist der Klassifizierer nicht erreichbar, gilt die Nachricht als
//! unauffaellig. Echtzeit-Zustellung hat Vorrang vor Moderations-
//! Verfuegbarkeit; der Ausfall wird geloggt.

use std::sync::Arc;

use plauderei_core::types::Severity;
use plauderei_storage::BlockRepository;

use crate::classifier::{Kategorie, KlassifikationsErgebnis, Klassifizierer};
use crate::tracker::ViolationTracker;

/// Score-Schwelle fuer Hochrisiko-Kategorien
const HOCHRISIKO_SCHWELLE: f64 = 0.8;

/// Maximal-Score-Schwelle fuer Schweregrad `high`
const HIGH_SCHWELLE: f64 = 0.9;

/// Maximal-Score-Schwelle fuer Schweregrad `medium`
const MEDIUM_SCHWELLE: f64 = 0.7;

/// Score ab dem eine Kategorie im Urteil genannt wird
const NENNUNGS_SCHWELLE: f64 = 0.5;

/// Moderations-Urteil fuer einen Nachrichteninhalt
#[derive(Debug, Clone)]
pub struct Verdict {
    pub flagged: bool,
    /// Kategorien die zum Urteil beigetragen haben
    pub categories: Vec<Kategorie>,
    pub severity: Severity,
}

impl Verdict {
    /// Unauffaelliges Urteil (auch der Fail-Open-Fall)
    pub fn unauffaellig() -> Self {
        Self {
            flagged: false,
            categories: Vec::new(),
            severity: Severity::None,
        }
    }

    /// Kurzer Grund-Text fuer `moderation_flag`/`kicked`-Events
    pub fn grund(&self) -> String {
        if self.categories.is_empty() {
            "Inhaltsrichtlinie verletzt".to_string()
        } else {
            self.categories
                .iter()
                .map(|k| k.schluessel())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

/// Klassifiziert Nachrichteninhalte und meldet Verstoesse an den Tracker
pub struct ModerationGate<K: Klassifizierer, B: BlockRepository> {
    klassifizierer: Arc<K>,
    tracker: Arc<ViolationTracker<B>>,
}

impl<K, B> ModerationGate<K, B>
where
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    /// Erstellt ein neues ModerationGate
    pub fn neu(klassifizierer: Arc<K>, tracker: Arc<ViolationTracker<B>>) -> Arc<Self> {
        Arc::new(Self {
            klassifizierer,
            tracker,
        })
    }

    /// Klassifiziert einen Text und liefert das Urteil
    ///
    /// Leerer oder nur aus Whitespace bestehender Text wird nie
    /// beanstandet; der Klassifizierer-Aufruf entfaellt. Bei Schweregrad
    /// ungleich `none` und vorhandenem `origin_key` wird der Verstoss im
    /// Tracker erfasst und eine etwaige Block-Entscheidung als
    /// Hintergrundarbeit eingereicht.
    pub async fn einstufen(&self, text: &str, origin_key: Option<&str>) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::unauffaellig();
        }

        let ergebnis = match self.klassifizierer.klassifizieren(text).await {
            Ok(e) => e,
            Err(e) => {
                // Fail-open: Zustellung hat Vorrang vor Moderation
                tracing::warn!(fehler = %e, "Klassifizierer ausgefallen – fail-open");
                return Verdict::unauffaellig();
            }
        };

        let urteil = urteil_bilden(&ergebnis);

        if urteil.severity != Severity::None {
            tracing::info!(
                severity = %urteil.severity,
                kategorien = %urteil.grund(),
                "Nachricht beanstandet"
            );
            if let Some(key) = origin_key {
                if let Some(entscheidung) = self.tracker.verstoss_erfassen(key, urteil.severity) {
                    self.tracker.block_einreichen(entscheidung);
                }
            }
        }

        urteil
    }
}

/// Mappt ein Klassifizierer-Ergebnis auf das Moderations-Urteil
fn urteil_bilden(ergebnis: &KlassifikationsErgebnis) -> Verdict {
    let mut max_score: f64 = 0.0;
    let mut hochrisiko = false;
    let mut categories = Vec::new();

    for (kategorie, score) in &ergebnis.category_scores {
        if kategorie.ist_hochrisiko() && *score > HOCHRISIKO_SCHWELLE {
            hochrisiko = true;
        }
        if *score > max_score {
            max_score = *score;
        }
        if *score > NENNUNGS_SCHWELLE {
            categories.push(kategorie.clone());
        }
    }

    let severity = if hochrisiko || max_score > HIGH_SCHWELLE {
        Severity::High
    } else if max_score > MEDIUM_SCHWELLE {
        Severity::Medium
    } else if ergebnis.flagged {
        Severity::Low
    } else {
        Severity::None
    };

    Verdict {
        flagged: severity != Severity::None,
        categories,
        severity,
    }
}
