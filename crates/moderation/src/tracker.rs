//! ViolationTracker – Verstoss-Zaehlung und Block-Eskalation
//!
//! Zaehlt Verstoesse pro Herkunfts-Key (verbindende Adresse) und
//! eskaliert nach fester Regel-Prioritaet zu Netzwerk-Blocks:
//!
//! 1. `high` und `warning_count >= 1` – sofortiger permanenter Block
//! 2. `medium` und `warning_count >= 3` – Block fuer 7 Tage
//! 3. `warning_count >= 5` (beliebige Mischung) – Block fuer 7 Tage
//!
//! Die Zaehler leben im Speicher und werden nie geloescht; das Ablaufen
//! eines Blocks ist Sache des `expires_at`-Felds beim Speicher-
//! Kollaborateur. Das Anwenden eines Blocks ist losgeloeste
//! Hintergrundarbeit und blockiert nie den Nachrichtenpfad.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

use plauderei_core::types::Severity;
use plauderei_storage::{models::NeuerBlock, BlockRepository};

/// Blockdauer fuer zeitlich begrenzte Blocks: 7 Tage
const BLOCK_FENSTER_TAGE: i64 = 7;

/// Verwarnungsschwelle fuer wiederholte `medium`-Verstoesse
const MEDIUM_SCHWELLE: u32 = 3;

/// Verwarnungsschwelle fuer gemischte Verstoesse
const GEMISCHT_SCHWELLE: u32 = 5;

/// Verstoss-Zaehler eines Herkunfts-Keys
#[derive(Debug, Clone)]
pub struct ViolationRecord {
    pub subject_key: String,
    /// Alle Verstoesse, unabhaengig vom Schweregrad
    pub total_count: u32,
    /// Nur Verstoesse mit Schweregrad medium/high
    pub warning_count: u32,
    pub last_violation_at: DateTime<Utc>,
}

/// Block-Entscheidung, wird an den Speicher-Kollaborateur uebergeben
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDecision {
    pub subject_key: String,
    pub reason: String,
    pub severity: Severity,
    /// `None` = permanenter Block
    pub expires_at: Option<DateTime<Utc>>,
}

/// Zaehlt Verstoesse pro Herkunfts-Key und eskaliert zu Blocks
///
/// Thread-safe via Arc + DashMap. Clone des Trackers teilt den inneren
/// Zustand. Das autoritative Block-Urteil liegt beim Speicher-
/// Kollaborateur, nicht im Tracker.
pub struct ViolationTracker<B: BlockRepository> {
    records: DashMap<String, ViolationRecord>,
    /// Async-Sperre pro Key: Lesen und Erweitern eines Blocks laufen
    /// strikt nacheinander
    block_sperren: DashMap<String, Arc<AsyncMutex<()>>>,
    repo: Arc<B>,
}

impl<B: BlockRepository + 'static> ViolationTracker<B> {
    /// Erstellt einen neuen ViolationTracker
    pub fn neu(repo: Arc<B>) -> Arc<Self> {
        Arc::new(Self {
            records: DashMap::new(),
            block_sperren: DashMap::new(),
            repo,
        })
    }

    /// Erfasst einen Verstoss und wertet die Eskalationsregeln aus
    ///
    /// Gibt die Block-Entscheidung zurueck wenn eine Regel gegriffen hat.
    /// Die Entscheidung ist zu diesem Zeitpunkt noch nicht angewendet;
    /// dafuer sorgt `block_einreichen`.
    pub fn verstoss_erfassen(&self, subject_key: &str, severity: Severity) -> Option<BlockDecision> {
        if severity == Severity::None {
            return None;
        }

        let jetzt = Utc::now();
        let mut record = self
            .records
            .entry(subject_key.to_string())
            .or_insert_with(|| ViolationRecord {
                subject_key: subject_key.to_string(),
                total_count: 0,
                warning_count: 0,
                last_violation_at: jetzt,
            });

        record.total_count += 1;
        if severity.ist_verwarnung() {
            record.warning_count += 1;
        }
        record.last_violation_at = jetzt;

        tracing::debug!(
            subject_key = %subject_key,
            severity = %severity,
            total = record.total_count,
            verwarnungen = record.warning_count,
            "Verstoss erfasst"
        );

        // Regeln in fester Prioritaet auswerten
        let (grund, expires_at) = if severity == Severity::High && record.warning_count >= 1 {
            (
                format!("Schwerer Verstoss (high) nach {} Verwarnungen", record.warning_count),
                None,
            )
        } else if severity == Severity::Medium && record.warning_count >= MEDIUM_SCHWELLE {
            (
                format!("{} Verwarnungen mit Schweregrad medium", record.warning_count),
                Some(jetzt + Duration::days(BLOCK_FENSTER_TAGE)),
            )
        } else if record.warning_count >= GEMISCHT_SCHWELLE {
            (
                format!("{} Verwarnungen insgesamt", record.warning_count),
                Some(jetzt + Duration::days(BLOCK_FENSTER_TAGE)),
            )
        } else {
            return None;
        };

        let entscheidung = BlockDecision {
            subject_key: subject_key.to_string(),
            reason: grund,
            severity,
            expires_at,
        };

        tracing::warn!(
            subject_key = %subject_key,
            severity = %severity,
            permanent = entscheidung.expires_at.is_none(),
            grund = %entscheidung.reason,
            "Block-Entscheidung getroffen"
        );

        Some(entscheidung)
    }

    /// Reicht eine Block-Entscheidung als losgeloeste Hintergrundarbeit ein
    ///
    /// Fehlschlaege beim Speicher-Kollaborateur werden nur geloggt.
    /// Muss innerhalb einer `tokio::task::LocalSet` laufen.
    pub fn block_einreichen(self: &Arc<Self>, entscheidung: BlockDecision) {
        let tracker = Arc::clone(self);
        tokio::task::spawn_local(async move {
            if let Err(e) = tracker.block_anwenden(entscheidung).await {
                tracing::warn!(fehler = %e, "Block konnte nicht gespeichert werden");
            }
        });
    }

    /// Wendet eine Block-Entscheidung auf den Speicher an
    ///
    /// Ein bereits bestehender Block desselben Keys wird erweitert:
    /// Grund angehaengt, `expires_at` nur verbreitert, nie verkuerzt.
    /// Lesen und Schreiben desselben Keys sind serialisiert, damit
    /// gleichzeitige Entscheidungen einander nicht ueberschreiben.
    pub async fn block_anwenden(
        &self,
        entscheidung: BlockDecision,
    ) -> Result<(), plauderei_storage::DbError> {
        let sperre = Arc::clone(
            &self
                .block_sperren
                .entry(entscheidung.subject_key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );
        let _wache = sperre.lock().await;

        let bestehend = self.repo.current_block(&entscheidung.subject_key).await?;

        let (grund, severity, expires_at) = match bestehend {
            Some(alt) => {
                let grund = format!("{}; {}", alt.reason, entscheidung.reason);
                let severity = alt.severity.max(entscheidung.severity);
                // Permanenter Block (None) ist die breiteste Form
                let expires_at = match (alt.expires_at, entscheidung.expires_at) {
                    (None, _) | (_, None) => None,
                    (Some(a), Some(b)) => Some(a.max(b)),
                };
                (grund, severity, expires_at)
            }
            None => (
                entscheidung.reason,
                entscheidung.severity,
                entscheidung.expires_at,
            ),
        };

        self.repo
            .apply_block(NeuerBlock {
                subject_key: &entscheidung.subject_key,
                reason: &grund,
                severity,
                expires_at,
            })
            .await?;

        tracing::info!(
            subject_key = %entscheidung.subject_key,
            permanent = expires_at.is_none(),
            "Block angewendet"
        );
        Ok(())
    }

    /// Prueft ob ein Herkunfts-Key aktuell blockiert ist
    ///
    /// Delegiert an den Speicher-Kollaborateur; der Tracker haelt kein
    /// eigenes Block-Urteil. Bei Speicherfehlern fail-open (`false`).
    pub async fn ist_blockiert(&self, subject_key: &str) -> bool {
        match self.repo.is_origin_blocked(subject_key).await {
            Ok(blockiert) => blockiert,
            Err(e) => {
                tracing::warn!(
                    subject_key = %subject_key,
                    fehler = %e,
                    "Block-Pruefung fehlgeschlagen – fail-open"
                );
                false
            }
        }
    }

    /// Gibt den aktuellen Zaehlerstand eines Keys zurueck (fuer Tests/Diagnose)
    pub fn record_von(&self, subject_key: &str) -> Option<ViolationRecord> {
        self.records.get(subject_key).map(|r| r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    use plauderei_storage::models::BlockRecord;
    use plauderei_storage::{DbResult, MemoryDb};

    fn test_tracker() -> Arc<ViolationTracker<MemoryDb>> {
        ViolationTracker::neu(Arc::new(MemoryDb::neu()))
    }

    /// Speicher-Huelle, deren erste Block-Abfrage bis zur Freigabe wartet
    ///
    /// Haelt `block_anwenden` nach dem Lesen des Bestands an, damit
    /// Tests eine zweite Entscheidung dazwischenschieben koennen.
    struct ZoegernderBlockSpeicher {
        inner: MemoryDb,
        freigabe: Notify,
        erste_abfrage: AtomicBool,
    }

    impl BlockRepository for ZoegernderBlockSpeicher {
        async fn apply_block(&self, data: NeuerBlock<'_>) -> DbResult<BlockRecord> {
            self.inner.apply_block(data).await
        }

        async fn current_block(&self, subject_key: &str) -> DbResult<Option<BlockRecord>> {
            let ergebnis = self.inner.current_block(subject_key).await;
            if self.erste_abfrage.swap(false, Ordering::SeqCst) {
                self.freigabe.notified().await;
            }
            ergebnis
        }

        async fn is_origin_blocked(&self, subject_key: &str) -> DbResult<bool> {
            self.inner.is_origin_blocked(subject_key).await
        }
    }

    #[test]
    fn erster_high_verstoss_blockt_sofort_permanent() {
        let tracker = test_tracker();

        // Startzustand {0,0} -> ein high-Verstoss -> {1,1} -> Regel 1 greift
        assert!(tracker.record_von("1.2.3.4").is_none());
        let entscheidung = tracker.verstoss_erfassen("1.2.3.4", Severity::High);

        let record = tracker.record_von("1.2.3.4").unwrap();
        assert_eq!(record.total_count, 1);
        assert_eq!(record.warning_count, 1);

        let entscheidung = entscheidung.expect("Regel 1 muss greifen");
        assert_eq!(entscheidung.expires_at, None, "permanenter Block");
        assert_eq!(entscheidung.severity, Severity::High);
    }

    #[test]
    fn drei_medium_verstoesse_blocken_beim_dritten() {
        let tracker = test_tracker();

        assert!(tracker.verstoss_erfassen("k", Severity::Medium).is_none());
        assert!(tracker.verstoss_erfassen("k", Severity::Medium).is_none());
        let entscheidung = tracker
            .verstoss_erfassen("k", Severity::Medium)
            .expect("dritter medium-Verstoss muss blocken");

        let expires = entscheidung.expires_at.expect("7-Tage-Fenster, nicht permanent");
        let rest = expires - Utc::now();
        assert!(rest > Duration::days(6) && rest <= Duration::days(7));
    }

    #[test]
    fn low_verstoesse_zaehlen_nicht_als_verwarnung() {
        let tracker = test_tracker();

        for _ in 0..10 {
            assert!(tracker.verstoss_erfassen("k", Severity::Low).is_none());
        }

        let record = tracker.record_von("k").unwrap();
        assert_eq!(record.total_count, 10);
        assert_eq!(record.warning_count, 0);
    }

    #[test]
    fn gemischte_verwarnungen_blocken_ab_fuenf() {
        let tracker = test_tracker();

        // Fuenf Verwarnungen ansammeln, dann ein low-Verstoss: Regel 1 und 2
        // greifen nicht (Schweregrad low), Regel 3 muss den Block ausloesen.
        for _ in 0..5 {
            tracker.verstoss_erfassen("k", Severity::Medium);
        }
        assert_eq!(tracker.record_von("k").unwrap().warning_count, 5);

        let entscheidung = tracker
            .verstoss_erfassen("k", Severity::Low)
            .expect("Regel 3 muss bei >= 5 Verwarnungen greifen");
        assert!(entscheidung.expires_at.is_some(), "7-Tage-Fenster");
        assert_eq!(tracker.record_von("k").unwrap().warning_count, 5);
        assert_eq!(tracker.record_von("k").unwrap().total_count, 6);
    }

    #[test]
    fn keys_werden_getrennt_gezaehlt() {
        let tracker = test_tracker();

        tracker.verstoss_erfassen("a", Severity::Medium);
        tracker.verstoss_erfassen("b", Severity::Medium);

        assert_eq!(tracker.record_von("a").unwrap().total_count, 1);
        assert_eq!(tracker.record_von("b").unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn block_anwenden_und_pruefen() {
        let repo = Arc::new(MemoryDb::neu());
        let tracker = ViolationTracker::neu(Arc::clone(&repo));

        let entscheidung = tracker
            .verstoss_erfassen("9.9.9.9", Severity::High)
            .unwrap();
        tracker.block_anwenden(entscheidung).await.unwrap();

        assert!(tracker.ist_blockiert("9.9.9.9").await);
        assert!(!tracker.ist_blockiert("8.8.8.8").await);
    }

    #[tokio::test]
    async fn bestehender_block_wird_erweitert_nie_verkuerzt() {
        let repo = Arc::new(MemoryDb::neu());
        let tracker = ViolationTracker::neu(Arc::clone(&repo));

        // Erst ein permanenter Block
        tracker
            .block_anwenden(BlockDecision {
                subject_key: "x".into(),
                reason: "Erster Grund".into(),
                severity: Severity::High,
                expires_at: None,
            })
            .await
            .unwrap();

        // Dann ein zeitlich begrenzter – darf den permanenten nicht verkuerzen
        tracker
            .block_anwenden(BlockDecision {
                subject_key: "x".into(),
                reason: "Zweiter Grund".into(),
                severity: Severity::Medium,
                expires_at: Some(Utc::now() + Duration::days(7)),
            })
            .await
            .unwrap();

        use plauderei_storage::BlockRepository;
        let block = repo.current_block("x").await.unwrap().unwrap();
        assert_eq!(block.expires_at, None, "permanent bleibt permanent");
        assert!(block.reason.contains("Erster Grund"));
        assert!(block.reason.contains("Zweiter Grund"));
        assert_eq!(block.severity, Severity::High);
    }

    #[tokio::test]
    async fn gleichzeitige_entscheidungen_verlieren_keine_erweiterung() {
        let repo = Arc::new(ZoegernderBlockSpeicher {
            inner: MemoryDb::neu(),
            freigabe: Notify::new(),
            erste_abfrage: AtomicBool::new(true),
        });
        let tracker = ViolationTracker::neu(Arc::clone(&repo));

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                // Erste Entscheidung parkt nach dem Lesen des Bestands
                let t = Arc::clone(&tracker);
                let erste = tokio::task::spawn_local(async move {
                    t.block_anwenden(BlockDecision {
                        subject_key: "z".into(),
                        reason: "erste Regel".into(),
                        severity: Severity::Medium,
                        expires_at: Some(Utc::now() + Duration::days(7)),
                    })
                    .await
                });
                tokio::task::yield_now().await;

                // Zweite Entscheidung desselben Keys laeuft nebenher an
                let t = Arc::clone(&tracker);
                let zweite = tokio::task::spawn_local(async move {
                    t.block_anwenden(BlockDecision {
                        subject_key: "z".into(),
                        reason: "zweite Regel".into(),
                        severity: Severity::High,
                        expires_at: None,
                    })
                    .await
                });
                tokio::task::yield_now().await;

                repo.freigabe.notify_one();
                erste.await.unwrap().unwrap();
                zweite.await.unwrap().unwrap();
            })
            .await;

        // Beide Erweiterungen sind angekommen, die breiteste Form gewinnt
        let block = repo.inner.current_block("z").await.unwrap().unwrap();
        assert!(block.reason.contains("erste Regel"));
        assert!(block.reason.contains("zweite Regel"));
        assert_eq!(block.expires_at, None);
        assert_eq!(block.severity, Severity::High);
    }

    #[tokio::test]
    async fn zeitfenster_wird_verbreitert() {
        let repo = Arc::new(MemoryDb::neu());
        let tracker = ViolationTracker::neu(Arc::clone(&repo));

        let kurz = Utc::now() + Duration::days(1);
        let lang = Utc::now() + Duration::days(7);

        tracker
            .block_anwenden(BlockDecision {
                subject_key: "y".into(),
                reason: "lang".into(),
                severity: Severity::Medium,
                expires_at: Some(lang),
            })
            .await
            .unwrap();

        tracker
            .block_anwenden(BlockDecision {
                subject_key: "y".into(),
                reason: "kurz".into(),
                severity: Severity::Medium,
                expires_at: Some(kurz),
            })
            .await
            .unwrap();

        use plauderei_storage::BlockRepository;
        let block = repo.current_block("y").await.unwrap().unwrap();
        assert_eq!(block.expires_at, Some(lang), "Fenster nie verkuerzen");
    }
}
