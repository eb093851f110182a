//! Gemeinsamer Server-Zustand fuer die Verbindungsschicht
//!
//! Haelt die geteilten Services als Arc-Referenzen, die sicher zwischen
//! tokio-Tasks geteilt werden koennen.

use std::sync::Arc;
use std::time::Instant;

use plauderei_matching::MatchingService;
use plauderei_moderation::classifier::Klassifizierer;
use plauderei_moderation::tracker::ViolationTracker;
use plauderei_storage::{BlockRepository, MessageRepository, SessionRepository};

/// Konfiguration fuer die Verbindungsschicht
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Clients
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
        }
    }
}

/// Gemeinsamer Server-Zustand (Arc-geteilt)
pub struct SignalingState<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Vermittlungs-Engine (Queue, Sessions, Nachrichtenpfad)
    pub matching: Arc<MatchingService<S, K, B>>,
    /// Verstoss-Tracker fuer die Herkunftspruefung beim Verbindungsaufbau
    pub tracker: Arc<ViolationTracker<B>>,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl<S, K, B> SignalingState<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    /// Erstellt einen neuen SignalingState
    pub fn neu(
        config: SignalingConfig,
        matching: Arc<MatchingService<S, K, B>>,
        tracker: Arc<ViolationTracker<B>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            matching,
            tracker,
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
