//! MatchingService – Vermittlung, Session-Lebenszyklus und Nachrichtenpfad
//!
//! Der Service haelt Warteschlange und Session-Index unter einer
//! gemeinsamen Sperre: eine Vermittlung entnimmt aus der Queue und
//! legt die Session im Index an, ohne dass dazwischen ein anderer
//! Aufrufer denselben Wartenden sieht.
//!
//! ## Nachrichtenpfad
//! Die Klassifizierung ist ein await-Punkt und darf die synchrone
//! Sperre nicht halten. Stattdessen serialisiert eine async-Sperre pro
//! Session die Nachrichten einer Session, und nach der Klassifizierung
//! wird die Session gegen den Index re-validiert: ist sie inzwischen
//! beendet, wird die Nachricht als verfallen verworfen statt in eine
//! fremde oder tote Session zugestellt.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use plauderei_core::error::PlaudereiError;
use plauderei_core::types::{EndReason, SessionId, Severity, UserId};
use plauderei_moderation::classifier::Klassifizierer;
use plauderei_moderation::gate::ModerationGate;
use plauderei_protocol::events::ServerEvent;
use plauderei_storage::{
    BlockRepository, MessageRepository, NeueNachricht, NeueSession, SessionRepository,
};

use crate::presence::PresenceRegistry;
use crate::queue::MatchQueue;
use crate::session::SessionIndex;

/// Maximale Nachrichtenlaenge in Zeichen
pub const MAX_NACHRICHT_ZEICHEN: usize = 4096;

/// Ausgang einer Partnersuche
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchErgebnis {
    /// In die Warteschlange eingereiht
    Wartend,
    /// Partner gefunden, Session laeuft
    Vermittelt {
        session_id: SessionId,
        partner: UserId,
    },
}

/// Ausgang einer Nachrichten-Weiterleitung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayErgebnis {
    /// An den Partner zugestellt
    Zugestellt,
    /// Beanstandet und nicht zugestellt
    Beanstandet { severity: Severity, grund: String },
    /// Schwerer Verstoss, Session wurde beendet
    SessionBeendet { grund: String },
    /// Session endete waehrend der Klassifizierung, Nachricht verworfen
    Verfallen,
}

/// Queue und Index unter einer Sperre
#[derive(Default)]
struct Inner {
    queue: MatchQueue,
    index: SessionIndex,
}

/// Vermittlungs- und Session-Engine
pub struct MatchingService<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    inner: Mutex<Inner>,
    /// Async-Sperre pro Session fuer die Nachrichten-Serialisierung
    session_sperren: DashMap<SessionId, Arc<AsyncMutex<()>>>,
    presence: Arc<PresenceRegistry>,
    gate: Arc<ModerationGate<K, B>>,
    repo: Arc<S>,
}

impl<S, K, B> MatchingService<S, K, B>
where
    S: SessionRepository + MessageRepository + 'static,
    K: Klassifizierer + 'static,
    B: BlockRepository + 'static,
{
    pub fn neu(
        presence: Arc<PresenceRegistry>,
        gate: Arc<ModerationGate<K, B>>,
        repo: Arc<S>,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            session_sperren: DashMap::new(),
            presence,
            gate,
            repo,
        })
    }

    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    // -----------------------------------------------------------------------
    // Vermittlung
    // -----------------------------------------------------------------------

    /// Sucht einen Partner fuer `suchender`
    ///
    /// Schlaegt mit `Zustandskonflikt` fehl wenn der Suchende bereits in
    /// einer Session ist. Bei erfolgreicher Vermittlung erhalten beide
    /// Teilnehmer `user_matched`, sonst der Suchende `waiting_for_match`.
    pub fn partner_suchen(&self, suchender: UserId) -> plauderei_core::Result<MatchErgebnis> {
        let (session_id, started_at, partner) = {
            let mut inner = self.inner.lock();
            if inner.index.session_von(&suchender)?.is_some() {
                return Err(PlaudereiError::Zustandskonflikt(
                    "bereits in einer Session".to_string(),
                ));
            }

            match inner.queue.partner_finden(suchender) {
                Some(partner) => {
                    let session = inner.index.erstellen(partner, suchender)?;
                    self.session_sperren
                        .insert(session.id, Arc::new(AsyncMutex::new(())));
                    (session.id, session.started_at, partner)
                }
                None => {
                    drop(inner);
                    tracing::debug!(user_id = %suchender, "In Warteschlange eingereiht");
                    self.presence
                        .senden_an(&suchender, ServerEvent::WaitingForMatch);
                    return Ok(MatchErgebnis::Wartend);
                }
            }
        };

        tracing::info!(
            session_id = %session_id,
            teilnehmer_a = %partner,
            teilnehmer_b = %suchender,
            "Session vermittelt"
        );
        self.presence
            .senden_an(&partner, ServerEvent::UserMatched { session_id });
        self.presence
            .senden_an(&suchender, ServerEvent::UserMatched { session_id });

        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_local(async move {
            let data = NeueSession {
                id: session_id,
                participant_a: partner,
                participant_b: suchender,
                started_at,
            };
            if let Err(e) = repo.create_session(data).await {
                tracing::warn!(session_id = %session_id, fehler = %e, "Session-Record nicht angelegt");
            }
        });

        Ok(MatchErgebnis::Vermittelt {
            session_id,
            partner,
        })
    }

    /// Entfernt eine wartende Identitaet aus der Warteschlange
    pub fn warteschlange_verlassen(&self, user_id: &UserId) -> bool {
        self.inner.lock().queue.entfernen(user_id)
    }

    // -----------------------------------------------------------------------
    // Session-Terminierung
    // -----------------------------------------------------------------------

    /// Beendet die aktive Session einer Identitaet
    ///
    /// Der Partner erhaelt `partner_disconnected` mit dem Grund. Gibt
    /// `false` zurueck wenn keine aktive Session existiert.
    pub fn beenden_fuer(&self, user_id: &UserId, grund: EndReason) -> plauderei_core::Result<bool> {
        let session = {
            let mut inner = self.inner.lock();
            let Some(session) = inner.index.session_von(user_id)? else {
                return Ok(false);
            };
            let id = session.id;
            inner.index.beenden(&id)
        };

        let Some(session) = session else {
            return Ok(false);
        };
        self.session_abschliessen(&session, *user_id, grund, true);
        Ok(true)
    }

    /// Raeumt eine getrennte Verbindung vollstaendig ab
    ///
    /// Entfernt die Presence-Registrierung, den Warteschlangen-Eintrag
    /// und beendet eine etwaige Session mit Grund `Disconnected`.
    pub fn getrennt(&self, user_id: &UserId) {
        self.presence.entfernen(user_id);
        let session = {
            let mut inner = self.inner.lock();
            inner.queue.entfernen(user_id);
            match inner.index.session_von(user_id) {
                Ok(Some(session)) => {
                    let id = session.id;
                    inner.index.beenden(&id)
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::error!(user_id = %user_id, fehler = %e, "Index-Inkonsistenz beim Abraeumen");
                    None
                }
            }
        };

        if let Some(session) = session {
            self.session_abschliessen(&session, *user_id, EndReason::Disconnected, true);
        }
        tracing::debug!(user_id = %user_id, "Verbindung abgeraeumt");
    }

    /// Beendet alle aktiven Sessions (Shutdown)
    ///
    /// Beide Teilnehmer erhalten `partner_disconnected` mit Grund
    /// `Disconnected`.
    pub fn zwangs_beenden_alle(&self) {
        let sessions: Vec<_> = {
            let mut inner = self.inner.lock();
            let ids = inner.index.aktive_ids();
            ids.iter().filter_map(|id| inner.index.beenden(id)).collect()
        };

        let anzahl = sessions.len();
        for session in sessions {
            self.session_sperren.remove(&session.id);
            let event = ServerEvent::PartnerDisconnected {
                reason: EndReason::Disconnected,
            };
            self.presence.senden_an(&session.participant_a, event.clone());
            self.presence.senden_an(&session.participant_b, event);
            self.session_record_schliessen(session.id, EndReason::Disconnected);
        }
        if anzahl > 0 {
            tracing::info!(anzahl, "Alle aktiven Sessions zwangsbeendet");
        }
    }

    /// Benachrichtigung und Record-Schliessung nach dem Index-Beenden
    ///
    /// `partner_benachrichtigen` steuert ob der jeweils andere Teilnehmer
    /// ein `partner_disconnected` erhaelt.
    fn session_abschliessen(
        &self,
        session: &crate::session::Session,
        ausloeser: UserId,
        grund: EndReason,
        partner_benachrichtigen: bool,
    ) {
        self.session_sperren.remove(&session.id);
        tracing::info!(
            session_id = %session.id,
            ausloeser = %ausloeser,
            grund = %grund,
            "Session beendet"
        );

        if partner_benachrichtigen {
            if let Some(partner) = session.partner_von(&ausloeser) {
                self.presence
                    .senden_an(&partner, ServerEvent::PartnerDisconnected { reason: grund });
            }
        }
        self.session_record_schliessen(session.id, grund);
    }

    fn session_record_schliessen(&self, session_id: SessionId, grund: EndReason) {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_local(async move {
            match repo.close_session(session_id, Utc::now(), grund).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(session_id = %session_id, "Kein offener Session-Record zum Schliessen")
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, fehler = %e, "Session-Record nicht geschlossen")
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // Nachrichtenpfad
    // -----------------------------------------------------------------------

    /// Leitet eine Nachricht an den Session-Partner weiter
    ///
    /// Die Nachricht durchlaeuft das Moderations-Gate. Je nach
    /// Schweregrad wird zugestellt, beanstandet oder die Session mit
    /// Grund `Kicked` beendet. Endet die Session waehrend der
    /// Klassifizierung, verfaellt die Nachricht.
    pub async fn nachricht_weiterleiten(
        &self,
        sender: UserId,
        content: &str,
    ) -> plauderei_core::Result<RelayErgebnis> {
        if content.chars().count() > MAX_NACHRICHT_ZEICHEN {
            return Err(PlaudereiError::UngueltigeAnfrage(format!(
                "Nachricht laenger als {MAX_NACHRICHT_ZEICHEN} Zeichen"
            )));
        }

        // Session und Partner unter der Sperre aufloesen, dann freigeben
        let (session_id, partner, sperre) = {
            let mut inner = self.inner.lock();
            let Some(session) = inner.index.session_von(&sender)? else {
                return Err(PlaudereiError::Zustandskonflikt(
                    "keine aktive Session".to_string(),
                ));
            };
            let session_id = session.id;
            let partner = session.partner_von(&sender).ok_or_else(|| {
                PlaudereiError::InvarianteVerletzt("Sender ohne Partner".to_string())
            })?;
            let sperre = self
                .session_sperren
                .get(&session_id)
                .map(|s| Arc::clone(&s))
                .ok_or_else(|| {
                    PlaudereiError::InvarianteVerletzt("Session ohne Sperre".to_string())
                })?;
            (session_id, partner, sperre)
        };

        // Nachrichten derselben Session laufen strikt nacheinander
        let _wache = sperre.lock().await;

        let origin = self.presence.origin_von(&sender);
        let urteil = self.gate.einstufen(content, origin.as_deref()).await;

        // Re-Validierung: die Session kann waehrend des await beendet
        // worden sein
        {
            let mut inner = self.inner.lock();
            match inner.index.session_von(&sender)? {
                Some(session) if session.id == session_id => {}
                _ => {
                    tracing::debug!(session_id = %session_id, "Nachricht verfallen");
                    return Ok(RelayErgebnis::Verfallen);
                }
            }

            if urteil.severity == Severity::High {
                let Some(session) = inner.index.beenden(&session_id) else {
                    return Ok(RelayErgebnis::Verfallen);
                };
                drop(inner);

                let grund = urteil.grund();
                self.nachricht_record_anhaengen(session_id, sender, content, Some(grund.clone()));
                self.session_abschliessen(&session, sender, EndReason::Kicked, true);
                return Ok(RelayErgebnis::SessionBeendet { grund });
            }
        }

        match urteil.severity {
            Severity::None => {
                self.presence.senden_an(
                    &partner,
                    ServerEvent::ReceiveMessage {
                        content: content.to_string(),
                        sender_id: sender,
                        timestamp: Utc::now(),
                    },
                );
                self.nachricht_record_anhaengen(session_id, sender, content, None);
                Ok(RelayErgebnis::Zugestellt)
            }
            severity => {
                let grund = urteil.grund();
                self.nachricht_record_anhaengen(session_id, sender, content, Some(grund.clone()));
                Ok(RelayErgebnis::Beanstandet { severity, grund })
            }
        }
    }

    fn nachricht_record_anhaengen(
        &self,
        session_id: SessionId,
        sender: UserId,
        content: &str,
        flag_reason: Option<String>,
    ) {
        let repo = Arc::clone(&self.repo);
        let content = content.to_string();
        tokio::task::spawn_local(async move {
            let data = NeueNachricht {
                session_id,
                sender_id: sender,
                content: &content,
                flagged: flag_reason.is_some(),
                flag_reason: flag_reason.as_deref(),
            };
            if let Err(e) = repo.append_message(data).await {
                tracing::warn!(session_id = %session_id, fehler = %e, "Nachrichten-Record nicht angehaengt");
            }
        });
    }

    // -----------------------------------------------------------------------
    // Einblick
    // -----------------------------------------------------------------------

    pub fn wartende_anzahl(&self) -> usize {
        self.inner.lock().queue.laenge()
    }

    pub fn aktive_sessions(&self) -> usize {
        self.inner.lock().index.aktive_anzahl()
    }

    /// Aktive Session-ID einer Identitaet
    pub fn session_id_von(&self, user_id: &UserId) -> Option<SessionId> {
        let mut inner = self.inner.lock();
        match inner.index.session_von(user_id) {
            Ok(session) => session.map(|s| s.id),
            Err(_) => None,
        }
    }
}
