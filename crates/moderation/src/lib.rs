//! plauderei-moderation – Inhalts-Moderation im Nachrichtenpfad
//!
//! Dieses Crate implementiert die Moderations-Pipeline des Kerns:
//!
//! ```text
//! Nachricht
//!     |
//!     v
//! ModerationGate  – ruft den externen Klassifizierer, mappt
//!     |             Kategorie-Scores auf einen Schweregrad
//!     v
//! ViolationTracker – zaehlt Verstoesse pro Herkunfts-Key und
//!                    eskaliert wiederholte Verstoesse zu Blocks
//! ```
//!
//! Der Klassifizierer ist ein externer Kollaborateur hinter dem
//! `Klassifizierer`-Trait. Faellt er aus, arbeitet das Gate fail-open:
//! Echtzeit-Zustellung hat Vorrang vor Moderations-Verfuegbarkeit.

pub mod classifier;
pub mod gate;
pub mod tracker;

// Bequeme Re-Exporte
pub use classifier::{
    Kategorie, KlassifikationsErgebnis, Klassifizierer, KlassifiziererFehler, NullKlassifizierer,
};
pub use gate::{ModerationGate, Verdict};
pub use tracker::{BlockDecision, ViolationRecord, ViolationTracker};
