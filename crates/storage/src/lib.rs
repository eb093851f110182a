//! plauderei-storage – Speicher-Kollaborateur-Schnittstelle
//!
//! Der Kern behandelt dauerhafte Speicherung als Best-Effort-Senke:
//! Session- und Nachrichten-Records werden fire-and-forget uebergeben,
//! Fehlschlaege werden geloggt und blockieren nie den Echtzeit-Pfad.
//!
//! Dieses Crate definiert die Repository-Traits plus eine In-Memory-
//! Referenzimplementierung (`MemoryDb`) fuer den Standardbetrieb und
//! fuer Tests. Eine dauerhafte Implementierung lebt ausserhalb des Kerns.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

// Bequeme Re-Exporte
pub use error::{DbError, DbResult};
pub use memory::MemoryDb;
pub use models::{
    BlockRecord, MessageRecord, NeueNachricht, NeuerBlock, NeueSession, SessionRecord,
};
pub use repository::{BlockRepository, MessageRepository, SessionRepository};
