//! plauderei-signaling – TCP-Verbindungsschicht
//!
//! Dieses Crate verwaltet die TCP-Verbindungen der Clients: Framing,
//! Begruessung, Keepalive und das Routing der Client-Events an die
//! Vermittlungs-Engine.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  State Machine: Verbunden -> Begruesst
//!     |
//!     v
//! EventDispatcher
//!     |
//!     +-- match_handler  (find_match, skip_partner, disconnect_chat)
//!     +-- chat_handler   (send_message)
//!
//! PresenceRegistry – Server-Events an Clients zustellen
//! MatchingService  – Warteschlange, Sessions, Moderations-Gate
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::EventDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
