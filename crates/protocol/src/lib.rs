//! plauderei-protocol – Event-Kontrakt und Wire-Format
//!
//! Definiert die bidirektionalen Echtzeit-Events zwischen Client und Kern
//! sowie das frame-basierte Wire-Format (u32-Laenge big-endian + JSON).
//!
//! ## Event-Kontrakt
//!
//! ```text
//! Client -> Kern: hello, find_match, send_message, skip_partner,
//!                 disconnect_chat, ping, pong
//! Kern -> Client: hello_ack, waiting_for_match, user_matched,
//!                 receive_message, moderation_flag, kicked,
//!                 partner_disconnected, error, ping, pong
//! ```

pub mod events;
pub mod wire;

// Bequeme Re-Exporte
pub use events::{ClientEvent, ServerEvent};
pub use wire::{ClientCodec, FrameCodec, ServerCodec, DEFAULT_MAX_FRAME_SIZE};
