//! Shared contracts for the support chat
//!
//! Data models, channel and event names, and the frame codec used on
//! channel subscription streams. Both the relay server and the admin
//! chat client depend on this crate so the wire shapes live in one place.

pub mod channels;
pub mod error;
pub mod events;
pub mod frame;
pub mod models;

pub use error::CodecError;
pub use events::{AdminEvent, RelayPayload};
pub use frame::{Frame, FrameDecoder};
pub use models::{Direction, Message, User};
