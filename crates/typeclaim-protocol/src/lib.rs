//! Wire protocol for typeclaim.
//!
//! This crate defines what travels between a browser and the server:
//!
//! - **Identity** ([`PlayerId`], [`RoomCode`]) and addressing ([`Recipient`]).
//! - **Snapshots** ([`Player`], [`Territory`], [`GameSnapshot`]): the
//!   shapes clients render.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): one named event per
//!   frame, `{"event": "...", "data": {...}}`.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): events to bytes and back.
//!
//! The protocol layer knows nothing about sockets or rooms:
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Room (state machine)
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, GameEndedReason, GameOverReason, ServerEvent};
pub use types::{
    GameSnapshot, GameStatus, Player, PlayerId, Recipient, RoomCode,
    Territory,
};
