//! Unified error type for the typeclaim server.

use typeclaim_protocol::ProtocolError;
use typeclaim_room::RoomError;
use typeclaim_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TypeclaimError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, full, unavailable).
    #[error(transparent)]
    Room(#[from] RoomError),
}
