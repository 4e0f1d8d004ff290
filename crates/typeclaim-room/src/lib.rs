//! Rooms for typeclaim.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! players, territories and countdown clock. All of a room's state
//! changes go through that one task.
//!
//! # Key types
//!
//! - [`Room`]: the synchronous state machine behind each actor
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomRegistry`]: allocates codes, tracks rooms and player bindings
//! - [`MatchmakingQueue`]: groups waiting players into new rooms
//! - [`RoomConfig`] / [`MatchmakingConfig`]: limits and durations

mod actor;
pub mod catalog;
pub mod claim;
mod config;
mod error;
mod matchmaking;
mod registry;
mod state;

pub use actor::{LeaveOutcome, PlayerSender, RoomHandle, RoomInfo};
pub use claim::ClaimOutcome;
pub use config::{MAX_NAME_LEN, MatchmakingConfig, PALETTE, RoomConfig, palette_color};
pub use error::RoomError;
pub use matchmaking::{MatchmakingQueue, QueuedPlayer};
pub use registry::{RoomRegistry, random_room_code};
pub use state::{ClockDirective, Effects, Room, RoomEvent, validate_player_name};
