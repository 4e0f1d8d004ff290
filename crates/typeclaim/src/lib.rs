//! # typeclaim
//!
//! A real-time multiplayer server for a territory-claim typing game.
//! Players gather in rooms, race to type the phrase attached to each map
//! region, and the server decides who owns what, keeps score, and runs
//! the countdown.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typeclaim::prelude::*;
//!
//! # async fn start() -> Result<(), TypeclaimError> {
//! let server = TypeclaimServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod lobby;
mod server;

pub use config::ServerConfig;
pub use error::TypeclaimError;
pub use server::{TypeclaimServer, TypeclaimServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{ServerConfig, TypeclaimError, TypeclaimServer, TypeclaimServerBuilder};
    pub use typeclaim_protocol::{
        ClientEvent, GameEndedReason, GameOverReason, GameSnapshot, GameStatus, Player, PlayerId,
        RoomCode, ServerEvent, Territory,
    };
    pub use typeclaim_room::{MatchmakingConfig, RoomConfig, RoomError};
}
