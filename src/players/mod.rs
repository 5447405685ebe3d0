/// Connectors for remote media players
pub mod error;
pub mod player_state;
pub mod protocol;
pub mod connector;

/// MPC-HC web interface
pub mod mpc;

/// VLC HTTP interface
pub mod vlc;

pub use connector::{MediaConnector, MediaEventListener};
pub use error::ConnectorError;
pub use mpc::MpcProtocol;
pub use player_state::{PlayerState, StatusSnapshot};
pub use protocol::PlayerProtocol;
pub use vlc::VlcProtocol;
