/// Shared value types (endpoints, commands, events)
pub mod data;

/// Player connectors
pub mod players;

/// Transport, settings, credentials and actions
pub mod helpers;

/// Connector configuration
pub mod config;

/// Logger setup
pub mod logging;

pub use data::{ConnectionStatus, Endpoint, MediaCommand, MediaEvent};
pub use players::{ConnectorError, MediaConnector, MediaEventListener, MpcProtocol, PlayerProtocol, VlcProtocol};
