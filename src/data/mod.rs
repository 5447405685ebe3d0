// Data structures shared by all player connectors

pub mod connection_status;
pub mod endpoint;
pub mod media_command;
pub mod media_event;

pub use connection_status::*;
pub use endpoint::*;
pub use media_command::*;
pub use media_event::*;
