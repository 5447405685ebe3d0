// VLC HTTP interface support
pub mod status;
pub mod vlcplayer;

pub use vlcplayer::VlcProtocol;
