/// Outbound commands that the host sends to a remote media player
use std::time::Duration;
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MediaCommand {
    /// Open the given file, or close the current one when `None`
    ChangePath(Option<String>),

    /// Desired playing state (true = play, false = pause)
    PlayPause(bool),

    /// Seek to an absolute position
    SeekTo(Duration),

    /// Change the playback speed (1.0 = normal)
    ChangeSpeed(f64),
}

impl MediaCommand {
    /// Short name used in log output
    pub fn name(&self) -> &'static str {
        match self {
            MediaCommand::ChangePath(_) => "change_path",
            MediaCommand::PlayPause(_) => "play_pause",
            MediaCommand::SeekTo(_) => "seek_to",
            MediaCommand::ChangeSpeed(_) => "change_speed",
        }
    }
}
