use std::time::Duration;
use serde::{Serialize, Deserialize};

/// Downstream events emitted by a connector when an observed value changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MediaEvent {
    /// The loaded file changed; `None` means nothing is loaded
    PathChanged(Option<String>),

    /// Playback started or stopped
    PlayingChanged(bool),

    /// Duration of the loaded media
    DurationChanged(Duration),

    /// Current playback position
    PositionChanged(Duration),

    /// Playback speed ratio, always positive
    SpeedChanged(f64),
}

impl MediaEvent {
    /// The pair sent whenever downstream must forget the current media:
    /// no path and not playing
    pub fn reset_pair() -> [MediaEvent; 2] {
        [MediaEvent::PathChanged(None), MediaEvent::PlayingChanged(false)]
    }
}
