//! Cache of the last published player values and the diff that turns
//! decoded status snapshots into downstream events.

use std::time::Duration;
use log::{debug, trace};

use crate::data::MediaEvent;
use crate::helpers::media_path::non_blank;

/// Raw player state token as reported by the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateToken {
    /// Numeric state code (MPC-HC)
    Code(i64),
    /// Textual state (VLC)
    Name(String),
}

/// A state token together with its codec-defined meaning
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub token: StateToken,
    pub playing: bool,
}

/// Playback position as reported on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Absolute time from the start of the media
    Absolute(Duration),
    /// Fraction (0..1) of the duration
    Fraction(f64),
}

/// Normalized values decoded from one poll of the player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub playback: Option<PlaybackStatus>,
    pub playlist_id: Option<i64>,
    /// The player reports that no media is selected
    pub no_media: bool,
    /// `None` when the path was not re-resolved on this tick
    pub path: Option<Option<String>>,
    pub duration: Option<Duration>,
    pub position: Option<Position>,
    pub speed: Option<f64>,
}

/// Last published values, owned by the reader of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    pub path: Option<String>,
    pub playing: Option<bool>,
    pub state: Option<StateToken>,
    pub playlist_id: Option<i64>,
    pub duration: Option<Duration>,
    pub position: Option<Duration>,
    pub speed: Option<f64>,
    pub no_media: bool,
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a snapshot and return the events for every value that changed,
    /// in the order playing, path, duration, position, speed
    pub fn apply(&mut self, snapshot: StatusSnapshot) -> Vec<MediaEvent> {
        if snapshot.no_media {
            return self.enter_no_media(snapshot);
        }
        self.no_media = false;

        let mut events = Vec::new();

        if let Some(playback) = snapshot.playback {
            if self.playing != Some(playback.playing) {
                events.push(MediaEvent::PlayingChanged(playback.playing));
                self.playing = Some(playback.playing);
            }
            self.state = Some(playback.token);
        }

        if let Some(id) = snapshot.playlist_id {
            self.playlist_id = Some(id);
        }

        if let Some(path) = snapshot.path {
            let path = path.as_deref().and_then(non_blank);
            if path != self.path {
                events.push(MediaEvent::PathChanged(path.clone()));
                self.path = path;
            }
        }

        if let Some(duration) = snapshot.duration {
            if self.duration != Some(duration) {
                events.push(MediaEvent::DurationChanged(duration));
                self.duration = Some(duration);
            }
        }

        let position = match snapshot.position {
            Some(Position::Absolute(position)) => Some(position),
            // Fractions need a known duration
            Some(Position::Fraction(fraction)) => self
                .duration
                .and_then(|duration| duration_from_secs(duration.as_secs_f64() * fraction)),
            None => None,
        };
        if let Some(position) = position {
            if self.position != Some(position) {
                events.push(MediaEvent::PositionChanged(position));
                self.position = Some(position);
            }
        }

        if let Some(speed) = snapshot.speed.filter(|s| s.is_finite() && *s > 0.0) {
            if self.speed != Some(speed) {
                events.push(MediaEvent::SpeedChanged(speed));
                self.speed = Some(speed);
            }
        }

        if !events.is_empty() {
            trace!("Player state changed: {:?}", events);
        }
        events
    }

    /// Reset on the first tick that reports no media; later ticks with the
    /// same report are skipped entirely
    fn enter_no_media(&mut self, snapshot: StatusSnapshot) -> Vec<MediaEvent> {
        if self.no_media {
            return Vec::new();
        }

        debug!("Player reports no media, resetting state");
        *self = PlayerState {
            playing: Some(false),
            state: snapshot.playback.map(|p| p.token),
            playlist_id: snapshot.playlist_id,
            no_media: true,
            ..PlayerState::default()
        };
        MediaEvent::reset_pair().to_vec()
    }
}

/// Seconds as reported by a player; negative or non-finite values are unknown
pub fn duration_from_secs(seconds: f64) -> Option<Duration> {
    if seconds.is_finite() && seconds >= 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

/// Milliseconds as reported by a player; negative values are unknown
pub fn duration_from_millis(millis: i64) -> Option<Duration> {
    u64::try_from(millis).ok().map(Duration::from_millis)
}
