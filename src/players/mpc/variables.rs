//! Decoder for the MPC-HC `variables.html` page
//!
//! The page is a flat list of `<p id="NAME">VALUE</p>` fragments.

use std::collections::HashMap;
use std::time::Duration;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

use crate::helpers::media_path::resolve_media_uri;
use crate::players::player_state::{
    duration_from_millis, PlaybackStatus, Position, StateToken, StatusSnapshot,
};

/// State code MPC-HC reports while playing
pub const STATE_PLAYING: i64 = 2;

lazy_static! {
    static ref VARIABLE_REGEX: Regex = Regex::new(r#"<p id="(?P<name>[^"]+)">(?P<value>.*?)</p>"#)
        .expect("variable pattern is valid");
}

/// Extract all variables from the page body
pub fn parse_variables(body: &str) -> HashMap<String, String> {
    VARIABLE_REGEX
        .captures_iter(body)
        .map(|captures| {
            let value = &captures["value"];
            let value = quick_xml::escape::unescape(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            (captures["name"].to_string(), value)
        })
        .collect()
}

/// Decode the variables page into a normalized snapshot
pub fn decode_status(body: &str) -> StatusSnapshot {
    let variables = parse_variables(body);
    trace!("MPC-HC variables: {:?}", variables);

    let state = parse_number::<i64>(&variables, "state");
    let playback = state.map(|code| PlaybackStatus {
        token: StateToken::Code(code),
        playing: code == STATE_PLAYING,
    });

    StatusSnapshot {
        playback,
        playlist_id: None,
        no_media: state.map(|code| code < 0).unwrap_or(false),
        path: variables.get("filepath").map(|path| resolve_media_uri(path)),
        duration: parse_number::<i64>(&variables, "duration").and_then(duration_from_millis),
        position: parse_number::<i64>(&variables, "position")
            .and_then(duration_from_millis)
            .map(Position::Absolute),
        speed: parse_number::<f64>(&variables, "playbackrate"),
    }
}

fn parse_number<T: std::str::FromStr>(variables: &HashMap<String, String>, key: &str) -> Option<T> {
    variables.get(key).and_then(|value| value.trim().parse::<T>().ok())
}

/// Format a seek target the way the command page expects it (hh:mm:ss)
pub fn format_position(position: Duration) -> String {
    let total = position.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
