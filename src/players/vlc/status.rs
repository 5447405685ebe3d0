//! Decoders for the VLC `status.xml` and `playlist.xml` documents

use log::trace;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::players::error::ConnectorError;
use crate::players::player_state::{duration_from_secs, PlaybackStatus, Position, StateToken, StatusSnapshot};

/// The subset of `status.xml` the connector reads
#[derive(Debug, Default, Deserialize)]
struct StatusDocument {
    #[serde(default)]
    currentplid: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    length: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    rate: Option<String>,
}

fn parse_number<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    value.as_deref().and_then(|v| v.trim().parse::<T>().ok())
}

/// Decode `status.xml` into a snapshot. The path is never set here; it
/// comes from the playlist document.
pub fn decode_status(body: &str) -> Result<StatusSnapshot, ConnectorError> {
    let document: StatusDocument = quick_xml::de::from_str(body)
        .map_err(|e| ConnectorError::Protocol(format!("malformed status.xml: {}", e)))?;
    trace!("VLC status: {:?}", document);

    let playlist_id = parse_number::<i64>(&document.currentplid);
    let playback = document
        .state
        .as_deref()
        .map(str::trim)
        .filter(|state| !state.is_empty())
        .map(|state| PlaybackStatus {
            token: StateToken::Name(state.to_string()),
            playing: state.eq_ignore_ascii_case("playing"),
        });

    Ok(StatusSnapshot {
        playback,
        playlist_id,
        no_media: playlist_id.map(|id| id < 0).unwrap_or(false),
        path: None,
        duration: parse_number::<f64>(&document.length).and_then(duration_from_secs),
        position: parse_number::<f64>(&document.position)
            .filter(|fraction| fraction.is_finite() && *fraction >= 0.0)
            .map(Position::Fraction),
        speed: parse_number::<f64>(&document.rate),
    })
}

/// Find the `uri` attribute of the playlist leaf with the given id
pub fn find_leaf_uri(body: &str, id: i64) -> Result<Option<String>, ConnectorError> {
    let wanted = id.to_string();
    let mut reader = Reader::from_str(body);

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) if element.name().as_ref() == b"leaf" => {
                let mut leaf_id = None;
                let mut uri = None;
                for attribute in element.attributes().flatten() {
                    let value = attribute
                        .unescape_value()
                        .map_err(|e| ConnectorError::Protocol(format!("malformed playlist.xml: {}", e)))?;
                    match attribute.key.as_ref() {
                        b"id" => leaf_id = Some(value.into_owned()),
                        b"uri" => uri = Some(value.into_owned()),
                        _ => {}
                    }
                }
                if leaf_id.as_deref() == Some(wanted.as_str()) {
                    return Ok(uri);
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(ConnectorError::Protocol(format!(
                    "malformed playlist.xml at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }
}
