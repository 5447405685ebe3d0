use std::sync::RwLock;
use async_trait::async_trait;
use log::{debug, trace, warn};
use serde_json::Value;

use crate::data::{Endpoint, MediaCommand};
use crate::helpers::http_client::{BasicAuth, HttpClient};
use crate::helpers::media_path::resolve_media_uri;
use crate::helpers::security_store::SecurityStore;
use crate::helpers::settings::{SettingsError, SettingsStore};
use crate::players::error::ConnectorError;
use crate::players::player_state::{PlayerState, StatusSnapshot};
use crate::players::protocol::PlayerProtocol;
use crate::players::vlc::status::{decode_status, find_leaf_uri};

/// Default port of the VLC web interface
pub const DEFAULT_PORT: u16 = 8080;

const STATUS_PATH: &str = "/requests/status.xml";
const PLAYLIST_PATH: &str = "/requests/playlist.xml";

/// VLC controlled through its HTTP interface (`--extraintf http`)
#[derive(Debug, Default)]
pub struct VlcProtocol {
    password: RwLock<Option<String>>,
}

impl VlcProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(password: &str) -> Self {
        let protocol = Self::new();
        protocol.set_password(Some(password));
        protocol
    }

    /// Set the HTTP interface password; empty strings clear it
    pub fn set_password(&self, password: Option<&str>) {
        let password = password.filter(|p| !p.is_empty()).map(str::to_string);
        match self.password.write() {
            Ok(mut current) => *current = password,
            Err(_) => warn!("Failed to acquire write lock when setting VLC password"),
        }
    }

    pub fn password(&self) -> Option<String> {
        self.password.read().ok().and_then(|p| p.clone())
    }

    fn password_key(&self) -> String {
        format!("{}.Password", self.name())
    }

    fn command(arguments: &str) -> String {
        format!("{}?command={}", STATUS_PATH, arguments)
    }
}

#[async_trait]
impl PlayerProtocol for VlcProtocol {
    fn name(&self) -> &str {
        "VLC"
    }

    fn default_endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", DEFAULT_PORT)
    }

    fn basic_auth(&self) -> Result<Option<BasicAuth>, ConnectorError> {
        match self.password() {
            Some(password) => Ok(Some(BasicAuth {
                username: String::new(),
                password,
            })),
            None => Err(ConnectorError::Configuration("VLC password cannot be empty".to_string())),
        }
    }

    async fn probe(&self, client: &dyn HttpClient) -> Result<(), ConnectorError> {
        client.get(STATUS_PATH).await?;
        Ok(())
    }

    async fn poll_once(&self, client: &dyn HttpClient, state: &PlayerState) -> Result<StatusSnapshot, ConnectorError> {
        let body = client.get(STATUS_PATH).await?;
        let mut snapshot = decode_status(&body)?;

        // The playlist is only consulted when the current item changed
        if let Some(id) = snapshot.playlist_id {
            if id >= 0 && state.playlist_id != Some(id) {
                debug!("VLC playlist item changed to {}, fetching playlist", id);
                let playlist = client.get(PLAYLIST_PATH).await?;
                let uri = find_leaf_uri(&playlist, id)?;
                trace!("VLC playlist item {} has uri {:?}", id, uri);
                snapshot.path = Some(uri.as_deref().and_then(resolve_media_uri));
            }
        }

        Ok(snapshot)
    }

    fn render_command(&self, command: &MediaCommand, state: &PlayerState) -> Option<String> {
        match command {
            MediaCommand::ChangePath(Some(path)) => {
                Some(Self::command(&format!("in_play&input={}", urlencoding::encode(path))))
            }
            MediaCommand::ChangePath(None) => Some(Self::command("pl_stop")),
            MediaCommand::PlayPause(desired) => {
                // pl_pause toggles, so only send it when the state has to flip
                if state.playing.unwrap_or(false) == *desired {
                    trace!("VLC already {}, not toggling", if *desired { "playing" } else { "paused" });
                    None
                } else {
                    Some(Self::command("pl_pause"))
                }
            }
            MediaCommand::SeekTo(position) => {
                Some(Self::command(&format!("seek&val={}", position.as_secs())))
            }
            MediaCommand::ChangeSpeed(speed) if speed.is_finite() && *speed > 0.0 => {
                Some(Self::command(&format!("rate&val={:.4}", speed)))
            }
            MediaCommand::ChangeSpeed(speed) => {
                debug!("Ignoring invalid VLC speed {}", speed);
                None
            }
        }
    }

    fn save_settings(&self, settings: &mut dyn SettingsStore, security: &SecurityStore) -> Result<(), SettingsError> {
        let value = match self.password() {
            Some(password) => {
                let blob = security
                    .encrypt(&password)
                    .map_err(|e| SettingsError::Credential(e.to_string()))?;
                Value::String(blob)
            }
            None => Value::Null,
        };
        settings.set_value(&self.password_key(), value)
    }

    fn load_settings(&self, settings: &dyn SettingsStore, security: &SecurityStore) {
        match settings.get_string(&self.password_key()) {
            Some(blob) => match security.decrypt(&blob) {
                Ok(password) => self.set_password(Some(&password)),
                Err(e) => warn!("Failed to decrypt stored VLC password: {}", e),
            },
            None => debug!("No VLC password stored"),
        }
    }
}
