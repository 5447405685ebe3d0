use async_trait::async_trait;
use log::{debug, trace};

use crate::data::{Endpoint, MediaCommand};
use crate::helpers::http_client::HttpClient;
use crate::players::error::ConnectorError;
use crate::players::mpc::variables::{decode_status, format_position};
use crate::players::player_state::{PlayerState, StatusSnapshot};
use crate::players::protocol::PlayerProtocol;

/// Default web interface port of MPC-HC
pub const DEFAULT_PORT: u16 = 13579;

const VARIABLES_PATH: &str = "/variables.html";
const COMMAND_PATH: &str = "/command.html";
const BROWSER_PATH: &str = "/browser.html";

/// wm_command codes understood by the MPC-HC web interface
const CMD_SEEK: i32 = -1;
const CMD_CLOSE: i32 = 804;
const CMD_PLAY: i32 = 887;
const CMD_PAUSE: i32 = 888;

/// MPC-HC (and MPC-BE) controlled through its web interface
#[derive(Debug, Default)]
pub struct MpcProtocol;

impl MpcProtocol {
    pub fn new() -> Self {
        Self
    }

    fn command(code: i32) -> String {
        format!("{}?wm_command={}", COMMAND_PATH, code)
    }
}

#[async_trait]
impl PlayerProtocol for MpcProtocol {
    fn name(&self) -> &str {
        "MPC-HC"
    }

    fn default_endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", DEFAULT_PORT)
    }

    async fn probe(&self, client: &dyn HttpClient) -> Result<(), ConnectorError> {
        client.get("/").await?;
        Ok(())
    }

    async fn poll_once(&self, client: &dyn HttpClient, _state: &PlayerState) -> Result<StatusSnapshot, ConnectorError> {
        let body = client.get(VARIABLES_PATH).await?;
        trace!("MPC-HC status: {} bytes", body.len());
        Ok(decode_status(&body))
    }

    fn render_command(&self, command: &MediaCommand, _state: &PlayerState) -> Option<String> {
        match command {
            MediaCommand::ChangePath(Some(path)) => {
                Some(format!("{}?path={}", BROWSER_PATH, urlencoding::encode(path)))
            }
            MediaCommand::ChangePath(None) => Some(Self::command(CMD_CLOSE)),
            MediaCommand::PlayPause(true) => Some(Self::command(CMD_PLAY)),
            MediaCommand::PlayPause(false) => Some(Self::command(CMD_PAUSE)),
            MediaCommand::SeekTo(position) => Some(format!(
                "{}&position={}",
                Self::command(CMD_SEEK),
                format_position(*position)
            )),
            MediaCommand::ChangeSpeed(speed) => {
                debug!("MPC-HC cannot set an absolute speed, ignoring {}", speed);
                None
            }
        }
    }
}
