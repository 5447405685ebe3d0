use async_trait::async_trait;

use crate::data::{Endpoint, MediaCommand};
use crate::helpers::http_client::{BasicAuth, HttpClient};
use crate::helpers::security_store::SecurityStore;
use crate::helpers::settings::{SettingsError, SettingsStore};
use crate::players::error::ConnectorError;
use crate::players::player_state::{PlayerState, StatusSnapshot};

/// Wire protocol of one kind of remote player
///
/// The session, reader and writer logic of `MediaConnector` is written once
/// against this trait; each supported player is a value implementing it.
#[async_trait]
pub trait PlayerProtocol: Send + Sync + 'static {
    /// Display name, also used as prefix for settings keys and actions
    fn name(&self) -> &str;

    /// Endpoint used until the user configures one
    fn default_endpoint(&self) -> Endpoint;

    /// Credentials for the session. Returns a configuration error when the
    /// player needs a credential that has not been set.
    fn basic_auth(&self) -> Result<Option<BasicAuth>, ConnectorError> {
        Ok(None)
    }

    /// Single request that must succeed before the session counts as connected
    async fn probe(&self, client: &dyn HttpClient) -> Result<(), ConnectorError>;

    /// Fetch and decode the player status. `state` is the reader's cache, used
    /// to decide whether secondary resources must be fetched.
    async fn poll_once(&self, client: &dyn HttpClient, state: &PlayerState) -> Result<StatusSnapshot, ConnectorError>;

    /// Render a command as a path and query relative to the endpoint.
    /// `None` means the command is unsupported or would not change anything.
    fn render_command(&self, command: &MediaCommand, state: &PlayerState) -> Option<String>;

    /// Persist protocol specific settings (credentials)
    fn save_settings(&self, _settings: &mut dyn SettingsStore, _security: &SecurityStore) -> Result<(), SettingsError> {
        Ok(())
    }

    /// Restore protocol specific settings. Problems are logged, never fatal.
    fn load_settings(&self, _settings: &dyn SettingsStore, _security: &SecurityStore) {}
}
