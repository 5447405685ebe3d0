use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use log::{debug, error, info, trace, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use crate::config::ConnectorConfig;
use crate::data::{ConnectionStatus, Endpoint, MediaCommand, MediaEvent};
use crate::helpers::actions::{ActionError, ActionRegistry};
use crate::helpers::http_client::{
    cancellable, ClientOptions, HttpClient, HttpClientFactory, ReqwestClientFactory,
};
use crate::helpers::security_store::SecurityStore;
use crate::helpers::settings::{SettingsError, SettingsStore};
use crate::players::error::ConnectorError;
use crate::players::player_state::PlayerState;
use crate::players::protocol::PlayerProtocol;

/// Trait for objects that want to follow a remote player
pub trait MediaEventListener: Send + Sync {
    /// Called for every value that changed on the remote player
    fn on_event(&self, event: MediaEvent);

    /// Called once when a session fails for any reason other than cancellation
    fn on_error(&self, _title: &str, _error: &ConnectorError) {}
}

/// Connector for one remote media player
///
/// A session polls the player for its status and sends queued commands to it
/// at the same time. Both directions share one cancellation scope: whichever
/// finishes first stops the other. The player specific parts (URLs, status
/// decoding, command rendering) come from the `PlayerProtocol`.
pub struct MediaConnector<P: PlayerProtocol> {
    protocol: P,
    config: ConnectorConfig,
    client_factory: Arc<dyn HttpClientFactory>,
    endpoint: Arc<RwLock<Option<Endpoint>>>,
    status: RwLock<ConnectionStatus>,
    sender: UnboundedSender<MediaCommand>,
    receiver: AsyncMutex<UnboundedReceiver<MediaCommand>>,
    listeners: RwLock<Vec<Weak<dyn MediaEventListener>>>,
    disposing: AtomicBool,
}

impl<P: PlayerProtocol> MediaConnector<P> {
    pub fn new(protocol: P, config: ConnectorConfig) -> Self {
        Self::with_client_factory(protocol, config, Arc::new(ReqwestClientFactory))
    }

    pub fn with_client_factory(protocol: P, config: ConnectorConfig, client_factory: Arc<dyn HttpClientFactory>) -> Self {
        debug!("Creating connector for {}", protocol.name());
        let (sender, receiver) = mpsc::unbounded_channel();
        let endpoint = protocol.default_endpoint();
        Self {
            protocol,
            config,
            client_factory,
            endpoint: Arc::new(RwLock::new(Some(endpoint))),
            status: RwLock::new(ConnectionStatus::Disconnected),
            sender,
            receiver: AsyncMutex::new(receiver),
            listeners: RwLock::new(Vec::new()),
            disposing: AtomicBool::new(false),
        }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn name(&self) -> &str {
        self.protocol.name()
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.status.read() {
            Ok(status) => *status,
            Err(_) => {
                warn!("Failed to acquire read lock for connection status");
                ConnectionStatus::Disconnected
            }
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        match self.status.write() {
            Ok(mut current) => {
                if *current != status {
                    debug!("{} connection status: {} -> {}", self.name(), *current, status);
                    *current = status;
                }
            }
            Err(_) => warn!("Failed to acquire write lock when setting connection status"),
        }
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint.read().ok().and_then(|endpoint| endpoint.clone())
    }

    /// Change the endpoint; a running session keeps its connection, the next
    /// session uses the new value
    pub fn set_endpoint(&self, endpoint: Option<Endpoint>) {
        match self.endpoint.write() {
            Ok(mut current) => {
                info!("{} endpoint set to {:?}", self.name(), endpoint.as_ref().map(|e| e.to_string()));
                *current = endpoint;
            }
            Err(_) => warn!("Failed to acquire write lock when setting endpoint"),
        }
    }

    /// Queue a command for the player. Commands queued while no session is
    /// connected are dropped when the next session starts.
    pub fn enqueue(&self, command: MediaCommand) {
        trace!("Queueing {} for {}", command.name(), self.name());
        // The receiver lives as long as the connector
        let _ = self.sender.send(command);
    }

    /// Mark the connector as permanently going away. Sessions ending after
    /// this no longer reset downstream state.
    pub fn dispose(&self) {
        debug!("Disposing connector for {}", self.name());
        self.disposing.store(true, Ordering::SeqCst);
    }

    pub fn is_disposing(&self) -> bool {
        self.disposing.load(Ordering::SeqCst)
    }

    /// Register a listener for player events
    pub fn register_listener(&self, listener: Weak<dyn MediaEventListener>) -> bool {
        match self.listeners.write() {
            Ok(mut listeners) => {
                listeners.push(listener);
                debug!("Registered listener on {}, now {} listeners", self.name(), listeners.len());
                true
            }
            Err(_) => {
                warn!("Failed to acquire write lock when registering listener");
                false
            }
        }
    }

    /// Unregister a previously registered listener
    pub fn unregister_listener(&self, listener: &Arc<dyn MediaEventListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        match self.listeners.write() {
            Ok(mut listeners) => {
                let before = listeners.len();
                listeners.retain(|weak| match weak.upgrade() {
                    Some(existing) => Arc::as_ptr(&existing) as *const () != target,
                    None => false,
                });
                before != listeners.len()
            }
            Err(_) => {
                warn!("Failed to acquire write lock when unregistering listener");
                false
            }
        }
    }

    fn prune_dead_listeners(&self) {
        if let Ok(mut listeners) = self.listeners.write() {
            let before = listeners.len();
            listeners.retain(|weak| weak.strong_count() > 0);
            if before != listeners.len() {
                debug!("Pruned {} dead listeners", before - listeners.len());
            }
        }
    }

    fn live_listeners(&self) -> Vec<Arc<dyn MediaEventListener>> {
        self.prune_dead_listeners();
        match self.listeners.read() {
            Ok(listeners) => listeners.iter().filter_map(|weak| weak.upgrade()).collect(),
            Err(_) => {
                warn!("Failed to acquire read lock for listeners");
                Vec::new()
            }
        }
    }

    fn notify_events(&self, events: &[MediaEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners = self.live_listeners();
        for event in events {
            debug!("{}: {:?}", self.name(), event);
            for listener in &listeners {
                listener.on_event(event.clone());
            }
        }
    }

    fn notify_error(&self, error: &ConnectorError) {
        let title = format!("Error when connecting to {}", self.name());
        for listener in self.live_listeners() {
            listener.on_error(&title, error);
        }
    }

    /// Run one session until it fails or `cancel` fires
    ///
    /// Cancellation is an ordinary shutdown and returns `Ok`. Any other
    /// failure is logged, reported to the listeners and returned. Unless the
    /// connector is disposing, downstream is told that nothing is loaded
    /// once the session is over.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ConnectorError> {
        let result = match self.run_session(&cancel).await {
            Err(e) if e.is_cancellation() => {
                info!("{} session cancelled", self.name());
                Ok(())
            }
            Err(e) => {
                error!("{} session failed: {}", self.name(), e);
                self.notify_error(&e);
                Err(e)
            }
            Ok(()) => {
                info!("{} session ended", self.name());
                Ok(())
            }
        };

        self.set_status(ConnectionStatus::Disconnecting);
        self.set_status(ConnectionStatus::Disconnected);

        if !self.is_disposing() {
            self.notify_events(&MediaEvent::reset_pair());
        }

        result
    }

    async fn run_session(&self, cancel: &CancellationToken) -> Result<(), ConnectorError> {
        self.set_status(ConnectionStatus::Connecting);

        let endpoint = self
            .endpoint()
            .ok_or_else(|| ConnectorError::Configuration(format!("No endpoint configured for {}", self.name())))?;
        let options = ClientOptions {
            connect_timeout: self.config.connect_timeout(),
            request_timeout: self.config.request_timeout(),
            basic_auth: self.protocol.basic_auth()?,
        };

        info!("Connecting to {} at {}", self.name(), endpoint);
        let client = self.client_factory.create(&endpoint, &options)?;
        cancellable(cancel, self.protocol.probe(client.as_ref())).await?;

        self.set_status(ConnectionStatus::Connected);
        info!("Connected to {} at {}", self.name(), endpoint);

        let mut receiver = self.receiver.lock().await;
        let mut stale = 0;
        while receiver.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!("Dropped {} commands queued while disconnected", stale);
        }

        let (state_tx, state_rx) = watch::channel(PlayerState::new());
        let session = cancel.child_token();

        let reader = self.read_loop(client.as_ref(), &session, state_tx);
        let writer = self.write_loop(client.as_ref(), &session, &mut receiver, state_rx);
        tokio::pin!(reader);
        tokio::pin!(writer);

        tokio::select! {
            result = &mut reader => {
                trace!("{} reader finished first", self.name());
                session.cancel();
                let other = writer.await;
                result.and(other)
            }
            result = &mut writer => {
                trace!("{} writer finished first", self.name());
                session.cancel();
                let other = reader.await;
                result.and(other)
            }
        }
    }

    async fn read_loop(
        &self,
        client: &dyn HttpClient,
        cancel: &CancellationToken,
        state_tx: watch::Sender<PlayerState>,
    ) -> Result<(), ConnectorError> {
        let mut state = PlayerState::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }

            let snapshot = match cancellable(cancel, self.protocol.poll_once(client, &state)).await {
                Ok(snapshot) => snapshot,
                Err(e) if e.is_timeout() => {
                    debug!("{} status request timed out, skipping this poll", self.name());
                    continue;
                }
                Err(e) if e.is_cancellation() => return Ok(()),
                Err(e) => return Err(e),
            };

            let events = state.apply(snapshot);
            state_tx.send_replace(state.clone());
            self.notify_events(&events);
        }
    }

    async fn write_loop(
        &self,
        client: &dyn HttpClient,
        cancel: &CancellationToken,
        receiver: &mut UnboundedReceiver<MediaCommand>,
        state_rx: watch::Receiver<PlayerState>,
    ) -> Result<(), ConnectorError> {
        loop {
            let command = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                command = receiver.recv() => match command {
                    Some(command) => command,
                    None => return Ok(()),
                },
            };

            let request = {
                let state = state_rx.borrow();
                self.protocol.render_command(&command, &state)
            };
            let Some(request) = request else {
                debug!("{} has no request for {}, dropping it", self.name(), command.name());
                continue;
            };

            debug!("Sending {} to {}: {}", command.name(), self.name(), request);
            match cancellable(cancel, client.get(&request)).await {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Check whether the player answers at all, using the short probe timeout.
    /// Status, queue and listeners are left alone.
    pub async fn can_connect(&self, cancel: CancellationToken) -> bool {
        let Some(endpoint) = self.endpoint() else {
            return false;
        };
        let basic_auth = match self.protocol.basic_auth() {
            Ok(auth) => auth,
            Err(e) => {
                debug!("{} is not connectable: {}", self.name(), e);
                return false;
            }
        };
        let options = ClientOptions {
            connect_timeout: self.config.probe_timeout(),
            request_timeout: self.config.probe_timeout(),
            basic_auth,
        };

        let client = match self.client_factory.create(&endpoint, &options) {
            Ok(client) => client,
            Err(e) => {
                debug!("Failed to create client for {}: {}", self.name(), e);
                return false;
            }
        };

        match cancellable(&cancel, self.protocol.probe(client.as_ref())).await {
            Ok(()) => true,
            Err(e) => {
                trace!("{} at {} is not reachable: {}", self.name(), endpoint, e);
                false
            }
        }
    }

    fn endpoint_key(&self) -> String {
        format!("{}.Endpoint", self.name())
    }

    /// Persist the endpoint and the protocol specific settings
    pub fn save_settings(&self, settings: &mut dyn SettingsStore, security: &SecurityStore) -> Result<(), SettingsError> {
        let endpoint = self.endpoint().map(|endpoint| endpoint.to_string());
        settings.set_string(&self.endpoint_key(), endpoint.as_deref())?;
        self.protocol.save_settings(settings, security)
    }

    /// Restore persisted settings. Values that cannot be used are logged and
    /// leave the current configuration unchanged.
    pub fn load_settings(&self, settings: &dyn SettingsStore, security: &SecurityStore) {
        match settings.get_string(&self.endpoint_key()) {
            Some(raw) => match raw.parse::<Endpoint>() {
                Ok(endpoint) => self.set_endpoint(Some(endpoint)),
                Err(e) => warn!("Ignoring stored {} endpoint '{}': {}", self.name(), raw, e),
            },
            None => debug!("No {} endpoint stored, keeping {:?}", self.name(), self.endpoint()),
        }
        self.protocol.load_settings(settings, security);
    }

    /// Register the `<name>::Endpoint::Set` action
    pub fn register_actions(&self, registry: &ActionRegistry) {
        let action = format!("{}::Endpoint::Set", self.name());
        let endpoint = Arc::clone(&self.endpoint);
        let action_name = action.clone();

        registry.register(&action, Arc::new(move |argument: &str| -> Result<(), ActionError> {
            let parsed = argument.parse::<Endpoint>().map_err(|e| {
                let err = ActionError::InvalidArgument {
                    action: action_name.clone(),
                    reason: e.to_string(),
                };
                warn!("{}", err);
                err
            })?;

            let mut current = endpoint.write().map_err(|_| ActionError::InvalidArgument {
                action: action_name.clone(),
                reason: "endpoint is not writable".to_string(),
            })?;
            info!("{} changed endpoint to {}", action_name, parsed);
            *current = Some(parsed);
            Ok(())
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    use crate::helpers::http_client::testing::{ScriptedClientFactory, ScriptedHttpClient};
    use crate::helpers::http_client::HttpClientError;
    use crate::helpers::settings::MemorySettingsStore;
    use crate::players::mpc::MpcProtocol;
    use crate::players::vlc::VlcProtocol;

    const VARIABLES: &str = "/variables.html";
    const VLC_STATUS: &str = "/requests/status.xml";
    const VLC_PLAYLIST: &str = "/requests/playlist.xml";

    const MPC_PLAYING: &str = r#"<p id="state">2</p><p id="filepath">C:\a.mp4</p><p id="duration">1000</p><p id="position">500</p><p id="playbackrate">1</p>"#;
    const MPC_NO_MEDIA: &str = r#"<p id="state">-1</p><p id="filepath"></p><p id="duration">0</p>"#;

    const VLC_PLAYING: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>
<root><currentplid>5</currentplid><state>playing</state><length>120</length><position>0.5</position><rate>1</rate></root>"#;
    const VLC_PLAYLIST_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>
<node id="0"><node id="1" name="Playlist"><leaf id="5" name="b.mp4" uri="file:///C:/b.mp4"/></node></node>"#;

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<MediaEvent>>,
        errors: Mutex<Vec<String>>,
    }

    impl RecordingListener {
        fn events(&self) -> Vec<MediaEvent> {
            self.events.lock().unwrap().clone()
        }

        fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    impl MediaEventListener for RecordingListener {
        fn on_event(&self, event: MediaEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn on_error(&self, title: &str, _error: &ConnectorError) {
            self.errors.lock().unwrap().push(title.to_string());
        }
    }

    struct Harness<P: PlayerProtocol> {
        connector: Arc<MediaConnector<P>>,
        client: Arc<ScriptedHttpClient>,
        factory: Arc<ScriptedClientFactory>,
        listener: Arc<RecordingListener>,
        // Keeps the registration alive
        registered: Arc<dyn MediaEventListener>,
    }

    fn harness<P: PlayerProtocol>(protocol: P) -> Harness<P> {
        let client = ScriptedHttpClient::new();
        let factory = ScriptedClientFactory::new(client.clone());
        let connector = Arc::new(MediaConnector::with_client_factory(
            protocol,
            ConnectorConfig::default(),
            factory.clone(),
        ));
        let listener = Arc::new(RecordingListener::default());
        let registered: Arc<dyn MediaEventListener> = listener.clone();
        connector.register_listener(Arc::downgrade(&registered));
        Harness {
            connector,
            client,
            factory,
            listener,
            registered,
        }
    }

    fn spawn_run<P: PlayerProtocol>(
        connector: &Arc<MediaConnector<P>>,
        token: &CancellationToken,
    ) -> JoinHandle<Result<(), ConnectorError>> {
        let connector = connector.clone();
        let token = token.clone();
        tokio::spawn(async move { connector.run(token).await })
    }

    fn commands_sent(client: &ScriptedHttpClient, status_paths: &[&str]) -> Vec<String> {
        client
            .requests()
            .into_iter()
            .filter(|request| !status_paths.contains(&request.as_str()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_emits_changes_then_resets() {
        let h = harness(MpcProtocol::new());
        h.client.respond_ok(VARIABLES, MPC_PLAYING);
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(h.connector.status(), ConnectionStatus::Connected);
        assert_eq!(h.listener.events(), vec![
            MediaEvent::PlayingChanged(true),
            MediaEvent::PathChanged(Some(r"C:\a.mp4".to_string())),
            MediaEvent::DurationChanged(Duration::from_millis(1000)),
            MediaEvent::PositionChanged(Duration::from_millis(500)),
            MediaEvent::SpeedChanged(1.0),
        ]);

        // Unchanged polls stay silent
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(h.listener.events().len(), 5);

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(h.connector.status(), ConnectionStatus::Disconnected);
        assert_eq!(h.listener.events()[5..], MediaEvent::reset_pair());
        assert!(h.listener.errors().is_empty());
        assert_eq!(h.client.requests()[0], "/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mpc_file_uri_is_published_as_local_path() {
        let h = harness(MpcProtocol::new());
        h.client.respond_ok(
            VARIABLES,
            r#"<p id="state">2</p><p id="filepath">file:///C:/My%20Videos/a.mp4</p>"#,
        );
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(h.listener.events(), vec![
            MediaEvent::PlayingChanged(true),
            MediaEvent::PathChanged(Some(r"C:\My Videos\a.mp4".to_string())),
        ]);

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_media_short_circuits() {
        let h = harness(MpcProtocol::new());
        h.client.respond(VARIABLES, vec![Ok(MPC_PLAYING.to_string()), Ok(MPC_NO_MEDIA.to_string())]);
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);

        tokio::time::sleep(Duration::from_millis(650)).await;
        let events = h.listener.events();
        assert_eq!(events.len(), 7);
        assert_eq!(events[5..], MediaEvent::reset_pair());

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_skips_one_poll() {
        let h = harness(MpcProtocol::new());
        h.client.respond(VARIABLES, vec![Err(HttpClientError::Timeout), Ok(MPC_PLAYING.to_string())]);
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(h.listener.events().is_empty());
        assert_eq!(h.connector.status(), ConnectionStatus::Connected);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(h.listener.events().len(), 5);

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
        assert!(h.listener.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_error_ends_session() {
        let h = harness(MpcProtocol::new());
        h.client.respond(VARIABLES, vec![Err(HttpClientError::Status {
            status: 500,
            body: String::new(),
        })]);
        let token = CancellationToken::new();

        let result = h.connector.run(token).await;
        assert!(matches!(result, Err(ConnectorError::Http(HttpClientError::Status { status: 500, .. }))));
        assert_eq!(h.listener.errors(), vec!["Error when connecting to MPC-HC".to_string()]);
        assert_eq!(h.listener.events(), MediaEvent::reset_pair().to_vec());
        assert_eq!(h.connector.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_never_connects() {
        let h = harness(MpcProtocol::new());
        h.client.respond("/", vec![Err(HttpClientError::Connect("refused".to_string()))]);

        let result = h.connector.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(ConnectorError::Http(HttpClientError::Connect(_)))));
        assert_eq!(h.client.requests(), vec!["/".to_string()]);
        assert_eq!(h.listener.errors().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_are_sent_in_order() {
        let h = harness(MpcProtocol::new());
        h.client.respond_ok(VARIABLES, MPC_PLAYING);

        // Queued while disconnected: dropped at session start
        h.connector.enqueue(MediaCommand::PlayPause(true));

        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);
        tokio::time::sleep(Duration::from_millis(10)).await;

        h.connector.enqueue(MediaCommand::PlayPause(false));
        h.connector.enqueue(MediaCommand::SeekTo(Duration::from_secs(61)));
        h.connector.enqueue(MediaCommand::ChangeSpeed(2.0));
        h.connector.enqueue(MediaCommand::ChangePath(None));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(commands_sent(&h.client, &["/", VARIABLES]), vec![
            "/command.html?wm_command=888".to_string(),
            "/command.html?wm_command=-1&position=00:01:01".to_string(),
            "/command.html?wm_command=804".to_string(),
        ]);

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_command_cancels_reader() {
        let h = harness(MpcProtocol::new());
        h.client.respond_ok(VARIABLES, MPC_PLAYING);
        h.client.respond("/command.html?wm_command=887", vec![Err(HttpClientError::Status {
            status: 404,
            body: String::new(),
        })]);
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);
        tokio::time::sleep(Duration::from_millis(10)).await;

        h.connector.enqueue(MediaCommand::PlayPause(true));
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ConnectorError::Http(HttpClientError::Status { status: 404, .. }))));
        assert!(!token.is_cancelled());
        assert_eq!(h.listener.errors().len(), 1);
        assert_eq!(h.listener.events(), MediaEvent::reset_pair().to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vlc_session_resolves_playlist_path() {
        let h = harness(VlcProtocol::with_password("secret"));
        h.client.respond_ok(VLC_STATUS, VLC_PLAYING);
        h.client.respond_ok(VLC_PLAYLIST, VLC_PLAYLIST_BODY);
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(h.listener.events(), vec![
            MediaEvent::PlayingChanged(true),
            MediaEvent::PathChanged(Some(r"C:\b.mp4".to_string())),
            MediaEvent::DurationChanged(Duration::from_secs(120)),
            MediaEvent::PositionChanged(Duration::from_secs(60)),
            MediaEvent::SpeedChanged(1.0),
        ]);
        // The playlist is fetched once for the current item
        let playlist_fetches = h.client.requests().iter().filter(|r| r.as_str() == VLC_PLAYLIST).count();
        assert_eq!(playlist_fetches, 1);

        let created = h.factory.created.lock().unwrap().clone();
        let auth = created[0].1.basic_auth.clone().unwrap();
        assert_eq!(auth.username, "");
        assert_eq!(auth.password, "secret");

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_vlc_play_pause_matching_state_sends_nothing() {
        let h = harness(VlcProtocol::with_password("secret"));
        h.client.respond_ok(VLC_STATUS, VLC_PLAYING);
        h.client.respond_ok(VLC_PLAYLIST, VLC_PLAYLIST_BODY);
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);
        tokio::time::sleep(Duration::from_millis(250)).await;

        h.connector.enqueue(MediaCommand::PlayPause(true));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(commands_sent(&h.client, &[VLC_STATUS, VLC_PLAYLIST]).is_empty());

        h.connector.enqueue(MediaCommand::PlayPause(false));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            commands_sent(&h.client, &[VLC_STATUS, VLC_PLAYLIST]),
            vec!["/requests/status.xml?command=pl_pause".to_string()]
        );

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_vlc_without_password_is_a_configuration_error() {
        let h = harness(VlcProtocol::new());
        let result = h.connector.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
        assert!(h.factory.created.lock().unwrap().is_empty());
        assert_eq!(h.listener.errors(), vec!["Error when connecting to VLC".to_string()]);
        assert!(!h.connector.can_connect(CancellationToken::new()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_endpoint_is_a_configuration_error() {
        let h = harness(MpcProtocol::new());
        h.connector.set_endpoint(None);
        let result = h.connector.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
        assert!(h.client.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_suppresses_reset() {
        let h = harness(MpcProtocol::new());
        h.connector.dispose();
        let token = CancellationToken::new();
        let handle = spawn_run(&h.connector, &token);
        tokio::time::sleep(Duration::from_millis(50)).await;

        token.cancel();
        handle.await.unwrap().unwrap();
        assert!(h.listener.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_can_connect_has_no_side_effects() {
        let h = harness(MpcProtocol::new());
        h.connector.enqueue(MediaCommand::PlayPause(true));

        assert!(h.connector.can_connect(CancellationToken::new()).await);
        assert_eq!(h.connector.status(), ConnectionStatus::Disconnected);
        assert!(h.listener.events().is_empty());
        assert_eq!(h.client.requests(), vec!["/".to_string()]);

        let created = h.factory.created.lock().unwrap().clone();
        assert_eq!(created[0].1.request_timeout, Duration::from_millis(50));

        h.client.respond("/", vec![Err(HttpClientError::Timeout)]);
        assert!(!h.connector.can_connect(CancellationToken::new()).await);
    }

    #[test]
    fn test_endpoint_action() {
        let h = harness(MpcProtocol::new());
        let registry = ActionRegistry::new();
        h.connector.register_actions(&registry);
        assert_eq!(registry.names(), vec!["MPC-HC::Endpoint::Set".to_string()]);

        registry.invoke("MPC-HC::Endpoint::Set", "192.168.1.10:8000").unwrap();
        assert_eq!(h.connector.endpoint(), Some(Endpoint::new("192.168.1.10", 8000)));

        let err = registry.invoke("MPC-HC::Endpoint::Set", "nonsense").unwrap_err();
        assert!(matches!(err, ActionError::InvalidArgument { .. }));
        assert_eq!(h.connector.endpoint(), Some(Endpoint::new("192.168.1.10", 8000)));
    }

    #[test]
    fn test_settings_round_trip() {
        let security = SecurityStore::with_key([7u8; 32]);
        let mut settings = MemorySettingsStore::new();

        let h = harness(VlcProtocol::with_password("secret"));
        h.connector.set_endpoint(Some(Endpoint::new("10.0.0.2", 9090)));
        h.connector.save_settings(&mut settings, &security).unwrap();
        assert_eq!(settings.get_string("VLC.Endpoint"), Some("10.0.0.2:9090".to_string()));

        let restored = harness(VlcProtocol::new());
        restored.connector.load_settings(&settings, &security);
        assert_eq!(restored.connector.endpoint(), Some(Endpoint::new("10.0.0.2", 9090)));
        assert_eq!(restored.connector.protocol().password(), Some("secret".to_string()));
    }

    #[test]
    fn test_invalid_stored_endpoint_is_ignored() {
        let mut settings = MemorySettingsStore::new();
        settings.set_string("MPC-HC.Endpoint", Some("no port here")).unwrap();

        let h = harness(MpcProtocol::new());
        h.connector.load_settings(&settings, &SecurityStore::with_key([0u8; 32]));
        assert_eq!(h.connector.endpoint(), Some(Endpoint::new("127.0.0.1", 13579)));
    }

    #[test]
    fn test_unregister_listener() {
        let h = harness(MpcProtocol::new());
        assert!(h.connector.unregister_listener(&h.registered));
        assert!(!h.connector.unregister_listener(&h.registered));
        h.connector.notify_events(&MediaEvent::reset_pair());
        assert!(h.listener.events().is_empty());
    }
}
