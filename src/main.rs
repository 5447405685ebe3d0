use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use playersync::config::{get_player_config, load_config_file, ConnectorConfig};
use playersync::helpers::actions::ActionRegistry;
use playersync::helpers::security_store::SecurityStore;
use playersync::helpers::settings::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore};
use playersync::logging::initialize_logging;
use playersync::{
    ConnectorError, MediaCommand, MediaConnector, MediaEvent, MediaEventListener, MpcProtocol,
    PlayerProtocol, VlcProtocol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlayerKind {
    #[value(name = "mpc-hc")]
    MpcHc,
    #[value(name = "vlc")]
    Vlc,
}

/// Follow a remote media player and control it from the terminal
#[derive(Debug, Parser)]
#[command(name = "playersync", version)]
struct Args {
    /// Player to connect to
    #[arg(long, value_enum)]
    player: PlayerKind,

    /// Endpoint of the player web interface (host:port)
    #[arg(long)]
    endpoint: Option<String>,

    /// Password of the player web interface (VLC)
    #[arg(long)]
    password: Option<String>,

    /// JSON file the settings are loaded from and saved to
    #[arg(long)]
    settings: Option<PathBuf>,

    /// JSON configuration file (connector timing, logging)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    debug: bool,
}

/// Logs every event of the player
struct EventLogger {
    name: String,
}

impl MediaEventListener for EventLogger {
    fn on_event(&self, event: MediaEvent) {
        match event {
            MediaEvent::PathChanged(Some(path)) => info!("[{}] Path: {}", self.name, path),
            MediaEvent::PathChanged(None) => info!("[{}] Path cleared", self.name),
            MediaEvent::PlayingChanged(playing) => {
                info!("[{}] {}", self.name, if playing { "Playing" } else { "Not playing" })
            }
            MediaEvent::DurationChanged(d) => info!("[{}] Duration: {:.3}s", self.name, d.as_secs_f64()),
            MediaEvent::PositionChanged(p) => info!("[{}] Position: {:.3}s", self.name, p.as_secs_f64()),
            MediaEvent::SpeedChanged(speed) => info!("[{}] Speed: {}", self.name, speed),
        }
    }

    fn on_error(&self, title: &str, error: &ConnectorError) {
        eprintln!("{}: {}", title, error);
    }
}

/// Parse a line typed by the user into a command
///
/// `play`, `pause`, `close`, `open <path>`, `seek <seconds>`, `speed <ratio>`
fn parse_command(line: &str) -> Option<MediaCommand> {
    let line = line.trim();
    let (verb, argument) = match line.split_once(char::is_whitespace) {
        Some((verb, argument)) => (verb, argument.trim()),
        None => (line, ""),
    };

    match verb.to_lowercase().as_str() {
        "play" => Some(MediaCommand::PlayPause(true)),
        "pause" => Some(MediaCommand::PlayPause(false)),
        "close" => Some(MediaCommand::ChangePath(None)),
        "open" if !argument.is_empty() => Some(MediaCommand::ChangePath(Some(argument.to_string()))),
        "seek" => argument
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| MediaCommand::SeekTo(Duration::from_secs_f64(s))),
        "speed" => argument
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(MediaCommand::ChangeSpeed),
        _ => None,
    }
}

async fn read_commands<P: PlayerProtocol>(connector: Arc<MediaConnector<P>>, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match parse_command(&line) {
                Some(command) => connector.enqueue(command),
                None => warn!("Unknown command '{}'", line.trim()),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read from stdin: {}", e);
                break;
            }
        }
    }
}

async fn run_player<P, F>(protocol: P, args: &Args, config: &serde_json::Value, configure: F) -> i32
where
    P: PlayerProtocol,
    F: FnOnce(&P),
{
    let connector_config = get_player_config(config, protocol.name())
        .map(ConnectorConfig::from_json)
        .unwrap_or_default();
    let connector = Arc::new(MediaConnector::new(protocol, connector_config));

    let security = match SecurityStore::open_default() {
        Ok(security) => security,
        Err(e) => {
            error!("Failed to open credential store: {}", e);
            return 1;
        }
    };

    let mut settings: Box<dyn SettingsStore> = match &args.settings {
        Some(path) => match JsonFileSettingsStore::open(path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                error!("{}", e);
                return 1;
            }
        },
        None => Box::new(MemorySettingsStore::new()),
    };
    connector.load_settings(settings.as_ref(), &security);
    configure(connector.protocol());

    let actions = ActionRegistry::new();
    connector.register_actions(&actions);
    if let Some(endpoint) = &args.endpoint {
        let action = format!("{}::Endpoint::Set", connector.name());
        if let Err(e) = actions.invoke(&action, endpoint) {
            error!("{}", e);
            return 1;
        }
    }

    let listener: Arc<dyn MediaEventListener> = Arc::new(EventLogger {
        name: connector.name().to_string(),
    });
    connector.register_listener(Arc::downgrade(&listener));

    let cancel = CancellationToken::new();
    let ctrlc_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down");
        ctrlc_token.cancel();
    }) {
        error!("Error setting Ctrl+C handler: {}", e);
        return 1;
    }

    info!("Type play, pause, close, open <path>, seek <seconds> or speed <ratio>. Ctrl+C exits.");
    let input = tokio::spawn(read_commands(connector.clone(), cancel.clone()));

    let result = connector.run(cancel.clone()).await;
    cancel.cancel();
    input.abort();
    connector.dispose();

    if let Err(e) = connector.save_settings(settings.as_mut(), &security) {
        warn!("Failed to save settings: {}", e);
    }

    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => serde_json::Value::Null,
    };

    if let Err(e) = initialize_logging(Some(&config), args.debug) {
        eprintln!("{}", e);
    }

    info!("playersync {} starting", env!("CARGO_PKG_VERSION"));

    let code = match args.player {
        PlayerKind::MpcHc => run_player(MpcProtocol::new(), &args, &config, |_| {}).await,
        PlayerKind::Vlc => {
            let password = args.password.clone();
            run_player(VlcProtocol::new(), &args, &config, move |vlc: &VlcProtocol| {
                if let Some(password) = password.as_deref() {
                    vlc.set_password(Some(password));
                }
            })
            .await
        }
    };

    info!("Exiting application");
    // stdin may still be blocked in a reader thread
    std::process::exit(code);
}
