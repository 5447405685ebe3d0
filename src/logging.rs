use std::collections::HashMap;
use std::fs;
use log::{debug, info, LevelFilter};
use serde::{Deserialize, Serialize};
use env_logger::{Builder, Target, WriteStyle};
use std::io::Write;

/// Available logging subsystems in playersync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggingSubsystem {
    /// Main application logging
    #[serde(rename = "main")]
    Main,
    /// Player connectors (sessions, polling, commands)
    #[serde(rename = "players")]
    Players,
    /// HTTP transport
    #[serde(rename = "http")]
    Http,
    /// Settings persistence
    #[serde(rename = "settings")]
    Settings,
    /// Credential encryption
    #[serde(rename = "security")]
    Security,
    /// Action registry
    #[serde(rename = "actions")]
    Actions,
    /// Configuration loading and parsing
    #[serde(rename = "config")]
    Config,
    /// Network operations
    #[serde(rename = "network")]
    Network,
    /// Third-party dependencies
    #[serde(rename = "deps")]
    Dependencies,
}

impl LoggingSubsystem {
    /// Get the module prefix for this subsystem
    pub fn module_prefix(&self) -> &'static str {
        match self {
            LoggingSubsystem::Main => "playersync",
            LoggingSubsystem::Players => "playersync::players",
            LoggingSubsystem::Http => "playersync::helpers::http_client,reqwest,hyper",
            LoggingSubsystem::Settings => "playersync::helpers::settings",
            LoggingSubsystem::Security => "playersync::helpers::security_store",
            LoggingSubsystem::Actions => "playersync::helpers::actions",
            LoggingSubsystem::Config => "playersync::config",
            LoggingSubsystem::Network => "tokio,mio",
            LoggingSubsystem::Dependencies => "quick_xml,serde",
        }
    }

    /// Get all available subsystems
    pub fn all() -> Vec<LoggingSubsystem> {
        vec![
            LoggingSubsystem::Main,
            LoggingSubsystem::Players,
            LoggingSubsystem::Http,
            LoggingSubsystem::Settings,
            LoggingSubsystem::Security,
            LoggingSubsystem::Actions,
            LoggingSubsystem::Config,
            LoggingSubsystem::Network,
            LoggingSubsystem::Dependencies,
        ]
    }

    /// Parse a subsystem name as used in configuration files
    pub fn from_name(name: &str) -> Option<LoggingSubsystem> {
        match name.to_lowercase().as_str() {
            "main" => Some(LoggingSubsystem::Main),
            "players" => Some(LoggingSubsystem::Players),
            "http" => Some(LoggingSubsystem::Http),
            "settings" => Some(LoggingSubsystem::Settings),
            "security" => Some(LoggingSubsystem::Security),
            "actions" => Some(LoggingSubsystem::Actions),
            "config" => Some(LoggingSubsystem::Config),
            "network" => Some(LoggingSubsystem::Network),
            "deps" | "dependencies" => Some(LoggingSubsystem::Dependencies),
            _ => None,
        }
    }
}

/// Logging configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    
    /// Target for log output (stdout, stderr, file)
    #[serde(default = "default_target")]
    pub target: String,
    
    /// Log file path (when target is "file")
    pub file_path: Option<String>,
    
    /// Whether to include timestamps
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,
    
    /// Whether to use colored output
    #[serde(default = "default_colors")]
    pub colors: bool,
    
    /// Subsystem-specific log levels
    #[serde(default)]
    pub subsystems: HashMap<String, String>,
    
    /// Whether to include module paths in log output
    #[serde(default = "default_module_path")]
    pub include_module_path: bool,
    
    /// Whether to include line numbers in log output
    #[serde(default = "default_line_numbers")]
    pub include_line_numbers: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target() -> String {
    "stdout".to_string()
}

fn default_timestamps() -> bool {
    true
}

fn default_colors() -> bool {
    true
}

fn default_module_path() -> bool {
    false
}

fn default_line_numbers() -> bool {
    false
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            target: default_target(),
            file_path: None,
            timestamps: default_timestamps(),
            colors: default_colors(),
            subsystems: HashMap::new(),
            include_module_path: default_module_path(),
            include_line_numbers: default_line_numbers(),
        }
    }
}

impl LoggingConfig {
    /// Load logging configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse logging config JSON: {}", e))
    }
    
    /// Convert string log level to LevelFilter
    fn parse_log_level(level: &str) -> LevelFilter {
        match level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => {
                eprintln!("Warning: Unknown log level '{}', defaulting to 'info'", level);
                LevelFilter::Info
            }
        }
    }
    
    /// Build the environment filter string for env_logger
    pub fn build_filter_string(&self) -> String {
        let mut filter_parts = Vec::new();
        
        // Set global default level
        let global_level = &self.level;
        filter_parts.push(global_level.clone());
        
        // Add subsystem-specific levels
        for (subsystem_name, level) in &self.subsystems {
            if let Some(subsystem) = LoggingSubsystem::from_name(subsystem_name) {
                let module_prefixes = subsystem.module_prefix();
                for prefix in module_prefixes.split(',') {
                    filter_parts.push(format!("{}={}", prefix.trim(), level));
                }
            } else {
                // Allow custom module specifications
                filter_parts.push(format!("{}={}", subsystem_name, level));
            }
        }
        
        filter_parts.join(",")
    }
    
    /// Initialize the logger with this configuration
    pub fn initialize_logger(&self) -> Result<(), String> {
        let filter_string = self.build_filter_string();
        debug!("Using logging filter: {}", filter_string);
        
        let mut builder = Builder::new();
        
        // Parse environment variables if they exist
        builder.parse_env("RUST_LOG");
        
        // Set the filter directly
        builder.filter(None, Self::parse_log_level(&self.level));
        
        // Add subsystem-specific filters
        for (subsystem_name, level) in &self.subsystems {
            let level_filter = Self::parse_log_level(level);
            if let Some(subsystem) = LoggingSubsystem::from_name(subsystem_name) {
                let module_prefixes = subsystem.module_prefix();
                for prefix in module_prefixes.split(',') {
                    builder.filter(Some(prefix.trim()), level_filter);
                }
            } else {
                // Allow custom module specifications
                builder.filter(Some(subsystem_name), level_filter);
            }
        }
        
        // Configure timestamps
        if !self.timestamps {
            builder.format_timestamp(None);
        }
        
        // Configure colors
        let write_style = if self.colors {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        };
        builder.write_style(write_style);
        
        // Configure output target
        match self.target.to_lowercase().as_str() {
            "stdout" => {
                builder.target(Target::Stdout);
            }
            "stderr" => {
                builder.target(Target::Stderr);
            }
            "file" => {
                let file_path = self
                    .file_path
                    .as_ref()
                    .ok_or_else(|| "File target specified but no file_path provided".to_string())?;
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .map_err(|e| format!("Failed to open log file {}: {}", file_path, e))?;
                builder.target(Target::Pipe(Box::new(file)));
            }
            _ => {
                return Err(format!("Unknown logging target: {}", self.target));
            }
        }
        
        // Configure module path and line numbers
        let include_module_path = self.include_module_path;
        let include_line_numbers = self.include_line_numbers;
        let timestamps = self.timestamps;
        
        builder.format(move |buf, record| {
            if timestamps {
                write!(buf, "[{}] ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))?;
            }
            write!(buf, "[{}] ", record.level())?;
            if include_module_path {
                if let Some(module) = record.module_path() {
                    write!(buf, "[{}] ", module)?;
                }
            }
            if include_line_numbers {
                if let (Some(file), Some(line)) = (record.file(), record.line()) {
                    write!(buf, "[{}:{}] ", file, line)?;
                }
            }
            writeln!(buf, "{}", record.args())
        });
        
        // Initialize the logger
        builder.try_init()
            .map_err(|e| format!("Failed to initialize logger: {}", e))?;
        
        info!("Logging initialized with filter: {}", filter_string);
        Ok(())
    }
}

/// Initialize logging for the command line tool
///
/// The configuration is read from the "logging" section of the config file
/// when present; `debug` raises the global level.
pub fn initialize_logging(config: Option<&serde_json::Value>, debug: bool) -> Result<(), String> {
    let mut logging = match config.and_then(|c| c.get("logging")) {
        Some(section) => serde_json::from_value::<LoggingConfig>(section.clone())
            .map_err(|e| format!("Failed to parse logging config: {}", e))?,
        None => LoggingConfig::default(),
    };

    if debug {
        logging.level = "debug".to_string();
    }

    logging.initialize_logger()
}
