pub mod actions;
pub mod http_client;
pub mod media_path;
pub mod security_store;
pub mod settings;
