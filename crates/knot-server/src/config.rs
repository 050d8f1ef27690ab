use std::env;
use std::net::{AddrParseError, SocketAddr};

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_API_KEY: &str = "012345";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub api_key: String,
    pub db_path: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AddrParseError> {
        let bind = env::var("KNOT_HTTP_BIND")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()?;

        let api_key = env::var("KNOT_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_KEY.to_string());

        let db_path = env::var("KNOT_DB_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty());

        Ok(Self {
            bind,
            api_key,
            db_path,
        })
    }
}
