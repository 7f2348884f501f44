use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub discovery_server_url: String,
    /// Public URL advertised to the discovery server by the (external)
    /// registration collaborator. The core only logs it.
    pub public_url: Option<String>,
    /// Tags excluded from the popular-interests listing.
    pub popular_deny_list: Vec<String>,
    pub maintenance_mode: bool,
}

impl Config {
    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let discovery_server_url = env::var("DISCOVERY_SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:4000".into());
        let public_url = env::var("RENDER_EXTERNAL_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let popular_deny_list = env::var("POPULAR_DENYLIST")
            .map(|v| {
                Self::parse_list(&v)
                    .into_iter()
                    .map(|tag| tag.to_uppercase())
                    .collect()
            })
            .unwrap_or_default();

        let maintenance_mode = env::var("MAINTENANCE_MODE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            port,
            redis_url,
            discovery_server_url,
            public_url,
            popular_deny_list,
            maintenance_mode,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            port: 3000,
            redis_url: "redis://127.0.0.1:6379/0".into(),
            discovery_server_url: "http://localhost:4000".into(),
            public_url: None,
            popular_deny_list: Vec::new(),
            maintenance_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_trims_and_drops_empties() {
        let parsed = Config::parse_list(" gaming, , music ,");
        assert_eq!(parsed, vec!["gaming".to_string(), "music".to_string()]);
    }
}
