//! Application configuration loaded from environment variables.
//!
//! Without Supabase credentials the service runs in local-only mode.

use std::env;
use std::path::PathBuf;

/// Remote backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anon key (sent as `apikey`)
    pub anon_key: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Directory holding the local key-value files
    pub data_dir: PathBuf,
    /// Seconds between passive cycle recomputes
    pub cycle_tick_secs: u64,
    /// Remote backend; `None` means local-only mode
    pub supabase: Option<SupabaseConfig>,
}

impl Config {
    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            cycle_tick_secs: 60,
            supabase: None,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase = match (env::var("SUPABASE_URL"), env::var("SUPABASE_ANON_KEY")) {
            (Ok(url), Ok(anon_key)) => Some(SupabaseConfig {
                url: url.trim().trim_end_matches('/').to_string(),
                anon_key: anon_key.trim().to_string(),
            }),
            (Ok(_), Err(_)) => return Err(ConfigError::Missing("SUPABASE_ANON_KEY")),
            (Err(_), Ok(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
            (Err(_), Err(_)) => None,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            cycle_tick_secs: env::var("CYCLE_TICK_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60u64)
                .max(1),
            supabase,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test touches the environment so there is no cross-test race.
    #[test]
    fn test_config_from_env() {
        env::set_var("PORT", "9090");
        env::set_var("CYCLE_TICK_SECS", "0");
        env::set_var("DATA_DIR", "/tmp/brahma");
        env::remove_var("SUPABASE_URL");
        env::remove_var("SUPABASE_ANON_KEY");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.port, 9090);
        assert_eq!(config.cycle_tick_secs, 1);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/brahma"));
        assert_eq!(config.supabase, None);

        env::set_var("SUPABASE_URL", "https://example.supabase.co/");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
        ));

        env::set_var("SUPABASE_ANON_KEY", "anon");
        let config = Config::from_env().expect("Config should load");
        assert_eq!(
            config.supabase,
            Some(SupabaseConfig {
                url: "https://example.supabase.co".to_string(),
                anon_key: "anon".to_string(),
            })
        );

        for var in ["PORT", "CYCLE_TICK_SECS", "DATA_DIR", "SUPABASE_URL", "SUPABASE_ANON_KEY"] {
            env::remove_var(var);
        }
    }
}
