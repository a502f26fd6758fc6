use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    // Storage
    pub storage: StorageBackend,
    pub database_url: Option<Secret<String>>,
    pub database_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("storage", "postgres")?
            .set_default("database_max_connections", 20)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let storage: StorageBackend = config.get("storage")?;
        let database_url = config.get::<String>("database_url").ok().map(Secret::new);

        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(config::ConfigError::NotFound(
                "database_url (required when storage=postgres)".to_string(),
            ));
        }

        Ok(Self {
            host: config.get("host")?,
            port: config.get("port")?,
            storage,
            database_url,
            database_max_connections: config.get("database_max_connections")?,
        })
    }
}
