use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued tokens.
    pub token_ttl_hours: i64,
}

/// Admin credentials applied at startup.
///
/// Without `update` the account is only created when no admin exists. With
/// `update` the existing admin's email and password are replaced by these.
#[derive(Debug, Deserialize, Clone)]
pub struct AdminBootstrapConfig {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
    #[serde(default)]
    pub update: bool,
}

fn default_admin_name() -> String {
    "Admin".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: Option<AdminBootstrapConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 20)?
            .set_default("auth.token_ttl_hours", 24 * 7)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., EVENTHUB__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("EVENTHUB")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
