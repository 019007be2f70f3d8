use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub geocoder: GeocoderConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_limit: u64,
    pub max_limit: Option<u64>,
    /// Count the whole collection for pagination instead of the filtered set
    pub count_unfiltered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeocoderProvider {
    MapQuest,
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub provider: GeocoderProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// JSON fixtures for the static provider
    pub fixtures: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Query overrides
        if let Ok(v) = env::var("QUERY_DEFAULT_LIMIT") {
            self.query.default_limit = v.parse().ok().filter(|n| *n > 0).unwrap_or(self.query.default_limit);
        }
        if let Ok(v) = env::var("QUERY_MAX_LIMIT") {
            self.query.max_limit = v.parse().ok().filter(|n| *n > 0);
        }
        if let Ok(v) = env::var("QUERY_COUNT_UNFILTERED") {
            self.query.count_unfiltered = v.parse().unwrap_or(self.query.count_unfiltered);
        }

        // Geocoder overrides
        if let Ok(v) = env::var("GEOCODER_PROVIDER") {
            self.geocoder.provider = match v.to_lowercase().as_str() {
                "mapquest" => GeocoderProvider::MapQuest,
                "static" => GeocoderProvider::Static,
                _ => self.geocoder.provider,
            };
        }
        if let Ok(v) = env::var("GEOCODER_API_KEY") {
            self.geocoder.api_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("GEOCODER_BASE_URL") {
            self.geocoder.base_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("GEOCODER_FIXTURES") {
            self.geocoder.fixtures = Some(PathBuf::from(v));
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.security.enable_request_logging = v.parse().unwrap_or(self.security.enable_request_logging);
        }

        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { host: "127.0.0.1".to_string(), port: 5000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            query: QueryConfig { default_limit: 25, max_limit: Some(1000), count_unfiltered: false },
            geocoder: GeocoderConfig {
                provider: GeocoderProvider::Static,
                api_key: None,
                base_url: None,
                fixtures: None,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret".to_string(),
                enable_cors: true,
                enable_request_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { host: "0.0.0.0".to_string(), port: 5000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            query: QueryConfig { default_limit: 25, max_limit: Some(500), count_unfiltered: false },
            geocoder: GeocoderConfig {
                provider: GeocoderProvider::MapQuest,
                api_key: None,
                base_url: None,
                fixtures: None,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_cors: true,
                enable_request_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { host: "0.0.0.0".to_string(), port: 5000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            query: QueryConfig { default_limit: 25, max_limit: Some(100), count_unfiltered: false },
            geocoder: GeocoderConfig {
                provider: GeocoderProvider::MapQuest,
                api_key: None,
                base_url: None,
                fixtures: None,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_cors: true,
                enable_request_logging: false,
            },
        }
    }
}
