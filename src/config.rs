//! Deployment configuration.
//!
//! Loaded once at startup from a TOML file. Every section has defaults so
//! a partial file is enough.

use gridgate_core::{is_valid_object_name, QueryLimits, TableWhitelist};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub batch: BatchConfig,
    pub auth: AuthConfig,
    pub menu: MenuConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("gridgate.db"),
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Tables readable through the dynamic query endpoints.
    pub allowed_tables: Vec<String>,
    pub max_page_size: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            allowed_tables: Vec::new(),
            max_page_size: QueryLimits::default().max_page_size,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Writable tables. Empty leaves only the identifier checks.
    pub allowed_tables: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub jwt_secret: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub access_token_minutes: i64,
    pub user_table: String,
    pub codes_table: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jwt_secret: None,
            issuer: "gridgate".to_string(),
            audience: "gridgate-client".to_string(),
            access_token_minutes: 120,
            user_table: "t_sys_user".to_string(),
            codes_table: "t_sys_user_codes".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub menu_table: String,
    pub function_table: String,
    pub function_root: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            menu_table: "vben_v_user_role_menus".to_string(),
            function_table: "vben_role".to_string(),
            function_root: "00000000-0000-0000-0000-000000000000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, ApiError> {
        let config: AppConfig = toml::from_str(text).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Table names from the auth and menu sections end up in SQL text.
    pub fn validate(&self) -> Result<(), ApiError> {
        for name in [
            &self.auth.user_table,
            &self.auth.codes_table,
            &self.menu.menu_table,
            &self.menu.function_table,
        ] {
            if !is_valid_object_name(name) {
                return Err(ApiError::Config(format!("invalid table name: {}", name)));
            }
        }
        if self.query.max_page_size < 1 {
            return Err(ApiError::Config("query.max_page_size must be at least 1".to_string()));
        }
        if self.auth.access_token_minutes < 1 {
            return Err(ApiError::Config(
                "auth.access_token_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_whitelist(&self) -> Result<TableWhitelist, ApiError> {
        Ok(TableWhitelist::new(&self.query.allowed_tables)?)
    }

    pub fn batch_whitelist(&self) -> Result<Option<TableWhitelist>, ApiError> {
        if self.batch.allowed_tables.is_empty() {
            return Ok(None);
        }
        Ok(Some(TableWhitelist::new(&self.batch.allowed_tables)?))
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            max_page_size: self.query.max_page_size,
        }
    }

    /// `auth.jwt_secret`, else the `JWT_SECRET` environment variable.
    pub fn jwt_secret(&self) -> Option<String> {
        self.auth
            .jwt_secret
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
