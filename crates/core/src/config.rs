use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub bot: BotConfig,
    pub document: DocumentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub username: String,
    pub password: SecretString,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub enabled: bool,
    pub token: Option<SecretString>,
    pub admin_ids: Vec<i64>,
    pub discount_percent: u32,
}

#[derive(Clone, Debug)]
pub struct DocumentConfig {
    pub city: String,
    pub logo_path: Option<PathBuf>,
    pub description_mode: DescriptionMode,
    pub line_width: usize,
    pub validity_notice: String,
    pub footer_lines: Vec<String>,
    pub wkhtmltopdf_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Where the product section of a quotation document gets its text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionMode {
    /// Built from the quoted machine.
    Machine,
    /// The legacy hard-coded trailer specification, whatever machine was quoted.
    Fixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bot_enabled: Option<bool>,
    pub bot_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_LINE_WIDTH: usize = 134;

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            city: "Las Parejas".to_string(),
            logo_path: None,
            description_mode: DescriptionMode::Machine,
            line_width: DEFAULT_LINE_WIDTH,
            validity_notice:
                "Esta cotización se mantendrá por 1 día; luego caducará sin previo aviso."
                    .to_string(),
            footer_lines: vec![
                "Ruta Nacional 178 N° 545 – CP (2505) – La Parejas, Santa Fe, Argentina"
                    .to_string(),
                "Tel/Fax: 03471 – 471388".to_string(),
                "E-mail: ventas@agromaqslaparejas.com.ar – Web: www.agromaqargentina.com.ar"
                    .to_string(),
            ],
            wkhtmltopdf_path: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://agromaq.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8000 },
            admin: AdminConfig { username: String::new(), password: String::new().into() },
            bot: BotConfig { enabled: false, token: None, admin_ids: Vec::new(), discount_percent: 10 },
            document: DocumentConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for DescriptionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "machine" => Ok(Self::Machine),
            "fixed" => Ok(Self::Fixed),
            other => Err(ConfigError::Validation(format!(
                "unsupported description mode `{other}` (expected machine|fixed)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("agromaq.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// True when the bot has credentials to reach a real chat transport.
    pub fn bot_transport_configured(&self) -> bool {
        self.bot.enabled
            && self.bot.token.as_ref().is_some_and(|token| !token.expose_secret().trim().is_empty())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(admin) = patch.admin {
            if let Some(username) = admin.username {
                self.admin.username = username;
            }
            if let Some(password) = admin.password {
                self.admin.password = secret_value(password);
            }
        }

        if let Some(bot) = patch.bot {
            if let Some(enabled) = bot.enabled {
                self.bot.enabled = enabled;
            }
            if let Some(token) = bot.token {
                self.bot.token = Some(secret_value(token));
            }
            if let Some(admin_ids) = bot.admin_ids {
                self.bot.admin_ids = admin_ids;
            }
            if let Some(discount_percent) = bot.discount_percent {
                self.bot.discount_percent = discount_percent;
            }
        }

        if let Some(document) = patch.document {
            if let Some(city) = document.city {
                self.document.city = city;
            }
            if let Some(logo_path) = document.logo_path {
                self.document.logo_path = Some(logo_path);
            }
            if let Some(description_mode) = document.description_mode {
                self.document.description_mode = description_mode;
            }
            if let Some(line_width) = document.line_width {
                self.document.line_width = line_width;
            }
            if let Some(validity_notice) = document.validity_notice {
                self.document.validity_notice = validity_notice;
            }
            if let Some(footer_lines) = document.footer_lines {
                self.document.footer_lines = footer_lines;
            }
            if let Some(wkhtmltopdf_path) = document.wkhtmltopdf_path {
                self.document.wkhtmltopdf_path = Some(wkhtmltopdf_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AGROMAQ_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("AGROMAQ_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("AGROMAQ_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("AGROMAQ_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("AGROMAQ_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AGROMAQ_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AGROMAQ_SERVER_PORT") {
            self.server.port = parse_u16("AGROMAQ_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("AGROMAQ_ADMIN_USER") {
            self.admin.username = value;
        }
        if let Some(value) = read_env("AGROMAQ_ADMIN_PASS") {
            self.admin.password = secret_value(value);
        }

        if let Some(value) = read_env("AGROMAQ_BOT_ENABLED") {
            self.bot.enabled = parse_bool("AGROMAQ_BOT_ENABLED", &value)?;
        }
        if let Some(value) = read_env("AGROMAQ_BOT_TOKEN") {
            self.bot.token = Some(secret_value(value));
        }
        if let Some(value) = read_env("AGROMAQ_BOT_ADMIN_IDS") {
            self.bot.admin_ids = parse_id_list("AGROMAQ_BOT_ADMIN_IDS", &value)?;
        }
        if let Some(value) = read_env("AGROMAQ_BOT_DISCOUNT_PERCENT") {
            self.bot.discount_percent = parse_u32("AGROMAQ_BOT_DISCOUNT_PERCENT", &value)?;
        }

        if let Some(value) = read_env("AGROMAQ_DOCUMENT_CITY") {
            self.document.city = value;
        }
        if let Some(value) = read_env("AGROMAQ_DOCUMENT_LOGO_PATH") {
            self.document.logo_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("AGROMAQ_DOCUMENT_DESCRIPTION_MODE") {
            self.document.description_mode = value.parse()?;
        }
        if let Some(value) = read_env("AGROMAQ_DOCUMENT_WKHTMLTOPDF_PATH") {
            self.document.wkhtmltopdf_path = Some(value);
        }

        let log_level = read_env("AGROMAQ_LOGGING_LEVEL").or_else(|| read_env("AGROMAQ_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AGROMAQ_LOGGING_FORMAT").or_else(|| read_env("AGROMAQ_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(admin_username) = overrides.admin_username {
            self.admin.username = admin_username;
        }
        if let Some(admin_password) = overrides.admin_password {
            self.admin.password = secret_value(admin_password);
        }
        if let Some(bot_enabled) = overrides.bot_enabled {
            self.bot.enabled = bot_enabled;
        }
        if let Some(bot_token) = overrides.bot_token {
            self.bot.token = Some(secret_value(bot_token));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_admin(&self.admin)?;
        validate_bot(&self.bot)?;
        validate_document(&self.document)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("agromaq.toml"), PathBuf::from("config/agromaq.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    Ok(())
}

fn validate_admin(admin: &AdminConfig) -> Result<(), ConfigError> {
    if admin.username.trim().is_empty() {
        return Err(ConfigError::Validation(
            "admin.username is required (set AGROMAQ_ADMIN_USER or [admin].username)".to_string(),
        ));
    }
    if admin.password.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "admin.password is required (set AGROMAQ_ADMIN_PASS or [admin].password)".to_string(),
        ));
    }
    Ok(())
}

fn validate_bot(bot: &BotConfig) -> Result<(), ConfigError> {
    if bot.discount_percent > 100 {
        return Err(ConfigError::Validation(
            "bot.discount_percent must be in range 0..=100".to_string(),
        ));
    }
    Ok(())
}

fn validate_document(document: &DocumentConfig) -> Result<(), ConfigError> {
    if document.line_width < 16 {
        return Err(ConfigError::Validation(
            "document.line_width must be at least 16 characters".to_string(),
        ));
    }
    if document.city.trim().is_empty() {
        return Err(ConfigError::Validation("document.city must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_id_list(key: &str, value: &str) -> Result<Vec<i64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    admin: Option<AdminPatch>,
    bot: Option<BotPatch>,
    document: Option<DocumentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct AdminPatch {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BotPatch {
    enabled: Option<bool>,
    token: Option<String>,
    admin_ids: Option<Vec<i64>>,
    discount_percent: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentPatch {
    city: Option<String>,
    logo_path: Option<PathBuf>,
    description_mode: Option<DescriptionMode>,
    line_width: Option<usize>,
    validity_notice: Option<String>,
    footer_lines: Option<Vec<String>>,
    wkhtmltopdf_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
