use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use agromaq_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct ConfigRow {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl ConfigRow {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for row in rows(&config) {
        let source =
            field_source(row.key, row.env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", row.key, row.value));
    }

    lines.join("\n")
}

fn rows(config: &AppConfig) -> Vec<ConfigRow> {
    let bot_token = config
        .bot
        .token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let admin_password =
        if config.admin.password.expose_secret().is_empty() { "<empty>" } else { "<redacted>" };
    let admin_ids = config.bot.admin_ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");

    vec![
        ConfigRow::new("database.url", &config.database.url, &["AGROMAQ_DATABASE_URL"]),
        ConfigRow::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["AGROMAQ_DATABASE_MAX_CONNECTIONS"],
        ),
        ConfigRow::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["AGROMAQ_DATABASE_TIMEOUT_SECS"],
        ),
        ConfigRow::new(
            "server.bind_address",
            &config.server.bind_address,
            &["AGROMAQ_SERVER_BIND_ADDRESS"],
        ),
        ConfigRow::new("server.port", config.server.port.to_string(), &["AGROMAQ_SERVER_PORT"]),
        ConfigRow::new("admin.username", &config.admin.username, &["AGROMAQ_ADMIN_USER"]),
        ConfigRow::new("admin.password", admin_password, &["AGROMAQ_ADMIN_PASS"]),
        ConfigRow::new("bot.enabled", config.bot.enabled.to_string(), &["AGROMAQ_BOT_ENABLED"]),
        ConfigRow::new("bot.token", bot_token, &["AGROMAQ_BOT_TOKEN"]),
        ConfigRow::new("bot.admin_ids", admin_ids, &["AGROMAQ_BOT_ADMIN_IDS"]),
        ConfigRow::new(
            "bot.discount_percent",
            config.bot.discount_percent.to_string(),
            &["AGROMAQ_BOT_DISCOUNT_PERCENT"],
        ),
        ConfigRow::new("document.city", &config.document.city, &["AGROMAQ_DOCUMENT_CITY"]),
        ConfigRow::new(
            "document.logo_path",
            config
                .document
                .logo_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            &["AGROMAQ_DOCUMENT_LOGO_PATH"],
        ),
        ConfigRow::new(
            "document.description_mode",
            format!("{:?}", config.document.description_mode),
            &["AGROMAQ_DOCUMENT_DESCRIPTION_MODE"],
        ),
        ConfigRow::new("document.line_width", config.document.line_width.to_string(), &[]),
        ConfigRow::new(
            "document.wkhtmltopdf_path",
            config.document.wkhtmltopdf_path.as_deref().unwrap_or("<auto>"),
            &["AGROMAQ_DOCUMENT_WKHTMLTOPDF_PATH"],
        ),
        ConfigRow::new(
            "logging.level",
            &config.logging.level,
            &["AGROMAQ_LOGGING_LEVEL", "AGROMAQ_LOG_LEVEL"],
        ),
        ConfigRow::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["AGROMAQ_LOGGING_FORMAT", "AGROMAQ_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("agromaq.toml"), PathBuf::from("config/agromaq.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the numeric bot id before `:` and hides the secret half.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_token};

    #[test]
    fn redact_token_keeps_bot_id_only() {
        assert_eq!(redact_token("123456:AAE-secret"), "123456:***");
        assert_eq!(redact_token("opaque"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: Value = "[document]\ncity = \"Rosario\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "document.city"));
        assert!(!contains_path(&doc, "document.logo_path"));
        assert!(!contains_path(&doc, "bot.token"));
    }
}
