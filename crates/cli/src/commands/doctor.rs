use agromaq_core::config::{AppConfig, LoadOptions};
use agromaq_db::repositories::{MachineRepository, SqlMachineRepository};
use agromaq_db::{connect_with_config, ping};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ),
            check_bot_transport(&config),
            check_logo(&config),
            check_pdf_converter(&config),
            check_database(&config),
        ],
        Err(error) => {
            let skipped = |name| {
                DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                )
            };
            vec![
                DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()),
                skipped("bot_transport"),
                skipped("document_logo"),
                skipped("pdf_converter"),
                skipped("database_connectivity"),
            ]
        }
    };

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let failed = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);

    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if warned {
        (CheckStatus::Warn, "doctor: ready with degraded document output")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_bot_transport(config: &AppConfig) -> DoctorCheck {
    let name = "bot_transport";
    if !config.bot.enabled {
        return DoctorCheck::new(name, CheckStatus::Pass, "chat bot disabled");
    }
    if config.bot_transport_configured() {
        DoctorCheck::new(name, CheckStatus::Pass, "chat bot enabled with a token")
    } else {
        DoctorCheck::new(name, CheckStatus::Warn, "chat bot enabled but no token is configured")
    }
}

fn check_logo(config: &AppConfig) -> DoctorCheck {
    let name = "document_logo";
    match &config.document.logo_path {
        None => DoctorCheck::new(name, CheckStatus::Warn, "no logo configured; documents leave it blank"),
        Some(path) if path.is_file() => {
            DoctorCheck::new(name, CheckStatus::Pass, format!("logo found at `{}`", path.display()))
        }
        Some(path) => DoctorCheck::new(
            name,
            CheckStatus::Warn,
            format!("logo `{}` not found; documents leave it blank", path.display()),
        ),
    }
}

fn check_pdf_converter(config: &AppConfig) -> DoctorCheck {
    let name = "pdf_converter";
    let candidate = config.document.wkhtmltopdf_path.as_deref().unwrap_or("wkhtmltopdf");
    match which::which(candidate) {
        Ok(path) => {
            DoctorCheck::new(name, CheckStatus::Pass, format!("using `{}`", path.display()))
        }
        Err(error) => DoctorCheck::new(
            name,
            CheckStatus::Warn,
            format!("`{candidate}` unavailable ({error}); quotations are served as HTML"),
        ),
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let name = "database_connectivity";
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::new(
                name,
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        let outcome = match ping(&pool).await {
            Ok(()) => Ok(SqlMachineRepository::new(pool.clone()).count().await.ok()),
            Err(error) => Err(format!("database query failed: {error}")),
        };
        pool.close().await;
        outcome
    });

    match result {
        Ok(Some(machines)) => DoctorCheck::new(
            name,
            CheckStatus::Pass,
            format!("connected using `{}` ({machines} machines stored)", config.database.url),
        ),
        Ok(None) => DoctorCheck::new(
            name,
            CheckStatus::Pass,
            format!("connected using `{}` (schema not migrated yet)", config.database.url),
        ),
        Err(error) => DoctorCheck::new(name, CheckStatus::Fail, error),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
