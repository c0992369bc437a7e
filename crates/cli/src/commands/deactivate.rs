use agromaq_core::MachineCode;
use agromaq_db::repositories::{MachineRepository, SqlMachineRepository};
use agromaq_db::{connect_with_config, migrations};

use crate::commands::{prepare, CommandResult, StepFailure};

/// Marks a machine inactive. Quotation records that reference it are kept.
pub fn run(code: &str) -> CommandResult {
    let code = code.trim();
    if code.is_empty() {
        return CommandResult::failure("deactivate", "invalid_argument", "machine code is empty", 2);
    }

    let (config, runtime) = match prepare("deactivate") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let code = MachineCode::from(code);
    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlMachineRepository::new(pool.clone());
        let deactivated = repository
            .deactivate(&code)
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8));

        pool.close().await;
        Ok::<bool, StepFailure>(deactivated?)
    });

    match result {
        Ok(true) => CommandResult::success("deactivate", format!("machine {code} deactivated")),
        Ok(false) => CommandResult::failure(
            "deactivate",
            "not_found",
            format!("no active machine with code {code}"),
            6,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("deactivate", error_class, message, exit_code)
        }
    }
}
