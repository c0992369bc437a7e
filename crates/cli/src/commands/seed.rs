use agromaq_core::CatalogDefinition;
use agromaq_db::repositories::SqlMachineRepository;
use agromaq_db::{connect_with_config, migrations, seed_catalog, SeedResult};

use crate::commands::{prepare, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlMachineRepository::new(pool.clone());
        let seeded = seed_catalog(&repository, &CatalogDefinition::agromaq())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8));

        pool.close().await;
        Ok::<SeedResult, StepFailure>(seeded?)
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_message(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_message(seeded: &SeedResult) -> String {
    if seeded.seeded() {
        format!("seeded {} machines into an empty catalog", seeded.inserted)
    } else {
        format!("catalog already populated ({} machines); nothing inserted", seeded.total)
    }
}
