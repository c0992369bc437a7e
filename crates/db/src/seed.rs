use agromaq_core::CatalogDefinition;
use tracing::info;

use crate::repositories::{MachineRepository, RepositoryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub total: u64,
}

impl SeedResult {
    pub fn seeded(&self) -> bool {
        self.inserted > 0
    }
}

/// Loads the catalog into the machine store unless it already holds rows.
pub async fn seed_catalog<R>(
    repository: &R,
    catalog: &CatalogDefinition,
) -> Result<SeedResult, RepositoryError>
where
    R: MachineRepository + ?Sized,
{
    let inserted = repository.insert_if_empty(catalog.seed_machines()).await?;
    let total = repository.count().await?;

    if inserted > 0 {
        info!(event_name = "catalog.seeded", inserted, total, "seeded machine catalog");
    } else {
        info!(event_name = "catalog.seed_skipped", total, "machine catalog already populated");
    }

    Ok(SeedResult { inserted, total })
}

#[cfg(test)]
mod tests {
    use agromaq_core::CatalogDefinition;

    use super::seed_catalog;
    use crate::repositories::SqlMachineRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seeding_twice_yields_the_same_row_count() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlMachineRepository::new(pool);
        let catalog = CatalogDefinition::agromaq();

        let first = seed_catalog(&repo, &catalog).await.expect("first seed");
        let second = seed_catalog(&repo, &catalog).await.expect("second seed");

        assert!(first.seeded());
        assert_eq!(first.inserted, 25);
        assert!(!second.seeded());
        assert_eq!(second.total, first.total);
    }
}
