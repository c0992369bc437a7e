use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use agromaq_core::domain::machine::{Machine, MachineCode};

use super::{MachineRepository, RepositoryError};
use crate::DbPool;

const MACHINE_COLUMNS: &str = "code, name, price, category, description, active";

pub struct SqlMachineRepository {
    pool: DbPool,
}

impl SqlMachineRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid decimal in `{column}`: {e}")))
}

fn row_to_machine(row: &sqlx::sqlite::SqliteRow) -> Result<Machine, RepositoryError> {
    let code: String = row.try_get("code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: String =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: bool =
        row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Machine {
        code: MachineCode(code),
        name,
        price: parse_decimal("price", &price)?,
        category,
        description,
        active,
    })
}

#[async_trait::async_trait]
impl MachineRepository for SqlMachineRepository {
    async fn list_active(&self) -> Result<Vec<Machine>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MACHINE_COLUMNS} FROM machine WHERE active = 1 ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_machine).collect::<Result<Vec<_>, _>>()
    }

    async fn find_active_by_code(
        &self,
        code: &MachineCode,
    ) -> Result<Option<Machine>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MACHINE_COLUMNS} FROM machine WHERE code = ? AND active = 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_machine).transpose()
    }

    async fn update_price(
        &self,
        code: &MachineCode,
        price: Decimal,
    ) -> Result<Machine, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE machine SET price = ? WHERE code = ? AND active = 1
             RETURNING {MACHINE_COLUMNS}"
        ))
        .bind(price.to_string())
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => row_to_machine(row),
            None => Err(RepositoryError::NotFound(code.to_string())),
        }
    }

    async fn deactivate(&self, code: &MachineCode) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE machine SET active = 0 WHERE code = ? AND active = 1")
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM machine")
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn insert_if_empty(&self, machines: Vec<Machine>) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query("SELECT COUNT(*) AS count FROM machine")
            .fetch_one(&mut *tx)
            .await?
            .try_get("count")?;
        if existing > 0 {
            tx.rollback().await?;
            return Ok(0);
        }

        for machine in &machines {
            sqlx::query(
                "INSERT INTO machine (code, name, price, category, description, active)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(machine.code.as_str())
            .bind(&machine.name)
            .bind(machine.price.to_string())
            .bind(&machine.category)
            .bind(&machine.description)
            .bind(machine.active)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(machines.len())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use agromaq_core::domain::machine::MachineCode;
    use agromaq_core::CatalogDefinition;

    use super::SqlMachineRepository;
    use crate::repositories::{MachineRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn seeded_repo() -> SqlMachineRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlMachineRepository::new(pool);
        repo.insert_if_empty(CatalogDefinition::agromaq().seed_machines()).await.expect("seed");
        repo
    }

    #[tokio::test]
    async fn list_active_keeps_insertion_order() {
        let repo = seeded_repo().await;

        let machines = repo.list_active().await.expect("list");
        assert_eq!(machines.len(), 25);
        assert_eq!(machines[0].code.as_str(), "ACO001");
        assert_eq!(machines[24].code.as_str(), "CAR025");
        assert_eq!(machines[0].price, Decimal::from(11_000));
    }

    #[tokio::test]
    async fn update_price_is_visible_to_the_next_read() {
        let repo = seeded_repo().await;
        let code = MachineCode::from("ACO001");

        let updated = repo.update_price(&code, Decimal::from(30_000)).await.expect("update");
        assert_eq!(updated.price, Decimal::from(30_000));

        let found = repo.find_active_by_code(&code).await.expect("find").expect("present");
        assert_eq!(found.price, Decimal::from(30_000));
    }

    #[tokio::test]
    async fn fractional_prices_survive_storage() {
        let repo = seeded_repo().await;
        let code = MachineCode::from("TOL015");

        repo.update_price(&code, Decimal::new(1_234_567, 2)).await.expect("update");
        let found = repo.find_active_by_code(&code).await.expect("find").expect("present");
        assert_eq!(found.price, Decimal::new(1_234_567, 2));
    }

    #[tokio::test]
    async fn deactivated_machine_behaves_like_unknown_code() {
        let repo = seeded_repo().await;
        let code = MachineCode::from("ACO002");

        assert!(repo.deactivate(&code).await.expect("deactivate"));
        assert!(!repo.deactivate(&code).await.expect("second deactivate is a no-op"));

        assert_eq!(repo.find_active_by_code(&code).await.expect("find"), None);
        assert_eq!(repo.find_active_by_code(&MachineCode::from("NOPE")).await.expect("find"), None);
        assert!(repo.list_active().await.expect("list").iter().all(|m| m.code != code));

        let update = repo.update_price(&code, Decimal::from(1)).await;
        assert!(matches!(update, Err(RepositoryError::NotFound(ref c)) if c == "ACO002"));
        assert_eq!(repo.count().await.expect("count"), 25, "rows are never hard-deleted");
    }

    #[tokio::test]
    async fn insert_if_empty_is_idempotent() {
        let repo = seeded_repo().await;

        let second = repo
            .insert_if_empty(CatalogDefinition::agromaq().seed_machines())
            .await
            .expect("second seed");
        assert_eq!(second, 0);
        assert_eq!(repo.count().await.expect("count"), 25);
    }
}
