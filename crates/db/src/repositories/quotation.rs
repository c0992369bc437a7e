use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use agromaq_core::domain::client::ClientInfo;
use agromaq_core::domain::machine::MachineCode;
use agromaq_core::domain::quotation::{NewQuotation, Quotation, QuotationId};

use super::machine::parse_decimal;
use super::{QuotationRepository, RepositoryError};
use crate::DbPool;

const QUOTATION_COLUMNS: &str = "id, machine_code, client_cuit, client_name, client_phone,
     client_address, client_email, client_company, notes, discount_applied,
     discount_percent, base_price, final_price, created_at";

/// Timestamps are written with fixed-width nanoseconds so that text order
/// matches chronological order.
pub struct SqlQuotationRepository {
    pool: DbPool,
}

impl SqlQuotationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_quotation(row: &sqlx::sqlite::SqliteRow) -> Result<Quotation, RepositoryError> {
    let created_at_str: String = decode(row, "created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid created_at: {e}")))?;

    let discount_percent: String = decode(row, "discount_percent")?;
    let base_price: String = decode(row, "base_price")?;
    let final_price: String = decode(row, "final_price")?;

    Ok(Quotation {
        id: QuotationId(decode(row, "id")?),
        machine_code: MachineCode(decode(row, "machine_code")?),
        client: ClientInfo {
            cuit: decode(row, "client_cuit")?,
            name: decode(row, "client_name")?,
            phone: decode(row, "client_phone")?,
            address: decode(row, "client_address")?,
            email: decode(row, "client_email")?,
            company: decode(row, "client_company")?,
            notes: decode(row, "notes")?,
        },
        discount_applied: decode(row, "discount_applied")?,
        discount_percent: parse_decimal("discount_percent", &discount_percent)?,
        base_price: parse_decimal("base_price", &base_price)?,
        final_price: parse_decimal("final_price", &final_price)?,
        created_at,
    })
}

fn count_from(row: &sqlx::sqlite::SqliteRow) -> Result<u64, RepositoryError> {
    let count: i64 = decode(row, "count")?;
    Ok(count.max(0) as u64)
}

#[async_trait::async_trait]
impl QuotationRepository for SqlQuotationRepository {
    async fn append(
        &self,
        quotation: NewQuotation,
        created_at: DateTime<Utc>,
    ) -> Result<Quotation, RepositoryError> {
        let client = &quotation.client;
        let result = sqlx::query(
            "INSERT INTO quotation (machine_code, client_cuit, client_name, client_phone,
                                    client_address, client_email, client_company, notes,
                                    discount_applied, discount_percent, base_price,
                                    final_price, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(quotation.machine_code.as_str())
        .bind(&client.cuit)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.email)
        .bind(&client.company)
        .bind(&client.notes)
        .bind(quotation.discount_applied)
        .bind(quotation.discount_percent.to_string())
        .bind(quotation.base_price.to_string())
        .bind(quotation.final_price.to_string())
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .execute(&self.pool)
        .await?;

        let id = QuotationId(result.last_insert_rowid());
        Ok(quotation.into_record(id, created_at))
    }

    async fn list_all(&self) -> Result<Vec<Quotation>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotation ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_quotation).collect::<Result<Vec<_>, _>>()
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM quotation")
            .fetch_one(&self.pool)
            .await?;
        count_from(&row)
    }

    async fn count_with_discount(&self) -> Result<u64, RepositoryError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS count FROM quotation WHERE discount_applied = 1")
                .fetch_one(&self.pool)
                .await?;
        count_from(&row)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use agromaq_core::domain::client::ClientInfo;
    use agromaq_core::domain::machine::MachineCode;
    use agromaq_core::domain::quotation::NewQuotation;

    use super::SqlQuotationRepository;
    use crate::repositories::QuotationRepository;
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlQuotationRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlQuotationRepository::new(pool)
    }

    fn new_quotation(code: &str, discount_percent: i64) -> NewQuotation {
        let base = Decimal::from(25_000);
        let final_price = base - base * Decimal::from(discount_percent) / Decimal::ONE_HUNDRED;
        NewQuotation {
            machine_code: MachineCode::from(code),
            client: ClientInfo::new("20-12345678-9", "Juan Pérez", "+541112345678")
                .with_address("Ruta 178 km 3")
                .with_company("Agro SA"),
            discount_applied: discount_percent > 0,
            discount_percent: Decimal::from(discount_percent),
            base_price: base,
            final_price,
        }
    }

    #[tokio::test]
    async fn appended_record_reads_back_identically() {
        let repo = repo().await;
        let created_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();

        let stored = repo.append(new_quotation("ACO001", 10), created_at).await.expect("append");
        let listed = repo.list_all().await.expect("list");

        assert_eq!(listed, vec![stored.clone()]);
        assert_eq!(stored.final_price, Decimal::from(22_500));
        assert!(stored.discount_applied);
        assert_eq!(stored.client.address.as_deref(), Some("Ruta 178 km 3"));
        assert_eq!(stored.client.email, None);
    }

    #[tokio::test]
    async fn list_all_returns_newest_first() {
        let repo = repo().await;
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let first = repo.append(new_quotation("ACO001", 0), start).await.expect("append");
        let second = repo
            .append(new_quotation("ACO002", 0), start + Duration::hours(1))
            .await
            .expect("append");
        let same_instant = repo
            .append(new_quotation("ACO003", 0), start + Duration::hours(1))
            .await
            .expect("append");

        let ids = repo.list_all().await.expect("list").into_iter().map(|q| q.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![same_instant.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn counts_split_discounted_records() {
        let repo = repo().await;
        let now = Utc::now();

        repo.append(new_quotation("ACO001", 10), now).await.expect("append");
        repo.append(new_quotation("ACO001", 0), now).await.expect("append");
        repo.append(new_quotation("TOL015", 0), now).await.expect("append");

        assert_eq!(repo.count_all().await.expect("count"), 3);
        assert_eq!(repo.count_with_discount().await.expect("count"), 1);
    }
}
