use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use agromaq_core::domain::machine::{Machine, MachineCode};
use agromaq_core::domain::quotation::{NewQuotation, Quotation};
use agromaq_core::errors::{ApplicationError, DomainError};

pub mod machine;
pub mod memory;
pub mod quotation;

pub use machine::SqlMachineRepository;
pub use memory::{InMemoryMachineRepository, InMemoryQuotationRepository};
pub use quotation::SqlQuotationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("machine `{0}` not found")]
    NotFound(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(code) => DomainError::MachineNotFound { code }.into(),
            other => ApplicationError::Storage(other.to_string()),
        }
    }
}

/// Catalog Store. Inactive machines are invisible to every read and write
/// except `deactivate` itself.
#[async_trait]
pub trait MachineRepository: Send + Sync {
    /// Active machines in insertion order.
    async fn list_active(&self) -> Result<Vec<Machine>, RepositoryError>;

    async fn find_active_by_code(
        &self,
        code: &MachineCode,
    ) -> Result<Option<Machine>, RepositoryError>;

    /// Overwrites the list price. No price history is kept.
    async fn update_price(
        &self,
        code: &MachineCode,
        price: Decimal,
    ) -> Result<Machine, RepositoryError>;

    /// Returns `false` when no active machine carried `code`.
    async fn deactivate(&self, code: &MachineCode) -> Result<bool, RepositoryError>;

    /// Counts every row, active or not.
    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Inserts `machines` only when the store holds no rows at all, returning
    /// how many were inserted. The emptiness check and the inserts share one
    /// transaction.
    async fn insert_if_empty(&self, machines: Vec<Machine>) -> Result<usize, RepositoryError>;
}

/// Quotation Record Store. Records are append-only.
#[async_trait]
pub trait QuotationRepository: Send + Sync {
    async fn append(
        &self,
        quotation: NewQuotation,
        created_at: DateTime<Utc>,
    ) -> Result<Quotation, RepositoryError>;

    /// Newest first.
    async fn list_all(&self) -> Result<Vec<Quotation>, RepositoryError>;

    async fn count_all(&self) -> Result<u64, RepositoryError>;

    async fn count_with_discount(&self) -> Result<u64, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use agromaq_core::errors::{ApplicationError, DomainError};

    use super::RepositoryError;

    #[test]
    fn not_found_maps_to_machine_not_found() {
        let error = ApplicationError::from(RepositoryError::NotFound("ACO999".to_owned()));
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::MachineNotFound { code: "ACO999".to_owned() })
        );
    }

    #[test]
    fn database_failures_map_to_storage() {
        let error = ApplicationError::from(RepositoryError::Database(sqlx::Error::PoolClosed));
        assert!(matches!(error, ApplicationError::Storage(ref message) if message.contains("database error")));
    }
}
