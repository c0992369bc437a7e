use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use agromaq_core::domain::machine::{Machine, MachineCode};
use agromaq_core::domain::quotation::{NewQuotation, Quotation, QuotationId};

use super::{MachineRepository, QuotationRepository, RepositoryError};

/// Vec-backed store; insertion order doubles as listing order.
#[derive(Default)]
pub struct InMemoryMachineRepository {
    machines: RwLock<Vec<Machine>>,
}

impl InMemoryMachineRepository {
    pub fn with_machines(machines: Vec<Machine>) -> Self {
        Self { machines: RwLock::new(machines) }
    }
}

#[async_trait::async_trait]
impl MachineRepository for InMemoryMachineRepository {
    async fn list_active(&self) -> Result<Vec<Machine>, RepositoryError> {
        let machines = self.machines.read().await;
        Ok(machines.iter().filter(|machine| machine.active).cloned().collect())
    }

    async fn find_active_by_code(
        &self,
        code: &MachineCode,
    ) -> Result<Option<Machine>, RepositoryError> {
        let machines = self.machines.read().await;
        Ok(machines.iter().find(|machine| machine.active && &machine.code == code).cloned())
    }

    async fn update_price(
        &self,
        code: &MachineCode,
        price: Decimal,
    ) -> Result<Machine, RepositoryError> {
        let mut machines = self.machines.write().await;
        let machine = machines
            .iter_mut()
            .find(|machine| machine.active && &machine.code == code)
            .ok_or_else(|| RepositoryError::NotFound(code.to_string()))?;
        machine.price = price;
        Ok(machine.clone())
    }

    async fn deactivate(&self, code: &MachineCode) -> Result<bool, RepositoryError> {
        let mut machines = self.machines.write().await;
        match machines.iter_mut().find(|machine| machine.active && &machine.code == code) {
            Some(machine) => {
                machine.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.machines.read().await.len() as u64)
    }

    async fn insert_if_empty(&self, machines: Vec<Machine>) -> Result<usize, RepositoryError> {
        let mut stored = self.machines.write().await;
        if !stored.is_empty() {
            return Ok(0);
        }
        let inserted = machines.len();
        *stored = machines;
        Ok(inserted)
    }
}

#[derive(Default)]
pub struct InMemoryQuotationRepository {
    quotations: RwLock<Vec<Quotation>>,
}

#[async_trait::async_trait]
impl QuotationRepository for InMemoryQuotationRepository {
    async fn append(
        &self,
        quotation: NewQuotation,
        created_at: DateTime<Utc>,
    ) -> Result<Quotation, RepositoryError> {
        let mut quotations = self.quotations.write().await;
        let id = QuotationId(quotations.len() as i64 + 1);
        let record = quotation.into_record(id, created_at);
        quotations.push(record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<Quotation>, RepositoryError> {
        let mut quotations = self.quotations.read().await.clone();
        quotations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(quotations)
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        Ok(self.quotations.read().await.len() as u64)
    }

    async fn count_with_discount(&self) -> Result<u64, RepositoryError> {
        let quotations = self.quotations.read().await;
        Ok(quotations.iter().filter(|quotation| quotation.discount_applied).count() as u64)
    }
}
