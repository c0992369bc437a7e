//! Quotation pipeline shared by the HTTP API and the chat bot.

use std::sync::Arc;

use agromaq_core::clock::Clock;
use agromaq_core::cpq::catalog::CatalogDefinition;
use agromaq_core::cpq::pricing::{DeterministicPricingEngine, PricingEngine, PricingInput};
use agromaq_core::domain::machine::{Machine, MachineCode};
use agromaq_core::domain::quotation::{NewQuotation, Quotation, QuotationRequest, QuotationStats};
use agromaq_core::errors::{ApplicationError, DomainError};
use agromaq_db::repositories::{MachineRepository, QuotationRepository};
use rust_decimal::Decimal;
use tracing::{error, info};

use crate::pdf::{DocumentRenderer, RenderedDocument};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedQuotation {
    pub quotation: Quotation,
    pub machine: Machine,
    pub document: RenderedDocument,
}

impl GeneratedQuotation {
    /// `cotizacion-<client-name>-<code>.pdf`, or `.html` for a degraded document.
    pub fn filename(&self) -> String {
        format!(
            "cotizacion-{}-{}.{}",
            self.quotation.client.file_slug(),
            self.quotation.machine_code,
            self.document.extension()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceUpdate {
    pub machine: Machine,
    pub previous_price: Decimal,
}

pub struct QuotationService {
    machines: Arc<dyn MachineRepository>,
    quotations: Arc<dyn QuotationRepository>,
    pricing: Arc<dyn PricingEngine>,
    renderer: Arc<DocumentRenderer>,
    catalog: Arc<CatalogDefinition>,
    clock: Arc<dyn Clock>,
}

impl QuotationService {
    pub fn new(
        machines: Arc<dyn MachineRepository>,
        quotations: Arc<dyn QuotationRepository>,
        renderer: Arc<DocumentRenderer>,
        catalog: Arc<CatalogDefinition>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            machines,
            quotations,
            pricing: Arc::new(DeterministicPricingEngine),
            renderer,
            catalog,
            clock,
        }
    }

    pub fn catalog(&self) -> &CatalogDefinition {
        &self.catalog
    }

    pub async fn list_machines(&self) -> Result<Vec<Machine>, ApplicationError> {
        Ok(self.machines.list_active().await?)
    }

    pub async fn get_machine(&self, code: &MachineCode) -> Result<Machine, ApplicationError> {
        self.machines
            .find_active_by_code(code)
            .await?
            .ok_or_else(|| DomainError::MachineNotFound { code: code.to_string() }.into())
    }

    /// Looks up the machine, prices it, stores the record, then renders.
    ///
    /// A render failure after the record was stored is reported as
    /// [`ApplicationError::PartialSuccess`]; the record is kept.
    pub async fn generate(
        &self,
        request: QuotationRequest,
        correlation_id: &str,
    ) -> Result<GeneratedQuotation, ApplicationError> {
        let machine = self.get_machine(&request.machine_code).await?;
        let pricing = self.pricing.price(&PricingInput {
            base_price: machine.price,
            discount_percent: request.discount_percent,
        })?;

        let quotation = self
            .quotations
            .append(NewQuotation::priced(&request, &pricing), self.clock.now())
            .await
            .map_err(|storage_error| {
                error!(
                    event_name = "quotation.store_failed",
                    correlation_id,
                    machine_code = %request.machine_code,
                    error = %storage_error,
                    "failed to store quotation"
                );
                ApplicationError::from(storage_error)
            })?;

        info!(
            event_name = "quotation.created",
            correlation_id,
            quotation_id = quotation.id.0,
            machine_code = %quotation.machine_code,
            discount_applied = quotation.discount_applied,
            "quotation stored"
        );

        let document = self
            .renderer
            .render(&machine, &quotation.client, quotation.final_price)
            .await
            .map_err(|render_error| {
                error!(
                    event_name = "quotation.render_failed",
                    correlation_id,
                    quotation_id = quotation.id.0,
                    error = %render_error,
                    "quotation stored but document rendering failed"
                );
                ApplicationError::PartialSuccess {
                    quotation_id: quotation.id.0,
                    reason: render_error.to_string(),
                }
            })?;

        Ok(GeneratedQuotation { quotation, machine, document })
    }

    pub async fn update_price(
        &self,
        code: &MachineCode,
        price: Decimal,
        correlation_id: &str,
    ) -> Result<PriceUpdate, ApplicationError> {
        if price <= Decimal::ZERO {
            return Err(DomainError::Validation(format!("price must be positive, got {price}"))
                .into());
        }

        let previous_price = self.get_machine(code).await?.price;
        let machine = self.machines.update_price(code, price).await?;

        info!(
            event_name = "catalog.price_updated",
            correlation_id,
            machine_code = %code,
            previous_price = %previous_price,
            price = %machine.price,
            "machine price updated"
        );

        Ok(PriceUpdate { machine, previous_price })
    }

    pub async fn list_quotations(&self) -> Result<Vec<Quotation>, ApplicationError> {
        Ok(self.quotations.list_all().await?)
    }

    pub async fn stats(&self) -> Result<QuotationStats, ApplicationError> {
        let total = self.quotations.count_all().await?;
        let discounted = self.quotations.count_with_discount().await?;
        Ok(QuotationStats::from_counts(total, discounted))
    }
}
