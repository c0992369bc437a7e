use std::sync::Arc;

use agromaq_bot::commands::{
    BotCommandService, CommandEnvelope, CommandRouteError, PriceChange, QuotationDocument,
};
use agromaq_bot::messages::Attachment;
use agromaq_core::domain::machine::{Machine, MachineCode};
use agromaq_core::domain::quotation::QuotationRequest;
use agromaq_core::errors::{ApplicationError, DomainError};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::quotation::QuotationService;

/// Chat commands backed by the same quotation pipeline as the HTTP API.
#[derive(Clone)]
pub struct QuotationBotService {
    service: Arc<QuotationService>,
}

impl QuotationBotService {
    pub fn new(service: Arc<QuotationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl BotCommandService for QuotationBotService {
    async fn list_machines(&self) -> Result<Vec<Machine>, CommandRouteError> {
        self.service.list_machines().await.map_err(route_error)
    }

    async fn generate_quotation(
        &self,
        request: QuotationRequest,
        envelope: &CommandEnvelope,
    ) -> Result<QuotationDocument, CommandRouteError> {
        let generated =
            self.service.generate(request, &envelope.request_id).await.map_err(route_error)?;
        let attachment = Attachment {
            filename: generated.filename(),
            content_type: generated.document.content_type().to_owned(),
            bytes: generated.document.into_bytes(),
        };

        Ok(QuotationDocument {
            quotation: generated.quotation,
            machine: generated.machine,
            attachment,
        })
    }

    async fn update_price(
        &self,
        code: &MachineCode,
        price: Decimal,
    ) -> Result<PriceChange, CommandRouteError> {
        let update = self.service.update_price(code, price, "bot").await.map_err(route_error)?;
        Ok(PriceChange { machine: update.machine, previous_price: update.previous_price })
    }
}

fn route_error(error: ApplicationError) -> CommandRouteError {
    match error {
        ApplicationError::Domain(DomainError::MachineNotFound { code }) => {
            CommandRouteError::NotFound { code }
        }
        ApplicationError::Domain(DomainError::Validation(message)) => {
            CommandRouteError::Validation(message)
        }
        other => CommandRouteError::Service(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use agromaq_bot::commands::{CommandEnvelope, CommandRouter, RouterSettings};
    use agromaq_bot::messages::Reply;
    use agromaq_db::repositories::QuotationRepository;
    use rust_decimal::Decimal;

    use super::QuotationBotService;
    use crate::quotation::tests::{service_with, trailer};

    fn envelope(verb: &str, args: &[&str], user_id: i64) -> CommandEnvelope {
        CommandEnvelope {
            verb: verb.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            chat_id: 77,
            user_id,
            username: Some("vendedor".to_owned()),
            request_id: "chat-77-1".to_owned(),
        }
    }

    fn settings() -> RouterSettings {
        RouterSettings { admin_ids: vec![1], discount_percent: Decimal::from(10) }
    }

    #[tokio::test]
    async fn cotizar_stores_record_and_attaches_document() {
        let (service, quotations) = service_with(vec![trailer("ACO001", 25_000, true)]);
        let router =
            CommandRouter::new(QuotationBotService::new(Arc::new(service)), settings());

        let reply = router
            .route(envelope(
                "cotizar",
                &["ACO001", "20-12345678-9", "\"Juan", "Pérez\"", "+5411", "--descuento"],
                9,
            ))
            .await;

        let Reply::Document { attachment, .. } = reply else {
            panic!("expected a document reply, got {reply:?}");
        };
        assert_eq!(attachment.filename, "cotizacion-Juan-Pérez-ACO001.html");
        assert!(!attachment.bytes.is_empty());

        let stored = quotations.list_all().await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].final_price, Decimal::from(22_500));
        assert_eq!(
            stored[0].client.notes.as_deref(),
            Some("Cotización generada via Telegram por @vendedor")
        );
    }

    #[tokio::test]
    async fn set_price_by_admin_reaches_the_catalog() {
        let (service, _) = service_with(vec![trailer("ACO001", 25_000, true)]);
        let service = Arc::new(service);
        let router = CommandRouter::new(QuotationBotService::new(service.clone()), settings());

        let reply = router.route(envelope("set_price", &["ACO001", "30000"], 1)).await;

        assert!(matches!(reply, Reply::Messages(ref messages) if messages.len() == 1));
        let machine = service.get_machine(&"ACO001".into()).await.expect("machine");
        assert_eq!(machine.price, Decimal::from(30_000));
    }
}
