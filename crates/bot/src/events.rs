use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    commands::{
        normalize_command, BotCommandService, CommandParseError, CommandRouter, IncomingMessage,
        RouterSettings,
    },
    messages::Reply,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    pub event: BotEvent,
}

impl Update {
    /// Text starting with `/` is a command; anything else is chatter.
    pub fn from_message(update_id: i64, message: IncomingMessage) -> Self {
        let event = if message.text.trim_start().starts_with('/') {
            BotEvent::Command(message)
        } else {
            BotEvent::Message(message)
        };
        Self { update_id, event }
    }

    pub fn chat_id(&self) -> Option<i64> {
        match &self.event {
            BotEvent::Command(message) | BotEvent::Message(message) => Some(message.chat_id),
            BotEvent::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotEvent {
    Command(IncomingMessage),
    Message(IncomingMessage),
    Unsupported { kind: String },
}

impl BotEvent {
    pub fn event_type(&self) -> BotEventType {
        match self {
            Self::Command(_) => BotEventType::Command,
            Self::Message(_) => BotEventType::Message,
            Self::Unsupported { .. } => BotEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotEventType {
    Command,
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Reply),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> BotEventType;
    async fn handle(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<BotEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&update.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(update, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with the command handler registered; plain chatter is ignored.
pub fn command_dispatcher<S>(service: S, settings: RouterSettings) -> EventDispatcher
where
    S: BotCommandService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandHandler::new(service, settings));
    dispatcher
}

pub struct CommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> CommandHandler<S>
where
    S: BotCommandService,
{
    pub fn new(service: S, settings: RouterSettings) -> Self {
        Self { router: CommandRouter::new(service, settings) }
    }
}

#[async_trait]
impl<S> EventHandler for CommandHandler<S>
where
    S: BotCommandService + 'static,
{
    fn event_type(&self) -> BotEventType {
        BotEventType::Command
    }

    async fn handle(
        &self,
        update: &Update,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let BotEvent::Command(message) = &update.event else {
            return Ok(HandlerResult::Ignored);
        };

        let envelope = normalize_command(message.clone())?;
        let reply = self.router.route(envelope).await;
        Ok(if reply.is_empty() { HandlerResult::Ignored } else { HandlerResult::Responded(reply) })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use agromaq_core::domain::machine::{Machine, MachineCode};
    use agromaq_core::domain::quotation::QuotationRequest;

    use super::{command_dispatcher, BotEvent, EventContext, HandlerResult, Update};
    use crate::commands::{
        BotCommandService, CommandEnvelope, CommandRouteError, IncomingMessage, PriceChange,
        QuotationDocument, RouterSettings,
    };
    use crate::messages::Reply;

    struct EmptyCatalog;

    #[async_trait::async_trait]
    impl BotCommandService for EmptyCatalog {
        async fn list_machines(&self) -> Result<Vec<Machine>, CommandRouteError> {
            Ok(Vec::new())
        }

        async fn generate_quotation(
            &self,
            request: QuotationRequest,
            _envelope: &CommandEnvelope,
        ) -> Result<QuotationDocument, CommandRouteError> {
            Err(CommandRouteError::NotFound { code: request.machine_code.to_string() })
        }

        async fn update_price(
            &self,
            code: &MachineCode,
            _price: Decimal,
        ) -> Result<PriceChange, CommandRouteError> {
            Err(CommandRouteError::NotFound { code: code.to_string() })
        }
    }

    fn message(text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: 10,
            user_id: 20,
            username: None,
            message_id: 30,
            text: text.to_owned(),
        }
    }

    #[test]
    fn updates_are_classified_by_leading_slash() {
        assert!(matches!(Update::from_message(1, message("/start")).event, BotEvent::Command(_)));
        assert!(matches!(Update::from_message(2, message("hola")).event, BotEvent::Message(_)));
        assert_eq!(Update::from_message(3, message("hola")).chat_id(), Some(10));
    }

    #[tokio::test]
    async fn commands_are_answered_and_chatter_is_ignored() {
        let dispatcher = command_dispatcher(EmptyCatalog, RouterSettings::default());
        assert_eq!(dispatcher.handler_count(), 1);
        let ctx = EventContext::default();

        let listed = dispatcher
            .dispatch(&Update::from_message(1, message("/listar_maquinas")), &ctx)
            .await
            .expect("dispatch");
        assert!(matches!(
            listed,
            HandlerResult::Responded(Reply::Messages(ref messages))
                if messages[0].text == "No hay máquinas disponibles."
        ));

        let chatter = dispatcher
            .dispatch(&Update::from_message(2, message("buen día")), &ctx)
            .await
            .expect("dispatch");
        assert_eq!(chatter, HandlerResult::Ignored);

        let unsupported = dispatcher
            .dispatch(
                &Update { update_id: 3, event: BotEvent::Unsupported { kind: "sticker".to_owned() } },
                &ctx,
            )
            .await
            .expect("dispatch");
        assert_eq!(unsupported, HandlerResult::Ignored);
    }
}
