use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};

use agromaq_core::domain::client::ClientInfo;
use agromaq_core::domain::machine::{Machine, MachineCode};
use agromaq_core::domain::quotation::{Quotation, QuotationRequest};

use crate::messages::{self, Attachment, Reply};

const DISCOUNT_FLAG: &str = "--descuento";

/// A chat message addressed to the bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub message_id: i64,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub verb: String,
    pub args: Vec<String>,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    ListMachines,
    Quote { args: Vec<String> },
    SetPrice { args: Vec<String> },
    Unknown { verb: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteArgs {
    pub machine_code: MachineCode,
    pub cuit: String,
    pub name: String,
    pub phone: String,
    pub apply_discount: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetPriceArgs {
    pub machine_code: MachineCode,
    pub price: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("message is not a bot command")]
    NotACommand,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("cotizar needs at least <código> <cuit> <nombre> <teléfono>")]
    QuoteUsage,
    #[error("cotizar is missing the phone number")]
    MissingPhone,
    #[error("set_price needs exactly <código> <precio>")]
    SetPriceUsage,
    #[error("`{0}` is not a valid price")]
    InvalidPrice(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("machine `{code}` not found")]
    NotFound { code: String },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("command service failed: {0}")]
    Service(String),
}

/// Outcome of a successful `/set_price`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceChange {
    pub machine: Machine,
    pub previous_price: Decimal,
}

/// Outcome of a successful `/cotizar`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotationDocument {
    pub quotation: Quotation,
    pub machine: Machine,
    pub attachment: Attachment,
}

#[async_trait]
pub trait BotCommandService: Send + Sync {
    async fn list_machines(&self) -> Result<Vec<Machine>, CommandRouteError>;

    async fn generate_quotation(
        &self,
        request: QuotationRequest,
        envelope: &CommandEnvelope,
    ) -> Result<QuotationDocument, CommandRouteError>;

    async fn update_price(
        &self,
        code: &MachineCode,
        price: Decimal,
    ) -> Result<PriceChange, CommandRouteError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterSettings {
    pub admin_ids: Vec<i64>,
    /// Applied when `/cotizar` carries `--descuento`.
    pub discount_percent: Decimal,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self { admin_ids: Vec::new(), discount_percent: Decimal::from(10) }
    }
}

/// Splits `/verb@bot arg arg` into an envelope. Non-command text is rejected.
pub fn normalize_command(message: IncomingMessage) -> Result<CommandEnvelope, CommandParseError> {
    let text = message.text.trim();
    let Some(rest) = text.strip_prefix('/') else {
        return Err(CommandParseError::NotACommand);
    };

    let mut parts = rest.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let verb = head.split('@').next().unwrap_or_default().to_lowercase();
    if verb.is_empty() {
        return Err(CommandParseError::NotACommand);
    }

    Ok(CommandEnvelope {
        verb,
        args: parts.map(str::to_owned).collect(),
        chat_id: message.chat_id,
        user_id: message.user_id,
        username: message.username,
        request_id: format!("chat-{}-{}", message.chat_id, message.message_id),
    })
}

pub fn classify_command(envelope: &CommandEnvelope) -> BotCommand {
    match envelope.verb.as_str() {
        "start" => BotCommand::Start,
        "ayuda" | "help" => BotCommand::Help,
        "listar_maquinas" => BotCommand::ListMachines,
        "cotizar" => BotCommand::Quote { args: envelope.args.clone() },
        "set_price" => BotCommand::SetPrice { args: envelope.args.clone() },
        other => BotCommand::Unknown { verb: other.to_owned() },
    }
}

/// `<código> <cuit> <nombre> <teléfono> [--descuento]`.
///
/// The name may span several arguments when wrapped in double quotes. The
/// discount flag is accepted anywhere and never counts as a positional
/// argument.
pub fn parse_quote_args(args: &[String]) -> Result<QuoteArgs, ArgumentError> {
    let apply_discount = args.iter().any(|arg| arg == DISCOUNT_FLAG);
    let positional = args.iter().filter(|arg| *arg != DISCOUNT_FLAG).collect::<Vec<_>>();
    if positional.len() < 4 {
        return Err(ArgumentError::QuoteUsage);
    }

    let machine_code = MachineCode(positional[0].clone());
    let cuit = positional[1].clone();

    let (name, phone_index) = if positional[2].starts_with('"') {
        let mut name_parts = Vec::new();
        let mut phone_index = positional.len();
        for (index, arg) in positional.iter().enumerate().skip(2) {
            name_parts.push(arg.trim_matches('"'));
            if arg.ends_with('"') && (index > 2 || arg.len() > 1) {
                phone_index = index + 1;
                break;
            }
        }
        (name_parts.join(" ").trim().to_owned(), phone_index)
    } else {
        (positional[2].clone(), 3)
    };

    let phone = positional.get(phone_index).ok_or(ArgumentError::MissingPhone)?;

    Ok(QuoteArgs { machine_code, cuit, name, phone: (*phone).clone(), apply_discount })
}

pub fn parse_set_price_args(args: &[String]) -> Result<SetPriceArgs, ArgumentError> {
    let [code, raw_price] = args else {
        return Err(ArgumentError::SetPriceUsage);
    };

    let price = Decimal::from_str(raw_price.trim())
        .map_err(|_| ArgumentError::InvalidPrice(raw_price.clone()))?;
    Ok(SetPriceArgs { machine_code: MachineCode(code.clone()), price })
}

pub struct CommandRouter<S> {
    service: S,
    settings: RouterSettings,
}

impl<S> CommandRouter<S>
where
    S: BotCommandService,
{
    pub fn new(service: S, settings: RouterSettings) -> Self {
        Self { service, settings }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.settings.admin_ids.contains(&user_id)
    }

    /// Every failure becomes a reply; nothing here is fatal to the runner.
    pub async fn route(&self, envelope: CommandEnvelope) -> Reply {
        match classify_command(&envelope) {
            BotCommand::Start => Reply::message(messages::welcome_message(self.is_admin(envelope.user_id))),
            BotCommand::Help => Reply::message(messages::help_message(
                self.is_admin(envelope.user_id),
                self.settings.discount_percent,
            )),
            BotCommand::ListMachines => self.list_machines(&envelope).await,
            BotCommand::Quote { args } => self.quote(&args, &envelope).await,
            BotCommand::SetPrice { args } => self.set_price(&args, &envelope).await,
            BotCommand::Unknown { verb } => Reply::message(messages::unknown_command_message(&verb)),
        }
    }

    async fn list_machines(&self, envelope: &CommandEnvelope) -> Reply {
        match self.service.list_machines().await {
            Ok(machines) => Reply::Messages(messages::machine_catalog_messages(&machines)),
            Err(route_error) => {
                error!(
                    event_name = "bot.list_machines.failed",
                    correlation_id = %envelope.request_id,
                    error = %route_error,
                    "could not list machines"
                );
                Reply::message(messages::catalog_unavailable_message())
            }
        }
    }

    async fn quote(&self, args: &[String], envelope: &CommandEnvelope) -> Reply {
        let args = match parse_quote_args(args) {
            Ok(args) => args,
            Err(ArgumentError::MissingPhone) => {
                return Reply::message(messages::missing_phone_message())
            }
            Err(_) => {
                return Reply::message(messages::quote_usage_message(
                    self.settings.discount_percent,
                ))
            }
        };

        let discount_percent =
            if args.apply_discount { self.settings.discount_percent } else { Decimal::ZERO };
        let notes = format!(
            "Cotización generada via Telegram por @{}",
            envelope.username.as_deref().unwrap_or("usuario")
        );
        let request = QuotationRequest {
            machine_code: args.machine_code.clone(),
            client: ClientInfo::new(&args.cuit, &args.name, &args.phone).with_notes(notes),
            discount_percent,
        };

        match self.service.generate_quotation(request, envelope).await {
            Ok(document) => {
                info!(
                    event_name = "bot.quotation.sent",
                    correlation_id = %envelope.request_id,
                    machine_code = %document.machine.code,
                    quotation_id = document.quotation.id.0,
                    "quotation generated via bot"
                );
                let caption = messages::quotation_caption(
                    &document.machine,
                    &document.quotation.client.name,
                    &document.quotation.client.cuit,
                    document.quotation.final_price,
                    document.quotation.discount_applied.then_some(document.quotation.discount_percent),
                );
                Reply::Document { attachment: document.attachment, caption }
            }
            Err(CommandRouteError::NotFound { code }) => {
                Reply::message(messages::machine_not_found_message(&code))
            }
            Err(route_error) => {
                error!(
                    event_name = "bot.quotation.failed",
                    correlation_id = %envelope.request_id,
                    machine_code = %args.machine_code,
                    error = %route_error,
                    "error generating quote"
                );
                Reply::message(messages::quotation_failed_message())
            }
        }
    }

    async fn set_price(&self, args: &[String], envelope: &CommandEnvelope) -> Reply {
        if !self.is_admin(envelope.user_id) {
            warn!(
                event_name = "bot.set_price.forbidden",
                correlation_id = %envelope.request_id,
                user_id = envelope.user_id,
                "non-admin attempted a price update"
            );
            return Reply::message(messages::forbidden_message());
        }

        let args = match parse_set_price_args(args) {
            Ok(args) => args,
            Err(ArgumentError::InvalidPrice(_)) => {
                return Reply::message(messages::invalid_price_message())
            }
            Err(_) => return Reply::message(messages::set_price_usage_message()),
        };

        match self.service.update_price(&args.machine_code, args.price).await {
            Ok(change) => {
                info!(
                    event_name = "bot.set_price.updated",
                    correlation_id = %envelope.request_id,
                    machine_code = %change.machine.code,
                    "machine price updated via bot"
                );
                Reply::message(messages::price_updated_message(&change.machine, change.previous_price))
            }
            Err(CommandRouteError::NotFound { code }) => {
                Reply::message(messages::machine_not_found_message(&code))
            }
            Err(CommandRouteError::Validation(_)) => {
                Reply::message(messages::invalid_price_message())
            }
            Err(route_error) => {
                error!(
                    event_name = "bot.set_price.failed",
                    correlation_id = %envelope.request_id,
                    machine_code = %args.machine_code,
                    error = %route_error,
                    "error updating price"
                );
                Reply::message(messages::price_update_failed_message())
            }
        }
    }
}
