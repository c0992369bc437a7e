//! Chat bot interface for Agromaq quotations
//!
//! This crate turns chat commands into catalog and quotation calls:
//! - **Commands** (`commands`) - `/listar_maquinas`, `/cotizar`, `/set_price`, `/start`, `/ayuda`
//! - **Events** (`events`) - inbound updates routed to handlers
//! - **Messages** (`messages`) - reply templates, catalog listing, attachments
//! - **Runner** (`runner`) - polling loop with reconnection, one task per update
//!
//! # Architecture
//!
//! ```text
//! Transport → PollingRunner → EventDispatcher → CommandRouter → BotCommandService
//!                                                      ↓
//!                                           Reply (text / document) → Transport
//! ```
//!
//! The chat transport itself stays behind [`runner::BotTransport`]; the server
//! crate supplies the [`commands::BotCommandService`] backed by the quotation
//! pipeline.

pub mod commands;
pub mod events;
pub mod messages;
pub mod runner;
