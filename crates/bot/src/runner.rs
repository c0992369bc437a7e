use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::events::{EventContext, EventDispatcher, HandlerResult, Update};
use crate::messages::Reply;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Chat network access. `next_update` returning `None` ends the stream.
#[async_trait]
pub trait BotTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_update(&self) -> Result<Option<Update>, TransportError>;
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Stands in when no bot token is configured: connects, yields nothing.
#[derive(Default)]
pub struct NoopBotTransport;

#[async_trait]
impl BotTransport for NoopBotTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_update(&self) -> Result<Option<Update>, TransportError> {
        Ok(None)
    }

    async fn send(&self, _chat_id: i64, _reply: &Reply) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Pulls updates and handles each one on its own task, so a slow quotation
/// for one chat never holds up another.
pub struct PollingRunner {
    transport: Arc<dyn BotTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl PollingRunner {
    pub fn new(
        transport: Arc<dyn BotTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        event_name = "bot.transport.failed",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "bot transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "bot transport retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening bot transport connection");
        self.transport.connect().await?;
        info!(attempt, "bot transport connected");

        let mut tasks = JoinSet::new();
        let outcome = loop {
            while tasks.try_join_next().is_some() {}

            let update = match self.transport.next_update().await {
                Ok(Some(update)) => update,
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            };

            info!(
                event_name = "ingress.bot.update_received",
                update_id = update.update_id,
                event_type = ?update.event.event_type(),
                correlation_id = %correlation_id(&update),
                "received bot update"
            );

            let transport = Arc::clone(&self.transport);
            let dispatcher = Arc::clone(&self.dispatcher);
            tasks.spawn(async move { handle_update(transport, dispatcher, update).await });
        };

        while tasks.join_next().await.is_some() {}

        if outcome.is_ok() {
            info!(attempt, "bot update stream closed");
            self.transport.disconnect().await?;
        }
        outcome
    }
}

fn correlation_id(update: &Update) -> String {
    format!("update-{}", update.update_id)
}

async fn handle_update(
    transport: Arc<dyn BotTransport>,
    dispatcher: Arc<EventDispatcher>,
    update: Update,
) {
    let context = EventContext { correlation_id: correlation_id(&update) };
    let reply = match dispatcher.dispatch(&update, &context).await {
        Ok(HandlerResult::Responded(reply)) => reply,
        Ok(HandlerResult::Ignored) => {
            debug!(correlation_id = %context.correlation_id, "bot update ignored");
            return;
        }
        Err(error) => {
            warn!(
                correlation_id = %context.correlation_id,
                error = %error,
                "update dispatch failed; continuing bot loop"
            );
            return;
        }
    };

    let Some(chat_id) = update.chat_id() else {
        return;
    };
    if let Err(error) = transport.send(chat_id, &reply).await {
        warn!(
            event_name = "egress.bot.reply_failed",
            correlation_id = %context.correlation_id,
            chat_id,
            error = %error,
            "failed to send bot reply"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::{Mutex, Notify};

    use agromaq_core::domain::machine::{Machine, MachineCode};
    use agromaq_core::domain::quotation::QuotationRequest;

    use super::{BotTransport, PollingRunner, ReconnectPolicy, TransportError};
    use crate::commands::{
        BotCommandService, CommandEnvelope, CommandRouteError, IncomingMessage, PriceChange,
        QuotationDocument, RouterSettings,
    };
    use crate::events::{command_dispatcher, EventDispatcher, Update};
    use crate::messages::Reply;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        updates: VecDeque<Result<Option<Update>, TransportError>>,
        connect_attempts: usize,
        sent: Vec<(i64, Reply)>,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            updates: Vec<Result<Option<Update>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    updates: updates.into(),
                    ..ScriptedState::default()
                }),
            }
        }
    }

    #[async_trait]
    impl BotTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_update(&self) -> Result<Option<Update>, TransportError> {
            let mut state = self.state.lock().await;
            state.updates.pop_front().unwrap_or(Ok(None))
        }

        async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), TransportError> {
            self.state.lock().await.sent.push((chat_id, reply.clone()));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            self.state.lock().await.disconnect_calls += 1;
            Ok(())
        }
    }

    fn command(update_id: i64, chat_id: i64, text: &str) -> Update {
        Update::from_message(
            update_id,
            IncomingMessage {
                chat_id,
                user_id: chat_id,
                username: None,
                message_id: update_id,
                text: text.to_owned(),
            },
        )
    }

    /// Blocks quotations until released; listings answer immediately.
    struct GatedService {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl BotCommandService for GatedService {
        async fn list_machines(&self) -> Result<Vec<Machine>, CommandRouteError> {
            Ok(Vec::new())
        }

        async fn generate_quotation(
            &self,
            request: QuotationRequest,
            _envelope: &CommandEnvelope,
        ) -> Result<QuotationDocument, CommandRouteError> {
            self.gate.notified().await;
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

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(command(1, 5, "/start"))), Ok(None)],
        ));

        let runner = PollingRunner::new(
            transport.clone(),
            command_dispatcher(
                GatedService { gate: Arc::new(Notify::new()) },
                RouterSettings::default(),
            ),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should not fail");

        let state = transport.state.lock().await;
        assert_eq!(state.connect_attempts, 2);
        assert_eq!(state.sent.len(), 1);
        assert_eq!(state.sent[0].0, 5);
        assert_eq!(state.disconnect_calls, 1);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner = PollingRunner::new(
            transport.clone(),
            EventDispatcher::default(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.state.lock().await.connect_attempts, 3);
    }

    #[tokio::test]
    async fn slow_command_does_not_block_other_chats() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(command(1, 100, "/cotizar ACO001 20-1 Ana 341"))),
                Ok(Some(command(2, 200, "/listar_maquinas"))),
            ],
        ));

        let runner = Arc::new(PollingRunner::new(
            transport.clone(),
            command_dispatcher(GatedService { gate: gate.clone() }, RouterSettings::default()),
            ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
        ));
        let run = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.start().await }
        });

        let mut listing_first = false;
        for _ in 0..200 {
            let state = transport.state.lock().await;
            if let Some((chat_id, _)) = state.sent.first() {
                listing_first = *chat_id == 200;
                break;
            }
            drop(state);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(listing_first, "the listing for chat 200 should be answered while chat 100 waits");

        gate.notify_one();
        run.await.expect("join").expect("runner");

        let state = transport.state.lock().await;
        assert_eq!(state.sent.len(), 2);
        assert_eq!(state.sent[1].0, 100);
    }
}
