//! A running chat session.
//!
//! Wires the directory, ledger, transport, dispatcher and listener together
//! for one node, and turns input lines into destination changes or sends.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use lnchat_lnd::NodeServices;
use lnchat_shared::NodeId;

use crate::directory::AliasDirectory;
use crate::dispatcher::{DispatchHandle, DispatchSettings, PaymentDispatcher};
use crate::error::{ListenerError, SessionError};
use crate::events::LedgerEvent;
use crate::ledger::{ConversationLedger, LedgerSnapshot};
use crate::listener::InvoiceListener;
use crate::transcript_log::TranscriptLog;
use crate::transport::{transport_for, ProtocolKind};

/// Session-wide settings.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    pub dispatch: DispatchSettings,
    pub protocol: ProtocolKind,
    /// Append every sent and received message here.
    pub log_file: Option<PathBuf>,
}

/// What an input line did.
#[derive(Debug)]
pub enum InputOutcome {
    Empty,
    DestinationChanged(NodeId),
    Sent(DispatchHandle),
}

pub struct ChatSession {
    directory: Arc<AliasDirectory>,
    ledger: ConversationLedger,
    dispatcher: PaymentDispatcher,
    listener: Option<JoinHandle<Result<(), ListenerError>>>,
    log_task: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Build the directory, open the invoice subscription and start the
    /// background tasks. Any failure here means no session.
    pub async fn start(
        services: NodeServices,
        config: ChatConfig,
        initial_recipient: Option<&str>,
    ) -> Result<Self, SessionError> {
        let directory = Arc::new(AliasDirectory::fetch(services.lightning.as_ref()).await?);
        let self_id = directory.self_id();
        let ledger = ConversationLedger::new();

        if let Some(recipient) = initial_recipient {
            ledger.set_destination(directory.resolve(recipient)?);
        }

        let transport = transport_for(config.protocol, services.signer.clone(), self_id);
        let listener = InvoiceListener::subscribe(
            services.lightning.as_ref(),
            transport.clone(),
            ledger.clone(),
        )
        .await?;

        let log_task = match &config.log_file {
            Some(path) => {
                let log = TranscriptLog::open(path, directory.clone()).await?;
                Some(tokio::spawn(log.run(ledger.subscribe())))
            }
            None => None,
        };

        let listener = tokio::spawn(listener.run());

        let dispatcher = PaymentDispatcher::new(
            services.router.clone(),
            transport,
            ledger.clone(),
            self_id,
            config.dispatch,
        );

        info!(
            self_id = %self_id,
            alias = %directory.display_name(&self_id),
            protocol = %config.protocol,
            min_amount_msat = config.dispatch.min_amount_msat,
            "Chat session started"
        );

        Ok(Self {
            directory,
            ledger,
            dispatcher,
            listener: Some(listener),
            log_task,
        })
    }

    /// `/<key or alias>` switches destination; anything else is sent to the
    /// current destination.
    pub async fn handle_input(&self, line: &str) -> Result<InputOutcome, SessionError> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Ok(InputOutcome::Empty);
        }

        if let Some(target) = line.strip_prefix('/') {
            let destination = self.directory.resolve(target)?;
            self.ledger.set_destination(destination);
            return Ok(InputOutcome::DestinationChanged(destination));
        }

        let destination = self
            .ledger
            .current_destination()
            .ok_or(SessionError::NoDestination)?;
        let handle = self.dispatcher.dispatch(destination, line).await?;
        Ok(InputOutcome::Sent(handle))
    }

    /// Hand over the listener task so the caller can watch for it ending.
    pub fn take_listener(&mut self) -> Option<JoinHandle<Result<(), ListenerError>>> {
        self.listener.take()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.ledger.subscribe()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    pub fn ledger(&self) -> &ConversationLedger {
        &self.ledger
    }

    pub fn directory(&self) -> &AliasDirectory {
        &self.directory
    }

    pub fn self_id(&self) -> NodeId {
        self.directory.self_id()
    }

    /// Stop the background tasks. In-flight payments keep being tracked
    /// until their streams end.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some(log_task) = self.log_task.take() {
            log_task.abort();
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
