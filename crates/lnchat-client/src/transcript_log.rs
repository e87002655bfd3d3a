//! Append-only plain-text log of sent and received messages.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::directory::AliasDirectory;
use crate::events::LedgerEvent;
use crate::ledger::ChatMessage;

pub struct TranscriptLog {
    file: File,
    directory: Arc<AliasDirectory>,
}

impl TranscriptLog {
    pub async fn open(path: &Path, directory: Arc<AliasDirectory>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        debug!(path = %path.display(), "Transcript log opened");
        Ok(Self { file, directory })
    }

    pub async fn write_message(&mut self, message: &ChatMessage) -> std::io::Result<()> {
        let name = self.directory.display_name(&message.sender);
        let line = format_line(message.timestamp.with_timezone(&Local), &name, &message.text);
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await
    }

    /// Write every message added to the ledger until the ledger is dropped.
    pub async fn run(mut self, mut events: broadcast::Receiver<LedgerEvent>) {
        loop {
            match events.recv().await {
                Ok(LedgerEvent::MessageAdded { message, .. }) => {
                    if let Err(e) = self.write_message(&message).await {
                        warn!(error = %e, "Failed to write transcript log");
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Transcript log fell behind; lines dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

pub fn format_line(at: DateTime<Local>, name: &str, text: &str) -> String {
    format!("{} {:<16} {}\n", at.format("%Y-%m-%d %H:%M:%S%.6f"), name, text)
}
