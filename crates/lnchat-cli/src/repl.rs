//! Interactive chat loop.
//!
//! Reads lines from stdin and prints ledger events as they are committed.
//! Exits on EOF or Ctrl+C, and with an error if the inbound path hits a
//! fatal failure.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, warn};

use lnchat_client::{ChatSession, InputOutcome, ListenerError};

use crate::output;

type ListenerTask = JoinHandle<Result<(), ListenerError>>;

pub async fn run(mut session: ChatSession) -> Result<()> {
    let mut events = session.subscribe();
    let mut listener = session.take_listener();

    match session.ledger().current_destination() {
        Some(destination) => println!(
            "-- Send to {} [balance: {} msat]",
            session.directory().display_name(&destination),
            session.ledger().balance(&destination)
        ),
        None => println!("-- Set a destination by typing /<pubkey or alias>"),
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_line(&session, &line).await,
                    Ok(None) => break,
                    Err(e) => {
                        output::print_error(&format!("failed to read input: {e}"));
                        break;
                    }
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(line) = output::render_event(&event, &session) {
                            println!("{line}");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Display fell behind the ledger");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = wait_listener(&mut listener) => {
                match result {
                    Ok(Ok(())) => {
                        output::print_error("invoice subscription ended; receiving is disabled");
                    }
                    Ok(Err(e)) if e.is_fatal() => {
                        error!(error = %e, "Inbound path failed");
                        return Err(e.into());
                    }
                    Ok(Err(e)) => {
                        output::print_error(&format!("{e}; receiving is disabled"));
                    }
                    Err(e) => {
                        error!(error = %e, "Listener task aborted");
                        return Err(e.into());
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}

async fn handle_line(session: &ChatSession, line: &str) {
    match session.handle_input(line).await {
        // Sends and destination changes show up as ledger events.
        Ok(InputOutcome::Empty)
        | Ok(InputOutcome::DestinationChanged(_))
        | Ok(InputOutcome::Sent(_)) => {}
        Err(e) => output::print_error(&e.to_string()),
    }
}

/// Resolves once the listener task finishes; never if there is none.
async fn wait_listener(
    listener: &mut Option<ListenerTask>,
) -> Result<Result<(), ListenerError>, JoinError> {
    match listener {
        Some(task) => {
            let result = task.await;
            *listener = None;
            result
        }
        None => std::future::pending().await,
    }
}
