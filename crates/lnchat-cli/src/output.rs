//! Plain-text rendering of ledger events.

use lnchat_client::{AliasDirectory, ChatMessage, ChatSession, LedgerEvent};
use lnchat_shared::DeliveryState;

const SENDER_WIDTH: usize = 16;

/// `1500` → `[1.5   sat]`, `1000` → `[1     sat]`.
pub fn format_msat(msat: i64) -> String {
    let sign = if msat < 0 { "-" } else { "" };
    let msat = msat.unsigned_abs();
    let whole = msat / 1000;
    let rest = msat % 1000;
    let frac = if rest > 0 {
        format!(".{rest:03}").trim_end_matches('0').to_string()
    } else {
        String::new()
    };
    format!("[{sign}{whole}{frac:<4} sat]")
}

fn truncate(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}

pub fn render_message(message: &ChatMessage, directory: &AliasDirectory) -> String {
    let sender = truncate(&directory.display_name(&message.sender), SENDER_WIDTH);

    let context = match &message.recipient {
        Some(recipient) => directory.display_name(recipient),
        None => format!(
            "sent: {}",
            message.timestamp.format("%a %b %e %H:%M:%S %Y")
        ),
    };

    let mut line = format!(
        "{:>width$}: {} ({})",
        sender,
        message.text,
        context,
        width = SENDER_WIDTH
    );
    match message.state {
        DeliveryState::Pending => {}
        DeliveryState::Delivered => {
            line.push_str(" ✔");
            if message.is_outbound() {
                line.push(' ');
                line.push_str(&format_msat(message.fee_msat));
            }
        }
        DeliveryState::Failed => line.push_str(" ✘"),
    }
    line
}

/// The line to print for `event`, if any.
pub fn render_event(event: &LedgerEvent, session: &ChatSession) -> Option<String> {
    let directory = session.directory();
    match event {
        LedgerEvent::MessageAdded { message, .. } => Some(render_message(message, directory)),
        LedgerEvent::StateChanged { index, .. } => session
            .ledger()
            .message(*index)
            .map(|message| render_message(&message, directory)),
        LedgerEvent::DestinationChanged { destination } => Some(format!(
            "-- Send to {} [balance: {} msat]",
            directory.display_name(destination),
            session.ledger().balance(destination)
        )),
        LedgerEvent::BalanceChanged { .. } => None,
    }
}

pub fn print_error(msg: &str) {
    eprintln!("error: {msg}");
}
