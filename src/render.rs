use std::fmt::Write;

use crate::constant::NATIVE_SYMBOL;
use crate::state::{SaleSnapshot, ViewState};
use crate::wallet::Account;

pub const TITLE: &str = "Introducing the DApp Token!";
const PROGRESS_WIDTH: u64 = 40;

/// Render the whole screen for the current view.
pub fn render(view: &ViewState, account: Option<&Account>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out);

    match view {
        ViewState::Loading { .. } => {
            let _ = writeln!(out, "Loading...");
        }
        ViewState::Ready(snapshot) => {
            render_sale(&mut out, snapshot);
        }
        ViewState::Failed { error, .. } => {
            let _ = writeln!(out, "Error: {error}");
            if error.is_retryable() {
                let _ = writeln!(out, "Type `retry` to load the sale again.");
            }
        }
    }

    let _ = writeln!(out, "{}", "-".repeat(PROGRESS_WIDTH as usize + 2));
    if let Some(account) = account {
        let _ = writeln!(out, "Your Account: {account}");
        // keep showing the last known balance while reloading
        if let Some(snapshot) = view.last_snapshot() {
            let _ = writeln!(out, "Tokens Owned: {}", snapshot.account_balance);
        }
    }

    out
}

fn render_sale(out: &mut String, snapshot: &SaleSnapshot) {
    let _ = writeln!(out, "Current Price: {} {NATIVE_SYMBOL}", snapshot.price);
    let _ = writeln!(out, "Type `buy <amount>` to purchase tokens.");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", progress_bar(snapshot));
    let _ = writeln!(
        out,
        "{} / {} tokens sold",
        snapshot.tokens_sold, snapshot.max_tokens
    );
    let _ = writeln!(out, "{} tokens remaining", snapshot.remaining());
}

fn progress_bar(snapshot: &SaleSnapshot) -> String {
    let bps = snapshot.tokens_sold.basis_points_of(snapshot.max_tokens);
    let filled = (bps * PROGRESS_WIDTH / 10_000) as usize;
    format!(
        "[{}{}] {}.{:02}%",
        "#".repeat(filled),
        " ".repeat(PROGRESS_WIDTH as usize - filled),
        bps / 100,
        bps % 100
    )
}
