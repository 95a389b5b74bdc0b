use super::ui;
use crate::core::ledger::{Ledger, TradeAction, TradeReceipt};
use anyhow::Result;

pub fn render_receipt(receipt: &TradeReceipt) -> String {
    let code = &receipt.currency;
    let base = &receipt.base_currency;
    let (verb, estimate_label) = match receipt.action {
        TradeAction::Buy => ("Purchase", "Estimated cost"),
        TradeAction::Sell => ("Sale", "Estimated revenue"),
    };

    let rate = if receipt.rate != 0.0 {
        format!("{} {base}/{code}", ui::format_amount(receipt.rate, 2))
    } else {
        "an unknown rate".to_string()
    };

    let mut lines = vec![
        format!("{verb} completed: {:.4} {code} at {rate}", receipt.amount),
        "Portfolio changes:".to_string(),
        format!(
            "- {code}: was {:.4} -> now {:.4}",
            receipt.old_balance, receipt.new_balance
        ),
    ];
    match receipt.estimated_value {
        Some(value) => lines.push(format!(
            "{estimate_label}: {} {base}",
            ui::format_amount(value, 2)
        )),
        None => lines.push(ui::style_text(
            "No cached rate, run 'update-rates' for an estimate",
            ui::StyleType::Subtle,
        )),
    }
    lines.join("\n")
}

pub fn buy(ledger: &Ledger, currency: &str, amount: f64) -> Result<()> {
    let user = ledger.current_user()?;
    let receipt = ledger.buy(user.user_id, currency, amount)?;
    println!("{}", render_receipt(&receipt));
    Ok(())
}

pub fn sell(ledger: &Ledger, currency: &str, amount: f64) -> Result<()> {
    let user = ledger.current_user()?;
    let receipt = ledger.sell(user.user_id, currency, amount)?;
    println!("{}", render_receipt(&receipt));
    Ok(())
}
