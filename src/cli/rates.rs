use super::ui;
use crate::core::config::AppConfig;
use crate::core::currency;
use crate::core::ledger::{Ledger, RateQuote};
use crate::core::updater::{RatesUpdater, UpdateReport};
use crate::providers::build_providers;
use crate::store::JsonStore;
use anyhow::Result;

pub fn render_quote(quote: &RateQuote) -> String {
    let updated = quote
        .updated_at
        .map_or("unknown".to_string(), |ts| ts.to_rfc3339());
    let mut output = format!(
        "Rate {}->{}: {:.8} (updated: {updated}, source: {})",
        quote.from, quote.to, quote.rate, quote.source
    );
    if let Some(reverse) = quote.reverse_rate() {
        output.push_str(&format!(
            "\nReverse rate {}->{}: {reverse:.8}",
            quote.to, quote.from
        ));
    }
    output
}

pub fn render_report(report: &UpdateReport) -> String {
    let mut output = format!(
        "Update successful. Total rates updated: {}. Last refresh: {}",
        report.total_rates,
        report.last_refresh.to_rfc3339()
    );
    if !report.errors.is_empty() {
        output.push_str("\nUpdate completed with errors:");
        for err in &report.errors {
            output.push_str(&format!(
                "\n  - {}",
                ui::style_text(err, ui::StyleType::Error)
            ));
        }
    }
    output
}

pub fn get_rate(ledger: &Ledger, from: &str, to: &str) -> Result<()> {
    let quote = ledger.get_rate(from, to)?;
    println!("{}", render_quote(&quote));
    Ok(())
}

pub async fn update_rates(config: &AppConfig, store: &JsonStore) -> Result<()> {
    let updater = RatesUpdater::new(build_providers(config), store.clone());

    let spinner = ui::new_spinner("Fetching rates...");
    let result = updater.run_update().await;
    spinner.finish_and_clear();

    println!("{}", render_report(&result?));
    Ok(())
}

pub fn currencies() {
    println!("{}", ui::style_text("Supported currencies", ui::StyleType::Title));
    for currency in currency::all() {
        println!("  {currency}");
    }
}
