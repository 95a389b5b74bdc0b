use super::ui;
use crate::core::currency::get_currency;
use crate::core::ledger::Ledger;
use crate::core::valuation::Valuation;
use anyhow::Result;
use comfy_table::Cell;

/// Renders a valuation as a table followed by the total.
pub fn render(username: &str, valuation: &Valuation) -> String {
    let base = &valuation.base_currency;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Balance"),
        ui::header_cell(&format!("Value ({base})")),
    ]);

    for row in &valuation.rows {
        table.add_row(vec![
            Cell::new(&row.code),
            ui::number_cell(format!("{:.4}", row.balance)),
            ui::value_cell(row.value, 2),
        ]);
    }

    let mut output = format!(
        "Portfolio of '{}' (base: {base}):\n\n",
        ui::style_text(username, ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{}: {} {base}",
        ui::style_text("TOTAL", ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_amount(valuation.total, 2), ui::StyleType::TotalValue)
    ));
    output
}

pub fn run(ledger: &Ledger, base: Option<&str>) -> Result<()> {
    let user = ledger.current_user()?;
    let base = get_currency(base.unwrap_or(ledger.base_currency()))?.code;

    let valuation = ledger.valuate(user.user_id, base)?;
    if valuation.rows.is_empty() {
        println!("Portfolio of '{}' is empty.", user.username);
        return Ok(());
    }

    println!("{}", render(&user.username, &valuation));
    Ok(())
}
