use super::ui;
use crate::core::snapshot::{RateSnapshot, ScheduleOutcome, ScheduleResult};
use crate::rate_client::RateClient;
use crate::scheduler::RefreshScheduler;
use anyhow::Result;
use chrono::Utc;
use comfy_table::Cell;

fn rates_table(snapshot: &RateSnapshot, display_currencies: &[String]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);

    for code in display_currencies {
        table.add_row(vec![
            Cell::new(code),
            ui::format_optional_cell(snapshot.rate(code), |r| format!("{r:.2}")),
        ]);
    }

    table.to_string()
}

/// Renders one scheduling pass: the rates table (current or last
/// known-good), the observation time, and the next-refresh hint.
pub fn display(result: &ScheduleResult, display_currencies: &[String]) -> String {
    let mut output = String::new();

    match &result.outcome {
        ScheduleOutcome::Fresh(snapshot) | ScheduleOutcome::Refreshed(snapshot) => {
            output.push_str(&format!(
                "Base: {}\n\n",
                ui::style_text(&snapshot.base_currency, ui::StyleType::Title)
            ));
            output.push_str(&rates_table(snapshot, display_currencies));
            output.push_str(&format!(
                "\n\nUpdated: {}",
                ui::style_text(
                    &snapshot.observed_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                    ui::StyleType::Subtle
                )
            ));
        }
        ScheduleOutcome::Failed { message, stale, .. } => {
            output.push_str(&ui::style_text(message, ui::StyleType::Error));
            if let Some(snapshot) = stale {
                output.push_str(&format!(
                    "\n\nLast known rates ({}):\n",
                    ui::style_text(&snapshot.base_currency, ui::StyleType::Title)
                ));
                output.push_str(&rates_table(snapshot, display_currencies));
                output.push_str(&format!(
                    "\n\nUpdated: {}",
                    ui::style_text(
                        &snapshot.observed_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                        ui::StyleType::Subtle
                    )
                ));
            }
        }
    }

    output.push_str(&format!(
        "\nNext refresh: {}",
        ui::style_text(
            &result.next_refresh_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            ui::StyleType::Subtle
        )
    ));

    output
}

pub async fn run<C: RateClient>(
    scheduler: &RefreshScheduler<C>,
    display_currencies: &[String],
) -> Result<()> {
    let spinner = ui::new_spinner("Fetching rates...");
    let result = scheduler.get_current_rates(Utc::now()).await;
    spinner.finish_and_clear();

    println!("{}", display(&result, display_currencies));
    Ok(())
}
