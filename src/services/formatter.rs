//! Chat message template

use crate::types::{CostSummary, DateWindow};

/// Render the markdown report
pub fn format_message(account_name: &str, window: &DateWindow, summary: &CostSummary) -> String {
    let breakdown = summary
        .services
        .iter()
        .map(|s| format!("🔹 {} – **${:.2}**", s.service, s.amount))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🔔 **Daily Cloud Cost Report** 🔔\n\
         📂 **Account:** {account}\n\n\
         📅 **Spend on {yesterday} (UTC):** **${yesterday_total:.2}**\n\
         📌 **By service:**\n{breakdown}\n\n\
         📊 **Forecast for {today} (UTC):** **${forecast:.2}**\n\
         🧾 **Month to date ({month_start} to {today}, UTC):** **${month_total:.2}**\n",
        account = account_name,
        yesterday = window.yesterday,
        yesterday_total = summary.yesterday_total,
        breakdown = breakdown,
        today = window.today,
        forecast = summary.forecast,
        month_start = window.month_start,
        month_total = summary.month_total,
    )
}
