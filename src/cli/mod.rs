use crate::config::ConfigArgs;
use crate::services::{run_job, CostExplorerClient, CostReporter};
use crate::types::DateWindow;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

/// Daily cloud cost report for a chat webhook
#[derive(Parser)]
#[command(name = "cost-reporter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Report as if today were this UTC date (YYYY-MM-DD)
    #[arg(long, global = true)]
    date: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query costs and post the report to the webhook (default)
    Run {
        /// Print the invocation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the report without sending it
    Preview,

    /// Show the date ranges a report would query
    Dates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let today = self.date.unwrap_or_else(|| Utc::now().date_naive());

        match self.command.unwrap_or(Commands::Run { json: false }) {
            Commands::Run { json } => {
                let result = run_job(self.config.resolve(), today);
                if json {
                    println!("{}", serde_json::to_string(&result)?);
                } else {
                    println!("{}: {}", result.status_code, result.body);
                }
                if !result.is_success() {
                    anyhow::bail!("report not delivered (status {})", result.status_code);
                }
                Ok(())
            }
            Commands::Preview => {
                let config = self.config.resolve()?;
                let billing = CostExplorerClient::new(config.billing_endpoint)?;
                let message = CostReporter::new(billing, config.report).compose(today)?;
                print!("{}", message);
                Ok(())
            }
            Commands::Dates { json } => {
                let config = self.config.resolve()?;
                let window = DateWindow::for_today(today, config.report.forecast_days)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&window)?);
                } else {
                    println!("yesterday:      {}", window.yesterday);
                    println!("today:          {}", window.today);
                    println!("trailing start: {}", window.trailing_start);
                    println!("month start:    {}", window.month_start);
                }
                Ok(())
            }
        }
    }
}
