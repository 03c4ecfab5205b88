use clap::Parser;
use cost_reporter::cli::Cli;

fn main() -> anyhow::Result<()> {
    cost_reporter::init_tracing();
    let cli = Cli::parse();
    cli.run()
}
