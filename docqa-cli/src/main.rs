use clap::Parser;
use docqa_cli::{Cli, Settings, cli, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    telemetry::init(args.verbose, args.log_json)?;

    let settings = Settings::from_env()?;
    cli::run(args, settings).await
}
