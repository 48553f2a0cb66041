use anyhow::Result;
use clap::Parser;
use tracing::info;

use audit_scorer::cli::{self, Cli, Commands};
use audit_scorer::logging::init_logging;
use audit_scorer::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // init-config must work before any configuration exists
    if let Some(Commands::InitConfig { output }) = &cli.command {
        if let Some(sample) = cli::init_config(output.as_deref())? {
            print!("{}", sample);
        }
        return Ok(());
    }

    let config = cli.load_config()?;
    let _log_guard = init_logging(&config.logging)?;

    match cli.command {
        Some(Commands::InspectBundle { .. }) => {
            println!("{}", cli::inspect_bundle(&config.model.bundle_path)?);
        }
        Some(Commands::Score { ref input, .. }) => {
            let scorer = server::load_scorer(&config)?.with_epsilon(config.scoring.epsilon);
            println!("{}", cli::score_file(&scorer, config.scoring.mode, input)?);
        }
        Some(Commands::Serve { .. }) | None => {
            info!("🚀 audit-scorer v{}", env!("CARGO_PKG_VERSION"));
            let scorer = server::load_scorer(&config)?;
            server::serve(&config, scorer).await?;
        }
        Some(Commands::InitConfig { .. }) => {}
    }

    Ok(())
}
