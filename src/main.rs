use std::time::Instant;

use anyhow::Result;
use tracing::{error, info};

use paycheck_mailer::utils::logging::{self, format_duration};
use paycheck_mailer::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let started = Instant::now();

    match run().await {
        Ok(()) => {
            info!("Completed! took {}", format_duration(started.elapsed()));
            Ok(())
        }
        Err(e) => {
            error!("❌ {:#}", e);
            error!("Failed to run, took {}", format_duration(started.elapsed()));
            Err(e)
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    App::initialize(config)?.run().await?;
    Ok(())
}
