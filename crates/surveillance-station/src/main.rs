use clap::Parser;
use tracing::{debug, error, info};

use surveillance_station::{
    Result, Station,
    command::{self, Command},
    config::{Args, Config, check_and_create_config},
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args<Config> = Args::parse();

    // Only prompt for config setup if no config file was provided via --config
    if args.config.is_none() {
        check_and_create_config()
            .await
            .inspect_err(|err| eprintln!("Error checking for (or creating) config: {err}"))?;
    }

    let config = args
        .get_config()
        .inspect_err(|err| eprintln!("Error getting config: {err}"))?;

    logging::init_logging(config.logging.clone());
    debug!(url = %config.station.url, "Parsed config successfully");

    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let mut station = Station::connect(config.station)
        .await
        .inspect_err(|err| error!(err = ?err, "Failed to connect to Surveillance Station"))?;

    command::run(&mut station, args.command.unwrap_or(Command::Cameras)).await
}
