//! updraft - update feeds for desktop apps

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use updraft_cli::cmd;
use updraft_cli::cmd::download::Target;
use updraft_cli::config::Config;
use updraft_cli::service::Service;
use updraft_cli::{Cli, Commands};
use updraft_core::UpdateQuery;
use updraft_core::resolver::DownloadQuery;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Command line and environment win over the config file.
    let config = Config::discover(cli.config.as_deref())?.overlay(Config::from(&cli));

    let filter = match &config.log_level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"))?,
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Offline command: no backend needed.
    if let Commands::ReleasesFile { path } = &cli.command {
        return cmd::releases_file::releases_file(path);
    }

    let service = Service::from_config(&config)?;

    match cli.command {
        Commands::Versions { filter } => cmd::versions::versions(&service, &filter.into()).await,
        Commands::Channels => cmd::channels::channels(&service).await,
        Commands::Resolve { filter } => cmd::resolve::resolve(&service, &filter.into()).await,
        Commands::Update {
            platform,
            version,
            channel,
            format,
            filename,
        } => {
            let query = UpdateQuery {
                platform,
                version,
                channel,
            };
            cmd::update::update(&service, &query, format, filename.as_deref()).await
        }
        Commands::Download {
            filter,
            user_agent,
            filetype,
            filename,
            output,
        } => {
            let target = match filename {
                Some(filename) => Target::File {
                    tag: filter.tag,
                    channel: filter.channel,
                    filename,
                },
                None => Target::Platform(DownloadQuery {
                    tag: filter.tag,
                    channel: filter.channel,
                    platform: filter.platform,
                    user_agent,
                    filetype,
                }),
            };
            cmd::download::download(&service, &target, output.as_deref()).await
        }
        Commands::ReleasesFile { path } => cmd::releases_file::releases_file(&path),
    }
}
