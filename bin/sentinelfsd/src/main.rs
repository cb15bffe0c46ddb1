#![deny(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use sentinelfs_config::CliArgs;
use sentinelfs_daemon::Daemon;
use sentinelfs_logging::LogOptions;

fn local_peer_id(cli: &CliArgs) -> String {
    cli.peer_id.clone().unwrap_or_else(|| format!("peer-{}", std::process::id()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    if let Err(error) = sentinelfs_logging::init(LogOptions {
        verbose: cli.verbose,
        debug: cli.debug,
        quiet: cli.quiet,
    }) {
        eprintln!("failed to initialize logging: {error}");
    }

    let config = match sentinelfs_config::load(&cli) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(target: "sentinelfs::daemon", %error, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let daemon = match Daemon::new(local_peer_id(&cli), config) {
        Ok(daemon) => Arc::new(daemon),
        Err(error) => {
            tracing::error!(target: "sentinelfs::daemon", %error, "failed to start daemon");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();

    let accept_handle = {
        let daemon = Arc::clone(&daemon);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(error) = daemon.run_accept_loop(shutdown).await {
                tracing::error!(target: "sentinelfs::daemon", %error, "accept loop failed");
            }
        })
    };

    let remesh_handle = daemon.spawn_remesh(shutdown.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "sentinelfs::daemon", "received shutdown signal");
            shutdown.cancel();
        }
        () = shutdown.cancelled() => {}
    }

    let _ = accept_handle.await;
    let _ = remesh_handle.await;

    ExitCode::SUCCESS
}
