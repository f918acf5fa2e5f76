mod config;
mod connection;
mod connection_set;
mod endpoint;
mod listener;
mod readiness;
mod relay;
mod signal;
mod tcp;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use tokio::runtime;
use tokio::sync::watch;
use tracing::{info, Level};

use crate::config::{Args, Config, Engine};
use crate::listener::Redirector;

fn main() -> Result<()> {
    let config = Config::from(Args::parse());

    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    // the poll engine never needs more than the thread driving the loop
    let mut builder = match config.engine {
        Engine::Poll => runtime::Builder::new_current_thread(),
        Engine::Task => runtime::Builder::new_multi_thread(),
    };
    let rt = builder.enable_io().enable_time().build()?;

    rt.block_on(async move {
        match config.engine {
            Engine::Poll => {
                let redirector = Redirector::bind(&config).await?;
                tokio::select! {
                    rv = redirector.run() => rv?,
                    _ = signal::shutdown() => info!("Shutting down"),
                }
            }
            Engine::Task => {
                let listener = listener::bind(&config.listen).await?;
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                let mut server = tokio::spawn(tcp::serve(
                    listener,
                    config.redirect.clone(),
                    config.max_connections,
                    shutdown_rx,
                ));

                tokio::select! {
                    rv = &mut server => rv??,
                    _ = signal::shutdown() => {
                        info!("Shutting down");
                        let _ = shutdown_tx.send(true);
                        server.await??;
                    }
                }
            }
        }

        Ok::<(), anyhow::Error>(())
    })
}
