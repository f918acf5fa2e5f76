use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::endpoint::Endpoint;

pub type ShutdownRx = watch::Receiver<bool>;

pub async fn serve(
    listener: TcpListener,
    redirect: Endpoint,
    max_connections: Option<usize>,
    mut shutdown: ShutdownRx,
) -> Result<()> {
    let limit = max_connections.map(|n| Arc::new(Semaphore::new(n)));

    info!(
        "TCP Server listening on {}, redirecting to {}",
        listener.local_addr()?,
        redirect
    );

    loop {
        let accepted = tokio::select! {
            rv = listener.accept() => Some(rv),
            _ = shutdown.changed() => None,
        };

        let (socket, remote_addr) = match accepted {
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                error!("Failed to accept socket: {:?}", e);
                continue;
            }
            None => {
                info!("Stopped accepting on {}", listener.local_addr()?);
                return Ok(());
            }
        };
        debug!("Accepting socket from {}", remote_addr);

        let permit = match &limit {
            Some(limit) => match limit.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!(
                        "Rejecting socket from {}: {} connections active",
                        remote_addr,
                        max_connections.unwrap_or_default()
                    );
                    continue;
                }
            },
            None => None,
        };

        let redirect = redirect.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _permit = permit;
            match Connection::connect(socket, remote_addr, &redirect).await {
                Ok(connection) => drive(connection, shutdown).await,
                Err(e) => debug!("Failed to handle socket from {}: {:?}", remote_addr, e),
            }
            debug!("Dropping socket {}", remote_addr);
        });
    }
}

pub async fn drive(mut connection: Connection, mut shutdown: ShutdownRx) {
    if *shutdown.borrow() {
        connection.close();
    }

    while connection.is_active() {
        let woke = tokio::select! {
            rv = connection.wait_ready() => Some(rv),
            _ = shutdown.changed() => None,
        };

        match woke {
            Some(Ok(())) => {
                connection.update().await;
            }
            Some(Err(e)) => {
                debug!("Failed to poll {}: {:?}", connection.peer(), e);
                connection.close();
            }
            None => {
                connection.close();
            }
        }
    }
}
