use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::connection::Connection;
use crate::connection_set::{ConnectionId, ConnectionSet};
use crate::endpoint::Endpoint;
use crate::readiness::try_accept;

pub async fn bind(endpoint: &Endpoint) -> Result<TcpListener> {
    TcpListener::bind(endpoint.as_addr())
        .await
        .with_context(|| format!("Failed to listen on {}", endpoint))
}

#[derive(Debug, Default)]
pub struct Tick {
    pub admitted: Option<ConnectionId>,
    pub pruned: usize,
}

pub struct Redirector {
    listener: TcpListener,
    redirect: Endpoint,
    connections: ConnectionSet,
    interval: Duration,
}

impl Redirector {
    pub async fn bind(config: &Config) -> Result<Self> {
        let listener = bind(&config.listen).await?;
        Ok(Self {
            listener,
            redirect: config.redirect.clone(),
            connections: ConnectionSet::new(config.max_connections),
            interval: config.tick,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    #[cfg(test)]
    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    // A connection admitted here is first updated on the next tick.
    pub async fn tick(&mut self) -> Tick {
        let fresh = match try_accept(&self.listener).await {
            Some(Ok((socket, remote_addr))) => self.admit(socket, remote_addr).await,
            Some(Err(e)) => {
                error!("Failed to accept socket: {:?}", e);
                None
            }
            None => None,
        };

        let pruned = self.connections.update_all().await;

        let admitted = fresh.map(|connection| self.connections.insert(connection));

        Tick { admitted, pruned }
    }

    async fn admit(&self, socket: TcpStream, remote_addr: SocketAddr) -> Option<Connection> {
        debug!("Accepting socket from {}", remote_addr);

        if !self.connections.has_capacity() {
            warn!(
                "Rejecting socket from {}: {} connections active",
                remote_addr,
                self.connections.len()
            );
            return None;
        }

        match Connection::connect(socket, remote_addr, &self.redirect).await {
            Ok(connection) => Some(connection),
            Err(e) => {
                debug!("Dropping socket {}: {:?}", remote_addr, e);
                None
            }
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!(
            "TCP Server listening on {}, redirecting to {}",
            self.local_addr()?,
            self.redirect
        );

        loop {
            let tick = self.tick().await;
            if let Some(id) = tick.admitted {
                debug!("Admitted connection #{}, {} active", id, self.connections.len());
            }
            if tick.pruned > 0 {
                debug!("Pruned {} connections, {} active", tick.pruned, self.connections.len());
            }
            time::sleep(self.interval).await;
        }
    }
}
