use std::io;
use std::mem;
use std::net::SocketAddr;

use anyhow::{anyhow, Result};
use bytes::BytesMut;
use tokio::net::TcpStream;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::relay::{self, relay};

enum State {
    Active {
        inbound: TcpStream,
        outbound: TcpStream,
        to_outbound: BytesMut,
        to_inbound: BytesMut,
    },
    Closed,
}

// Both sockets are open together or closed together.
pub struct Connection {
    peer: SocketAddr,
    state: State,
}

impl Connection {
    pub fn new(inbound: TcpStream, outbound: TcpStream, peer: SocketAddr) -> Self {
        Self {
            peer,
            state: State::Active {
                inbound,
                outbound,
                to_outbound: BytesMut::new(),
                to_inbound: BytesMut::new(),
            },
        }
    }

    pub async fn connect(inbound: TcpStream, peer: SocketAddr, redirect: &Endpoint) -> Result<Self> {
        match TcpStream::connect(redirect.as_addr()).await {
            Ok(outbound) => Ok(Self::new(inbound, outbound, peer)),
            Err(e) => {
                drop(inbound);
                Err(anyhow!("Failed to connect to {}: {:?}", redirect, e))
            }
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    pub async fn update(&mut self) -> bool {
        let State::Active {
            inbound,
            outbound,
            to_outbound,
            to_inbound,
        } = &mut self.state
        else {
            return false;
        };

        // inbound first; a failure there skips the other direction
        if !relay(inbound, outbound, to_outbound).await {
            debug!("Inbound side of {} closed", self.peer);
            return self.close();
        }
        if !relay(outbound, inbound, to_inbound).await {
            debug!("Outbound side of {} closed", self.peer);
            return self.close();
        }

        true
    }

    pub fn close(&mut self) -> bool {
        if let State::Active {
            inbound,
            outbound,
            to_outbound,
            to_inbound,
        } = mem::replace(&mut self.state, State::Closed)
        {
            if !to_outbound.is_empty() || !to_inbound.is_empty() {
                debug!(
                    "Discarding {} unsent bytes of {}",
                    to_outbound.len() + to_inbound.len(),
                    self.peer
                );
            }
            drop(inbound);
            drop(outbound);
            debug!("Closed connection {}", self.peer);
        }
        false
    }

    pub async fn wait_ready(&self) -> io::Result<()> {
        match &self.state {
            State::Active {
                inbound,
                outbound,
                to_outbound,
                to_inbound,
            } => {
                tokio::select! {
                    rv = relay::wait(inbound, outbound, to_outbound) => rv,
                    rv = relay::wait(outbound, inbound, to_inbound) => rv,
                }
            }
            State::Closed => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection closed",
            )),
        }
    }
}
