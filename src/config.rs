use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::endpoint::Endpoint;

/// Scheduler driving the relayed connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// One thread polls every connection once per tick
    Poll,
    /// One task per connection, woken when a socket turns readable
    Task,
}

/// Redirect TCP connections from a listen address to a fixed destination
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Host to listen on
    pub listen_host: String,

    /// Port to listen on
    pub listen_port: u16,

    /// Host to redirect connections to
    pub redirect_host: String,

    /// Port to redirect connections to
    pub redirect_port: u16,

    /// Print debug traces for every connection
    #[arg(short, long)]
    pub verbose: bool,

    /// Scheduler driving the connections
    #[arg(long, value_enum, default_value_t = Engine::Poll)]
    pub engine: Engine,

    /// Delay between two ticks of the poll engine, in milliseconds
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,

    /// Maximum number of connections relayed at once
    #[arg(long)]
    pub max_connections: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: Endpoint,
    pub redirect: Endpoint,
    pub verbose: bool,
    pub engine: Engine,
    pub tick: Duration,
    pub max_connections: Option<usize>,
}

impl Config {
    pub fn new(listen: Endpoint, redirect: Endpoint) -> Self {
        Self {
            listen,
            redirect,
            verbose: false,
            engine: Engine::Poll,
            tick: Duration::from_millis(10),
            max_connections: None,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mut config = Self::new(
            Endpoint::new(args.listen_host, args.listen_port),
            Endpoint::new(args.redirect_host, args.redirect_port),
        );
        config.verbose = args.verbose;
        config.engine = args.engine;
        config.tick = Duration::from_millis(args.tick_ms);
        config.max_connections = args.max_connections;
        config
    }
}
