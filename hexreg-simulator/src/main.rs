//! # hexreg Device Simulator
//!
//! Standalone binary exposing a simulated hexreg device over TCP. Clients
//! speak the six-hex-digit frame protocol; the register map, power and
//! reset semantics, and the sensor walk live in the
//! [`hexreg_device`](https://docs.rs/hexreg-device/) crate.
use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;
use hexreg_device::{
    engine::Engine,
    server::{Config, DeviceServer},
};

#[derive(Parser)]
#[command(about = "Simulated hexreg register device over TCP", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "8989")]
    port: u16,

    #[arg(short, long, default_value = "0.0.0.0")]
    ip: IpAddr,

    #[arg(
        short,
        long,
        help = "Seed for a reproducible sensor walk; random when omitted"
    )]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("starting hexreg device simulator");

    let args = Args::parse();
    log::debug!("parsed arguments: ip={}, port={}", args.ip, args.port);

    let engine = match args.seed {
        Some(seed) => {
            log::info!("sensor walk seeded with {}", seed);
            Arc::new(Engine::with_seed(seed))
        }
        None => Arc::new(Engine::new()),
    };

    let config = Config {
        addr: SocketAddr::new(args.ip, args.port),
        ..Config::default()
    };
    log::info!("binding to address: {}", config.addr);

    let server = DeviceServer::new(engine, config);
    server.run()?;
    Ok(())
}
