//! Example: reading and writing PLC registers over FINS/TCP
//!
//! Run with: cargo run --example read_registers -- 192.168.250.1
//!
//! This example demonstrates:
//! - Connecting with a custom timeout and health-check interval
//! - Reading words, bits, 32-bit integers and floats by address text
//! - Dynamic access through type names
//! - Classifying failures

use std::net::IpAddr;
use std::time::Duration;

use omron_fins_driver::{
    Client, ErrorKind, HealthConfig, TcpTransport, TransportConfig, ValueKind,
};
use tracing_subscriber::EnvFilter;

fn main() -> omron_fins_driver::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let ip: IpAddr = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or_else(|| [192, 168, 250, 1].into());

    // =========================================================================
    // Connect
    // =========================================================================

    let config = TransportConfig::new(ip)
        .with_timeout(Duration::from_secs(1))
        .with_health(HealthConfig::default().with_interval(Duration::from_secs(5)));
    let transport = TcpTransport::connect(config)?;
    let nodes = transport.nodes();
    println!("connected: local node {}, PLC node {}", nodes.local, nodes.remote);

    let client = Client::new(&transport);

    // =========================================================================
    // Typed reads
    // =========================================================================

    println!("D2202      = {}", client.read_word("D2202")?);
    println!("D100..D104 = {:?}", client.read_words("D100", 5)?);
    println!("W100.1     = {}", client.read_bit("W100.1")?);
    println!("D300 (i32) = {}", client.read_i32("D300")?);
    println!("D310 (f32) = {}", client.read_f32("D310")?);

    // =========================================================================
    // Dynamic kinds
    // =========================================================================

    for (address, type_name) in [("D400", "int16"), ("D402", "int32"), ("D404", "real")] {
        match client.get_named(address, type_name) {
            Ok(value) => println!("{address} as {type_name} = {value:?}"),
            Err(e) => println!("{address} as {type_name} failed: {e}"),
        }
    }
    let readings = client.get_many("D500", ValueKind::Float32, 4)?;
    println!("D500.. four floats = {readings:?}");

    // =========================================================================
    // Writes and error handling
    // =========================================================================

    client.write_bit("W100.1", true)?;
    client.write_f32("D310", 25.5)?;

    match client.read_word("D40000") {
        Ok(value) => println!("D40000 = {value}"),
        Err(e) if e.kind() == ErrorKind::InvalidInput => println!("rejected locally: {e}"),
        Err(e) => match e.end_code() {
            Some(code) => println!("PLC refused: {code}, retryable: {}", e.is_retryable()),
            None => println!("transport failure: {e}"),
        },
    }

    transport.close();
    Ok(())
}
