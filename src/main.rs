use anyhow::Result;
use clap::Parser;
use museum_registry::{CliArgs, RegistryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    museum_registry::init_tracing();
    let config = RegistryConfig::from_args(CliArgs::parse())?;
    museum_registry::server::serve(&config).await
}
