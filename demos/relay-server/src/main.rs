use keyrelay::prelude::*;

/// Config file used when neither an argument nor `KEYRELAY_CONFIG` names one.
const DEFAULT_CONFIG: &str = "relay.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    keyrelay::init_tracing();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("KEYRELAY_CONFIG").ok());
    let mut config = match path {
        Some(path) => RelayConfig::load(&path)?,
        None if std::path::Path::new(DEFAULT_CONFIG).exists() => {
            RelayConfig::load(DEFAULT_CONFIG)?
        }
        None => RelayConfig::default(),
    };
    if let Ok(addr) = std::env::var("KEYRELAY_BIND") {
        config.bind_addr = addr;
    }

    let directory = MemoryDirectory::new();
    let seeded = config.seed_directory(&directory).await?;
    tracing::info!(users = seeded, "directory ready");

    let server = RelayServerBuilder::from_config(&config)
        .build(directory, PgpVerifier)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run().await?;
    Ok(())
}
