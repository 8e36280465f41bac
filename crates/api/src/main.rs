//! Playgate server - main entry point

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use playgate_api::{router, AppContext, Config};
use playgate_crypto::AmountCipher;
use playgate_store::PgStore;

#[derive(Parser)]
#[command(name = "playgate")]
#[command(about = "B2B gaming wallet and AML platform", long_about = None)]
struct Cli {
    /// Override the bind address from PLAYGATE_BIND_ADDR
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    // Fails closed: no valid key, no process.
    let cipher = Arc::new(AmountCipher::from_base64_key(&config.encryption_key)?);
    let store = Arc::new(PgStore::connect(&config.database_url, cipher).await?);

    let bind_addr = config.bind_addr;
    let ctx = AppContext::build(config, store);
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "playgate listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
