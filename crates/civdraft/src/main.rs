use civdraft::{CivdraftError, CivdraftServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), CivdraftError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind,
        data_dir = %config.data_dir.display(),
        catalog = %config.catalog.display(),
        "starting civdraft"
    );
    let mut server = CivdraftServer::builder().config(config).build().await?;

    let result = tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
            Ok(())
        }
    };
    server.shutdown().await;
    result
}
