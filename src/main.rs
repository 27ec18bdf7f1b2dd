use himpun::{config::ServerConfig, context::AppContext, error::AppResult, jobs, server};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "himpun=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    __    _
   / /_  (_)___ ___  ____  __  ______
  / __ \/ / __ `__ \/ __ \/ / / / __ \
 / / / / / / / / / / /_/ / /_/ / / / /
/_/ /_/_/_/ /_/ /_/ .___/\__,_/_/ /_/
                 /_/
        Organization Management Server v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
