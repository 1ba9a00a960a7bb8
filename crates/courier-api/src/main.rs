use courier_core::Config;

// Use mimalloc as the global allocator for lower fragmentation in long-running containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (clients, relay, routes)
    let app = courier_api::setup::initialize_app(config.clone()).await?;

    // Run the configured transport until shutdown
    courier_api::setup::transport::run(&config, app).await?;

    Ok(())
}
