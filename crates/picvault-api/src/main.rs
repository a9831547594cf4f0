use picvault_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    picvault_api::telemetry::init_telemetry(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let app = picvault_api::setup::initialize_app(config.clone()).await?;

    picvault_api::setup::server::start_server(&config, app).await?;

    Ok(())
}
