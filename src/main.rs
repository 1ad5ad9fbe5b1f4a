use fracture_prediction::{config, start_server, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::get_configuration()?;
    telemetry::init_tracing(&config.log_level);

    start_server(config).await?;

    Ok(())
}
