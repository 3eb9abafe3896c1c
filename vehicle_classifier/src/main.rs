use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vehicle_classifier::{config, start_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_configuration()?;
    let log_level = &format!("{},reqwest=info,hyper=info", config.log_level.as_str());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();

    start_app(config).await?;

    Ok(())
}
