use anyhow::Context;

use scentrack_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    scentrack_observability::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    scentrack_api::server::run(config).await
}
