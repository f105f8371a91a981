use dw_dedupe::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    dw_dedupe::run(config).await
}
