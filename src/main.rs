#[tokio::main]
async fn main() -> anyhow::Result<()> {
    accountplane::cli::run_cli().await
}
