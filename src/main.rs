use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    adaptive_runner::cli::app::run().await
}
