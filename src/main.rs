use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    rangekit::cli::run().await
}
