use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dschat::run().await
}
