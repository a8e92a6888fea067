#[tokio::main]
async fn main() -> anyhow::Result<()> {
    songdeck_lib::run().await
}
