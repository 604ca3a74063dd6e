#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agora_lib::run().await
}
