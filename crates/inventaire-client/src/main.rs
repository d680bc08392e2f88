#[tokio::main]
async fn main() -> anyhow::Result<()> {
    inventaire_client_lib::run().await
}
