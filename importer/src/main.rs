#[tokio::main]
async fn main() -> anyhow::Result<()> {
    importer::run_cli().await
}
