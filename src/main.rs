#[tokio::main]
async fn main() -> anyhow::Result<()> {
    zotpot_tts::run().await
}
