#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = evalease::run().await {
        eprintln!("evalease fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
