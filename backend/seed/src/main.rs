use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Catalog fixture (JSON)
    catalog: PathBuf,

    redis_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    seed::seed_catalog(&args.catalog, &args.redis_url).await
}
