//! spread-arb - Brent/WTI cointegrated spread trader

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let app = spread_arb::adapters::cli::init();
    spread_arb::adapters::cli::execute(app).await
}
