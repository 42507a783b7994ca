//! Settings Service - Entry Point
//!
//! Runs migrations, wires the settings store and vector queue admin, and
//! keeps background maintenance going until shutdown.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    settings_service::run().await
}
