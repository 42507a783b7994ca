use clap::{Parser, Subcommand};
use core_config::{Environment, FromEnv};
use database::sql::{self, SqlConfig};
use domain_settings::{SettingsCache, SettingsService, SqlSettingRepository};
use eyre::{Result, WrapErr};
use migration::{MigrationContext, runner};

#[derive(Parser)]
#[command(name = "migration", about = "Apply and inspect startup migrations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up,
    /// List declared migrations and whether they are applied
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    core_config::tracing::install_color_eyre();
    core_config::tracing::init_tracing(&Environment::from_env());

    let cli = Cli::parse();

    let config = SqlConfig::from_env().wrap_err("Failed to load database configuration")?;
    let db = sql::connect_with_retry(config, None)
        .await
        .wrap_err("Failed to connect to database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            let settings = SettingsService::new(SqlSettingRepository::new(db.clone()), SettingsCache::in_memory());
            let ctx = MigrationContext::new(db, settings);
            let report = migration::run(&ctx).await.wrap_err("Migration run aborted")?;

            for name in &report.applied {
                println!("applied  {name}");
            }
            for failed in &report.failed {
                println!("FAILED   {}: {}", failed.name, failed.error);
            }
            println!(
                "{} applied, {} already applied, {} failed",
                report.applied.len(),
                report.skipped.len(),
                report.failed.len()
            );

            if !report.is_clean() {
                eyre::bail!("{} migration(s) failed", report.failed.len());
            }
        }
        Command::Status => {
            runner::ensure_ledger(&db).await?;
            let applied = runner::applied(&db).await?;

            for name in migration::migrator().names() {
                match applied.iter().find(|m| m.name == name) {
                    Some(m) => println!("applied  {name}  ({})", m.applied_at.to_rfc3339()),
                    None => println!("pending  {name}"),
                }
            }
        }
    }

    Ok(())
}
