use clap::Parser;
use matchmaker_migrate::core::Direction;
use matchmaker_migrate::utils::error::{ErrorSeverity, MigrationError};
use matchmaker_migrate::utils::{logger, report, validation::Validate};
use matchmaker_migrate::{matchmaker, CliConfig, Command, JsonFileStore, MigrateConfig, MigrationRunner};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger(config.verbose());
    } else {
        logger::init_cli_logger(config.verbose());
    }

    tracing::info!("Starting matchmaker-migrate");
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "❌ Migration failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // Already applied / not applied is a status notice, not a failure
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: &CliConfig, config: &MigrateConfig) -> Result<(), MigrationError> {
    let store = JsonFileStore::new(config.store_path()?);
    let runner = MigrationRunner::new(store);
    let migration = matchmaker::migration(config.duplicate_policy());

    let direction = match cli.command {
        Command::Status => {
            let applied = runner.status(&migration).await?;
            println!(
                "{}: {}",
                migration.name,
                if applied { "applied" } else { "not applied" }
            );
            return Ok(());
        }
        Command::Apply => Direction::Forward,
        Command::Revert => Direction::Reverse,
    };

    let reports = if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - changes will be discarded");
        runner.dry_run(&migration, direction).await?
    } else {
        match direction {
            Direction::Forward => runner.apply(&migration).await?,
            Direction::Reverse => runner.revert(&migration).await?,
        }
    };

    for step in &reports {
        println!(
            "{:<60} {:>8} {} -> {}",
            step.step, step.records, step.source, step.destination
        );
    }

    if let Some(path) = config.report_path() {
        report::write_csv_file(path, &reports)?;
    }

    println!(
        "✅ {} {}",
        migration.name,
        match (direction, cli.dry_run) {
            (_, true) => "dry run finished",
            (Direction::Forward, false) => "applied",
            (Direction::Reverse, false) => "reverted",
        }
    );
    Ok(())
}
