//! # Command Line Interface
//!
//! Starts the API server and offers database and account maintenance commands.

use crate::auth::jwt::Role;
use crate::config::load_config;
use crate::observability::init_logging;
use crate::storage::{
    check_connection, create_pool, get_migration_version, list_applied_migrations,
    run_migrations, validate_migrations, AccountRepository, DbPool, MigrationInfo,
    SqlxAccountRepository,
};
use clap::{Parser, Subcommand};
use std::process;

#[derive(Parser)]
#[command(name = "accountplane")]
#[command(about = "Account registration and session service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Database URL override
    #[arg(long)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server (default)
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind to
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Database management commands
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },

    /// Account administration commands
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand)]
pub enum DatabaseCommands {
    /// Run pending migrations
    Migrate,

    /// Show migration status
    Status,

    /// List all applied migrations
    List,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// List all accounts
    List,

    /// Grant the admin role to an existing account
    Promote {
        /// Email of the account
        email: String,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config()?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    init_logging(&config.observability)?;

    match cli.command {
        Some(Commands::Serve { port, addr }) => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(addr) = addr {
                config.server.host = addr;
            }
            crate::run_server(config).await?;
        }

        Some(Commands::Database { command }) => {
            config.database.auto_migrate = false;
            let pool = create_pool(&config.database).await?;
            handle_database_command(command, &pool).await?;
        }

        Some(Commands::Account { command }) => {
            let pool = create_pool(&config.database).await?;
            handle_account_command(command, pool).await?;
        }

        None => {
            tracing::info!("No command given, starting API server");
            crate::run_server(config).await?;
        }
    }

    Ok(())
}

async fn handle_database_command(command: DatabaseCommands, pool: &DbPool) -> anyhow::Result<()> {
    match command {
        DatabaseCommands::Migrate => {
            println!("Running database migrations...");
            run_migrations(pool).await?;
            println!("Migrations completed successfully!");
        }

        DatabaseCommands::Status => {
            check_connection(pool).await?;
            println!("Database connection OK");

            let version = get_migration_version(pool).await?;
            if validate_migrations(pool).await? {
                println!("Database schema is up to date (version {})", version);
            } else {
                println!("Database schema has pending migrations (version {})", version);
                process::exit(1);
            }
        }

        DatabaseCommands::List => {
            let migrations = list_applied_migrations(pool).await?;
            if migrations.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations:");
                print_migrations_table(&migrations);
            }
        }
    }

    Ok(())
}

async fn handle_account_command(command: AccountCommands, pool: DbPool) -> anyhow::Result<()> {
    let repository = SqlxAccountRepository::new(pool);

    match command {
        AccountCommands::List => {
            let accounts = repository.find_all().await?;
            if accounts.is_empty() {
                println!("No accounts registered");
                return Ok(());
            }

            println!(
                "{:<8} {:<32} {:<24} {:<10} {:<6}",
                "ID", "Email", "Name", "Activated", "Role"
            );
            println!("{}", "-".repeat(84));
            for account in accounts {
                println!(
                    "{:<8} {:<32} {:<24} {:<10} {:<6}",
                    account.id, account.email, account.full_name, account.is_activated, account.role
                );
            }
        }

        AccountCommands::Promote { email } => {
            let account = repository
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No account registered for {}", email))?;

            if account.role == Role::Admin {
                println!("{} is already an admin", email);
                return Ok(());
            }

            repository.set_role(account.id, Role::Admin).await?;
            println!("{} is now an admin (takes effect at next login)", email);
        }
    }

    Ok(())
}

fn print_migrations_table(migrations: &[MigrationInfo]) {
    println!("{:<16} {:<40} {:<20} {:<10}", "Version", "Description", "Applied At", "Time (ms)");
    println!("{}", "-".repeat(90));

    for migration in migrations {
        println!(
            "{:<16} {:<40} {:<20} {:<10}",
            migration.version,
            migration.description,
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["accountplane", "serve", "--port", "9090"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(9090), addr: None })));

        let cli = Cli::try_parse_from(["accountplane", "account", "promote", "a@x.com"]).unwrap();
        match cli.command {
            Some(Commands::Account { command: AccountCommands::Promote { email } }) => {
                assert_eq!(email, "a@x.com")
            }
            _ => panic!("expected account promote"),
        }

        let cli = Cli::try_parse_from(["accountplane", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.command.is_none());
    }
}
