use sqlx::Row;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use chrono::Utc;
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use publisher_api::authz::{Catalog, Permission};
use publisher_api::config::AppConfig;
use publisher_api::db::{self, admin};
use publisher_api::models::rbac::{RoleCreateRequest, RoleGrants};
use publisher_api::models::user::UserCreateRequest;

#[derive(Parser, Debug)]
#[command(author, version, about = "publisher-api admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Roll back the last applied migration
    MigrateRollback,
    /// Print the permission catalog
    Catalog,
    /// Create a division with an admin user holding every division-scoped permission
    Bootstrap {
        #[arg(long)]
        division: String,
        #[arg(long)]
        admin_email: String,
        #[arg(long, default_value = "Division Admin")]
        admin_name: String,
    },
    /// Sign a development token for an external id
    IssueToken {
        #[arg(long)]
        external_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::MigrateRollback => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator
                .undo(&pool, 1)
                .await
                .context("no migrations were rolled back")?;
            println!("Rolled back last migration");
        }
        Commands::Catalog => {
            let catalog = Catalog::current();
            println!("catalog version {}", catalog.version);
            for entry in catalog.permissions {
                println!("{:<20} {}", entry.name.as_str(), entry.scope.as_str());
            }
        }
        Commands::Bootstrap {
            division,
            admin_email,
            admin_name,
        } => {
            let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
            let pool = db::init(&database_url).await?;
            let summary = bootstrap(&pool, &division, &admin_email, &admin_name).await?;
            println!("{summary}");
        }
        Commands::IssueToken { external_id } => {
            let config = AppConfig::from_env()?;
            let token = config.jwt.encode(&external_id)?;
            println!("{token}");
        }
    }

    Ok(())
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let filename = format!("{}_{}.sql", timestamp, sanitized);
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let applied = applied_versions.contains(&version);
        let status = if applied { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if !desc.is_empty() {
            desc
        } else {
            "unknown"
        };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

async fn bootstrap(
    pool: &SqlitePool,
    division_name: &str,
    admin_email: &str,
    admin_name: &str,
) -> anyhow::Result<String> {
    let division = admin::create_division(pool, division_name).await?;
    let user = admin::create_user(
        pool,
        division.id,
        &UserCreateRequest {
            external_id: admin_email.to_string(),
            name: admin_name.to_string(),
        },
    )
    .await?;
    let group = admin::create_group(pool, division.id, "admins").await?;
    let role = admin::create_role(
        pool,
        division.id,
        &RoleCreateRequest {
            name: "division-admin".to_string(),
            description: Some("Every division-scoped permission".to_string()),
        },
    )
    .await?;
    admin::set_role_grants(
        pool,
        division.id,
        role.id,
        &RoleGrants {
            permissions: Permission::division_scoped().collect(),
            game_ids: Vec::new(),
        },
    )
    .await?;
    admin::assign_role_to_group(pool, division.id, group.id, role.id).await?;
    admin::add_user_to_group(pool, division.id, group.id, user.id).await?;

    Ok(format!(
        "division {} ({}) bootstrapped; {} is in group {} with role {}",
        division.name, division.id, user.external_id, group.name, role.name
    ))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Try local ./migrations first (when running from repo root). If that
    // doesn't exist (common in containers where CWD differs), fall back to
    // the crate-local migrations folder determined by CARGO_MANIFEST_DIR.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
