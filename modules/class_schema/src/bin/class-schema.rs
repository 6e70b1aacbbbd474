//! Administrative CLI for class schemas

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use class_schema::api::document::{definition_to_json, read_definition};
use class_schema::domain::plan::plan_update;
use class_schema::domain::{
    ClassService, DataTypeRegistry, MigrationOptions, SchemaContext, UpsertStep,
};
use class_schema::infra::storage::{
    Migrator, SeaOrmClassRepository, SeaOrmDdlExecutor, SeaOrmSchemaIntrospector,
};
use class_schema::{ClassDefinition, Config};
use sea_orm_migration::MigratorTrait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Class schema definitions and table migrations")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL, overrides the configuration
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the class registry tables
    Migrate,
    /// Register a class and create its table
    Create {
        class_name: String,
        table_name: String,
        definition: PathBuf,
    },
    /// Replace the definition of a class and migrate its table
    Update { class_name: String, definition: PathBuf },
    /// Migrate the live table of a class to its stored definition
    Sync { class_name: String },
    /// Print the stored definition and reflected structure of a class
    Describe { class_name: String },
    /// Print the migration plan between two definition files
    Diff { old: PathBuf, new: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let options = MigrationOptions::from(&config);

    if let Command::Diff { old, new } = &args.command {
        return diff(&read_definition(old)?, &read_definition(new)?, &options);
    }

    let url = args
        .database_url
        .or(config.database_url.clone())
        .context("no database URL configured")?;
    let db = Arc::new(sea_orm::Database::connect(url.as_str()).await?);

    if let Command::Migrate = args.command {
        Migrator::up(&*db, None).await?;
        info!("class registry ready");
        return Ok(());
    }

    let service = ClassService::new(
        SchemaContext::new(DataTypeRegistry::with_defaults()),
        Arc::new(SeaOrmClassRepository::new(db.clone())),
        Arc::new(SeaOrmDdlExecutor::new(db.clone())),
        Arc::new(SeaOrmSchemaIntrospector::new(db)),
        options,
    );

    match args.command {
        Command::Create {
            class_name,
            table_name,
            definition,
        } => {
            let class = service
                .create_class(&class_name, &table_name, read_definition(&definition)?)
                .await?;
            println!("created {} ({})", class.class_name, class.table_name);
        }
        Command::Update {
            class_name,
            definition,
        } => {
            let (_, report) = service
                .update_definition(&class_name, read_definition(&definition)?)
                .await?;
            println!("{report:#?}");
        }
        Command::Sync { class_name } => {
            let (_, report) = service.sync_from_database(&class_name).await?;
            println!("{report:#?}");
        }
        Command::Describe { class_name } => {
            let class = service.get_class(&class_name).await?;
            println!("{}", definition_to_json(&class.definition)?);
            if let Some(structure) = service.get_class_structure(&class_name).await? {
                println!("key: {}", structure.id_column);
                for column in &structure.column_definitions {
                    println!("  {} {:?}", column.name, column.column_type);
                }
            }
        }
        Command::Migrate | Command::Diff { .. } => {}
    }
    Ok(())
}

fn diff(old: &ClassDefinition, new: &ClassDefinition, options: &MigrationOptions) -> Result<()> {
    let registry = DataTypeRegistry::with_defaults();
    let plan = plan_update("diff", old, new, &registry, options)?;

    if plan.is_empty() {
        println!("no changes");
        return Ok(());
    }
    if let Some(key) = &plan.primary_key {
        println!("drop primary key ({})", key.old.join(", "));
    }
    for field in &plan.deletions {
        println!("remove {}", field.name);
    }
    for step in &plan.upserts {
        match step {
            UpsertStep::Add { field, column } => match column {
                Some(column) => println!("add {} {}", field.name, column.sql_type),
                None => println!("add {} (virtual)", field.name),
            },
            UpsertStep::Change { old, new, column } => match column {
                Some(column) => {
                    println!("alter {} -> {} {}", old.name, new.name, column.sql_type)
                }
                None => println!("change {} (virtual)", new.name),
            },
            UpsertStep::Rematerialize { old, new, .. } => {
                println!("remove {} then add {}", old.name, new.name)
            }
        }
    }
    if plan.drops_variable_length && options.reclaim_space_after_drop {
        println!("rebuild table");
    }
    if let Some(key) = &plan.primary_key {
        println!("create primary key ({})", key.new.join(", "));
    }
    Ok(())
}
