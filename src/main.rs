use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "offboardd",
    about = "Multi-tenant scheduled identity-lifecycle action engine",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML config file (overrides OFFBOARDD_CONFIG)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + background poller)
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Inspect scheduled actions directly against the store
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// List the built-in action templates
    Templates,
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// List a tenant's scheduled actions
    List {
        /// Tenant id
        #[arg(long)]
        tenant: String,
    },

    /// Show one record, including its execution log
    Show {
        /// Record id
        #[arg(long)]
        id: Uuid,

        /// Tenant id
        #[arg(long)]
        tenant: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => offboardd::config::OffboarddConfig::load(std::path::Path::new(path))?,
        None => offboardd::config::OffboarddConfig::load_or_default(),
    };

    // Initialize tracing; RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.logging.level)
            }),
        )
        .init();

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "starting offboardd daemon");
            offboardd::serve(config).await?;
        }
        Commands::Schedule { action } => {
            let pool = offboardd::store::open_pool(&config.storage.db_path)?;
            let store = offboardd::store::ScheduledActionStore::new(pool);

            match action {
                ScheduleAction::List { tenant } => {
                    let records = store.list(&tenant)?;
                    if records.is_empty() {
                        println!("No scheduled actions for tenant '{tenant}'.");
                    } else {
                        println!(
                            "{:<36} | {:<24} | {:<20} | {:<11} | Actions",
                            "Id", "Target", "Scheduled at", "Status"
                        );
                        println!(
                            "{:-<36}-|-{:-<24}-|-{:-<20}-|-{:-<11}-|-{:-<7}",
                            "", "", "", "", ""
                        );
                        for r in records {
                            println!(
                                "{:<36} | {:<24} | {:<20} | {:<11} | {}",
                                r.id,
                                r.target.display_name,
                                r.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
                                r.status.to_string(),
                                r.actions.len()
                            );
                        }
                    }
                }
                ScheduleAction::Show { id, tenant } => {
                    let record = store.get(id, &tenant)?;
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
            }
        }
        Commands::Templates => {
            println!("{:<20} | {:<24} | Actions", "Id", "Name");
            println!("{:-<20}-|-{:-<24}-|-{:-<7}", "", "", "");
            for t in offboardd::templates::TEMPLATES {
                let actions: Vec<&str> = t.actions.iter().map(|a| a.as_str()).collect();
                println!("{:<20} | {:<24} | {}", t.id, t.name, actions.join(", "));
            }
        }
    }

    Ok(())
}
