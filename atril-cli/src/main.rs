use anyhow::{Context, Result};
use atril_core::{ConditionCategory, MovementStatus};
use atril_sync::{FileStore, HttpStore, Session, Store};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;
mod state;

use config::{Backend, Config};

#[derive(Parser, Debug)]
#[command(name = "atril", version, about = "Orchestra instrument inventory and loans")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the inventory with the contents of a CSV sheet
    Import {
        file: PathBuf,

        /// Fill blank families from the instrument name
        #[arg(long)]
        infer_family: bool,
    },

    /// List instruments, sorted by name
    List {
        /// Free-text search over name, brand, model, student, monitor, serial, location, family
        #[arg(long, short)]
        search: Option<String>,

        /// Only instruments of this monitor
        #[arg(long, conflicts_with_all = ["loaned", "condition"])]
        monitor: Option<String>,

        /// Only instruments currently on loan
        #[arg(long, conflicts_with = "condition")]
        loaned: bool,

        #[arg(long, value_enum)]
        condition: Option<ConditionArg>,
    },

    /// Inventory KPIs
    Stats,

    /// Lend an instrument to a registered student
    Checkout {
        #[arg(long)]
        id: String,

        #[arg(long)]
        student: String,

        /// Defaults to the student's course in the directory
        #[arg(long)]
        course: Option<String>,

        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Bring an instrument back to storage
    Return {
        #[arg(long)]
        id: String,

        /// Must match the student on the instrument
        #[arg(long)]
        student: String,

        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Student directory
    Students {
        #[command(subcommand)]
        command: StudentsCommand,
    },

    /// Movement history, or the monthly report with --month and --year
    History {
        /// 1-12
        #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,

        #[arg(long, requires = "month")]
        year: Option<i32>,

        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Write the monthly report as CSV into this directory
        #[arg(long, requires = "month")]
        save: Option<PathBuf>,
    },

    /// Write the inventory to a CSV file
    Export { out: PathBuf },

    /// Delete every instrument
    ClearInventory {
        #[arg(long)]
        yes: bool,
    },

    /// Delete the whole movement history
    ClearHistory {
        #[arg(long)]
        yes: bool,
    },

    /// Refresh periodically and print KPIs until interrupted
    Watch,

    /// Manage ~/.atril/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum StudentsCommand {
    /// List students (optionally search by name or instrument)
    List {
        #[arg(long, short)]
        search: Option<String>,

        /// Only students holding an instrument
        #[arg(long)]
        loaned: bool,
    },

    /// Register a student
    Add(StudentArgs),

    /// Update a registered student by id
    Update {
        #[arg(long)]
        id: String,

        #[command(flatten)]
        fields: StudentArgs,
    },

    /// Remove a student by id
    Remove {
        #[arg(long)]
        id: String,
    },
}

#[derive(clap::Args, Debug)]
struct StudentArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    course: Option<String>,
    #[arg(long)]
    instrument: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    parent_name: Option<String>,
    #[arg(long)]
    parent_phone: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ConditionArg {
    Good,
    Fair,
    Poor,
}

impl From<ConditionArg> for ConditionCategory {
    fn from(arg: ConditionArg) -> Self {
        match arg {
            ConditionArg::Good => ConditionCategory::Good,
            ConditionArg::Fair => ConditionCategory::Fair,
            ConditionArg::Poor => ConditionCategory::Poor,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    /// Still on loan
    Open,
    /// Returned
    Completed,
}

impl From<StatusArg> for MovementStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Open => MovementStatus::CheckedOut,
            StatusArg::Completed => MovementStatus::Completed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    // Config commands must work before a store is reachable.
    let command = match cli.command {
        Command::Config { command } => return config_command(command),
        other => other,
    };

    let cfg = config::load_config()?;
    match cfg.store.backend {
        Backend::Local => {
            let path = match &cfg.store.path {
                Some(p) => p.clone(),
                None => state::store_path()?,
            };
            let store = FileStore::open(&path)
                .with_context(|| format!("opening local store {}", path.display()))?;
            tracing::debug!(path = %store.path().display(), "using local store");
            run(store, &cfg, command).await
        }
        Backend::Remote => {
            let (url, key) = cfg.remote_credentials()?;
            let store = HttpStore::new(&url, &key).context("configuring remote store")?;
            tracing::debug!(%url, "using remote store");
            run(store, &cfg, command).await
        }
    }
}

async fn run<S: Store>(store: S, cfg: &Config, command: Command) -> Result<()> {
    let mut session = Session::open(store, cfg.session_config()).await;

    match command {
        Command::Import { file, infer_family } => {
            commands::import(&mut session, &file, infer_family).await?;
        }
        Command::List {
            search,
            monitor,
            loaned,
            condition,
        } => {
            let view = commands::view_filter(monitor, loaned, condition.map(Into::into));
            commands::list(&session, search.as_deref().unwrap_or_default(), &view);
        }
        Command::Stats => commands::stats(&session),
        Command::Checkout {
            id,
            student,
            course,
            date,
        } => {
            commands::checkout(&mut session, id, student, course, date).await?;
        }
        Command::Return { id, student, date } => {
            commands::give_back(&mut session, id, student, date).await?;
        }
        Command::Students { command } => match command {
            StudentsCommand::List { search, loaned } => {
                commands::list_students(&session, search.as_deref().unwrap_or_default(), loaned);
            }
            StudentsCommand::Add(args) => {
                commands::save_student(&mut session, None, args.into_entry()).await?;
            }
            StudentsCommand::Update { id, fields } => {
                commands::save_student(&mut session, Some(id), fields.into_entry()).await?;
            }
            StudentsCommand::Remove { id } => {
                session
                    .remove_student(&id)
                    .await
                    .with_context(|| format!("removing student {id}"))?;
                println!("Removed student {id}");
            }
        },
        Command::History {
            month,
            year,
            status,
            save,
        } => match (month, year) {
            (Some(month), Some(year)) => {
                commands::monthly_report(&session, month - 1, year, status.map(Into::into), save)?;
            }
            _ => commands::history(&session, status.map(Into::into)),
        },
        Command::Export { out } => commands::export(&session, &out)?,
        Command::ClearInventory { yes } => {
            commands::confirm(yes, "clear-inventory")?;
            session.clear_inventory().await.context("clearing inventory")?;
            println!("Inventory cleared.");
        }
        Command::ClearHistory { yes } => {
            commands::confirm(yes, "clear-history")?;
            commands::clear_history(&mut session).await?;
        }
        Command::Watch => commands::watch(&mut session, cfg.refresh_interval()).await?,
        Command::Config { command } => config_command(command)?,
    }

    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init => config::init_config(),
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            println!("# {}", config::config_path()?.display());
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            Ok(())
        }
    }
}

impl StudentArgs {
    fn into_entry(self) -> atril_core::StudentEntry {
        atril_core::StudentEntry {
            id: String::new(),
            name: self.name,
            course: self.course.unwrap_or_default(),
            instrument: self.instrument,
            phone: self.phone,
            email: self.email,
            parent_name: self.parent_name,
            parent_phone: self.parent_phone,
        }
    }
}
