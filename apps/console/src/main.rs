use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use console_core::{
    AlwaysConfirm, Confirm, DeleteOutcome, FilterCriteria, HttpRecordStore, ListController,
    MutationCoordinator,
};
use shared::domain::{Role, Status, User, UserFields, UserId};
use tracing_subscriber::EnvFilter;

mod config;
mod render;
mod terminal;

use terminal::{TerminalConfirm, TerminalNotifier};

#[derive(Parser, Debug)]
#[command(name = "console", about = "Manage the user directory")]
struct Cli {
    /// Overrides the configured user collection URL.
    #[arg(long, global = true)]
    store_url: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Matches name, email or username.
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    status: Option<Status>,
    /// Joined on this day (YYYY-MM-DD).
    #[arg(long)]
    joined_on: Option<NaiveDate>,
}

impl FilterArgs {
    fn criteria(self) -> FilterCriteria {
        FilterCriteria {
            search: self.search.unwrap_or_default(),
            role: self.role,
            status: self.status,
            joined_on: self.joined_on,
        }
    }
}

#[derive(Args, Debug)]
struct EditArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    status: Option<Status>,
}

impl EditArgs {
    fn apply(self, fields: &mut UserFields) {
        if let Some(name) = self.name {
            fields.name = name;
        }
        if let Some(email) = self.email {
            fields.email = email;
        }
        if let Some(username) = self.username {
            fields.username = username;
        }
        if let Some(role) = self.role {
            fields.role = role;
        }
        if let Some(status) = self.status {
            fields.status = status;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value_t = Role::User)]
        role: Role,
        #[arg(long, default_value_t = Status::Active)]
        status: Status,
    },
    Edit {
        id: String,
        #[command(flatten)]
        changes: EditArgs,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    DeleteMany {
        #[arg(required_unless_present = "all_matching")]
        ids: Vec<String>,
        /// Delete every record matching the filters, across all pages.
        #[arg(long, conflicts_with = "ids")]
        all_matching: bool,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        yes: bool,
    },
}

impl Command {
    fn skips_confirmation(&self) -> bool {
        matches!(
            self,
            Command::Delete { yes: true, .. } | Command::DeleteMany { yes: true, .. }
        )
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let mut settings = config::load_settings();
    if let Some(url) = cli.store_url {
        settings.store_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout_secs = secs;
    }

    let store = HttpRecordStore::new(settings.store_url()?, settings.request_timeout())?;
    let confirm: Arc<dyn Confirm> = if cli.command.skips_confirmation() {
        Arc::new(AlwaysConfirm)
    } else {
        Arc::new(TerminalConfirm)
    };
    let coordinator =
        MutationCoordinator::new(Arc::new(store), confirm, Arc::new(TerminalNotifier));

    let mut list = ListController::new();
    if coordinator.refresh(&mut list).await.is_err() {
        return Ok(ExitCode::FAILURE);
    }

    let succeeded = match cli.command {
        Command::List { filters, page } => {
            list.set_filter(filters.criteria());
            list.set_page(page);
            print!("{}", render::render_page(&list.view(), Utc::now()));
            true
        }
        Command::Add {
            name,
            email,
            username,
            role,
            status,
        } => {
            let fields = UserFields {
                name,
                email,
                username,
                role,
                status,
            };
            match coordinator.create(&mut list, fields).await {
                Ok(user) => {
                    print_record(&user);
                    true
                }
                Err(_) => false,
            }
        }
        Command::Edit { id, changes } => {
            let id = UserId::new(id);
            let mut fields = list.find(&id).map(User::fields).unwrap_or_default();
            changes.apply(&mut fields);
            match coordinator.update(&mut list, &id, fields).await {
                Ok(user) => {
                    print_record(&user);
                    true
                }
                Err(_) => false,
            }
        }
        Command::Delete { id, .. } => {
            let outcome = coordinator.delete(&mut list, &UserId::new(id)).await;
            report_delete(outcome)
        }
        Command::DeleteMany {
            ids,
            all_matching,
            filters,
            ..
        } => {
            let outcome = if all_matching {
                list.set_filter(filters.criteria());
                list.select_all(true);
                coordinator.delete_selected(&mut list).await
            } else {
                let ids: Vec<UserId> = ids.into_iter().map(UserId::new).collect();
                coordinator.delete_many(&mut list, &ids).await
            };
            report_delete(outcome)
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report_delete(outcome: Result<DeleteOutcome, console_core::MutationError>) -> bool {
    match outcome {
        Ok(DeleteOutcome::Deleted(_)) => true,
        Ok(DeleteOutcome::Declined) => {
            eprintln!("Nothing deleted.");
            true
        }
        Ok(DeleteOutcome::NothingSelected) => {
            eprintln!("No users matched; nothing deleted.");
            true
        }
        Err(_) => false,
    }
}

fn print_record(user: &User) {
    println!(
        "{}  {} <{}> @{}  {} / {}  joined {}",
        user.id,
        user.name,
        user.email,
        user.username,
        user.role,
        user.status,
        render::format_joined(user.joined_date)
    );
}
