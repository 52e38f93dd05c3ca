#![forbid(unsafe_code)]

use std::process::ExitCode;

use clap::{CommandFactory as _, Parser, Subcommand};

use crate::api::TaskClient;
use crate::config;
use crate::output::table::Table;
use crate::store::TaskStore;
use crate::task::model::{Task, TaskRequest, validate_title};
use crate::tui;

#[derive(Debug, Parser)]
#[command(
    name = "taskdeck",
    version,
    about = "Terminal client for a remote task-tracking service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    List(ListArgs),
    Add(AddArgs),
    Done(DoneArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Show descriptions and raw timestamps
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Output in JSON format
    #[arg(long = "json")]
    pub json: bool,
    /// Output as CSV
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Task title (required, less than 200 characters)
    pub title: String,
    /// Optional description
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DoneArgs {
    /// Server-assigned task id
    pub id: i64,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => cmd_default().await,
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "taskdeck", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => {
                println!("{}", config::get_value_string(&get.key)?);
                Ok(ExitCode::SUCCESS)
            }
        },
        Some(Commands::List(args)) => cmd_list(args).await,
        Some(Commands::Add(args)) => cmd_add(args).await,
        Some(Commands::Done(args)) => cmd_done(args).await,
        Some(Commands::Version) => Ok(cmd_version()),
    }
}

async fn cmd_default() -> anyhow::Result<ExitCode> {
    let cfg = config::load()?;

    if tui::is_tty() {
        crate::tui::app::run(cfg).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Non-TTY fallback: one fetch, plain table.
    cmd_list(ListArgs {
        verbose: false,
        json: false,
        csv: false,
    })
    .await
}

fn load_store() -> anyhow::Result<TaskStore<TaskClient>> {
    let cfg = config::load()?;
    let client = TaskClient::from_config(&cfg)?;
    Ok(TaskStore::new(client))
}

async fn cmd_list(args: ListArgs) -> anyhow::Result<ExitCode> {
    let store = load_store()?;
    store.fetch().await?;
    let tasks = store.snapshot().await.tasks;

    if args.json {
        let mut out = serde_json::to_string_pretty(&tasks)?;
        out.push('\n');
        print!("{out}");
        return Ok(ExitCode::SUCCESS);
    }

    if args.csv {
        let mut t = Table::new(["id", "title", "description", "created_at"]);
        for task in &tasks {
            t.row([
                task.id.to_string(),
                task.title.clone(),
                task.description.clone().unwrap_or_default(),
                task.created_at.clone(),
            ]);
        }
        t.write_csv()?;
        return Ok(ExitCode::SUCCESS);
    }

    print_task_table(&tasks, args.verbose)?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_add(args: AddArgs) -> anyhow::Result<ExitCode> {
    // Validate before touching the network; the transport is never called
    // for an invalid title.
    validate_title(&args.title)?;
    let request = TaskRequest::new(args.title, args.description)?;

    let store = load_store()?;
    store.create(request).await?;

    let state = store.snapshot().await;
    if let Some(msg) = state.success_message {
        println!("{msg}");
    }

    // Create-then-refetch: the new row only shows up via a fresh fetch.
    store.fetch().await?;
    let count = store.snapshot().await.tasks.len();
    println!("{count} open task(s)");
    Ok(ExitCode::SUCCESS)
}

async fn cmd_done(args: DoneArgs) -> anyhow::Result<ExitCode> {
    let store = load_store()?;
    store.complete(args.id).await?;

    let state = store.snapshot().await;
    if let Some(msg) = state.success_message {
        println!("{msg}");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_task_table(tasks: &[Task], verbose: bool) -> anyhow::Result<()> {
    if tasks.is_empty() {
        println!("No tasks found");
        return Ok(());
    }

    if verbose {
        let mut t = Table::new(["ID", "TITLE", "DESCRIPTION", "CREATED"]);
        for task in tasks {
            t.row([
                task.id.to_string(),
                task.title.clone(),
                task.description.clone().unwrap_or_else(|| "-".to_owned()),
                task.created_at.clone(),
            ]);
        }
        t.print()?;
    } else {
        let mut t = Table::new(["ID", "TITLE", "CREATED"]);
        for task in tasks {
            t.row([
                task.id.to_string(),
                task.title.clone(),
                format_created(&task.created_at),
            ]);
        }
        t.print()?;
    }

    Ok(())
}

/// Renders the server's creation timestamp as a relative age when it parses,
/// the raw string otherwise.
fn format_created(created_at: &str) -> String {
    let format = time::format_description::well_known::Iso8601::DEFAULT;
    let Ok(t) = time::PrimitiveDateTime::parse(created_at, &format) else {
        return created_at.to_owned();
    };

    let now = time::OffsetDateTime::now_utc();
    let diff = now - t.assume_utc();
    if diff < time::Duration::minutes(1) {
        "just now".to_owned()
    } else if diff < time::Duration::hours(1) {
        let mins = diff.whole_minutes();
        if mins == 1 {
            "1 min ago".to_owned()
        } else {
            format!("{mins} mins ago")
        }
    } else if diff < time::Duration::days(1) {
        let hours = diff.whole_hours();
        if hours == 1 {
            "1 hour ago".to_owned()
        } else {
            format!("{hours} hours ago")
        }
    } else if diff < time::Duration::days(7) {
        let days = diff.whole_days();
        if days == 1 {
            "1 day ago".to_owned()
        } else {
            format!("{days} days ago")
        }
    } else {
        t.date().to_string()
    }
}

fn cmd_version() -> ExitCode {
    println!("taskdeck version {}", env!("CARGO_PKG_VERSION"));
    if let Some(commit) = option_env!("TASKDECK_GIT_COMMIT") {
        println!("  commit: {commit}");
    }
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_age_falls_back_to_raw_string() {
        assert_eq!(format_created("not-a-timestamp"), "not-a-timestamp");
    }

    #[test]
    fn relative_age_for_recent_timestamps() {
        let then = time::OffsetDateTime::now_utc() - time::Duration::minutes(5);
        let raw = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            then.year(),
            u8::from(then.month()),
            then.day(),
            then.hour(),
            then.minute(),
            then.second()
        );
        assert_eq!(format_created(&raw), "5 mins ago");
    }
}
