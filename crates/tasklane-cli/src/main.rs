//! tasklane - a terminal front-end for the task backend.
//!
//! Session handling, token storage and every API call live in
//! `tasklane-core`; this binary parses arguments, prompts for credentials and
//! prints results.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use tasklane_core::api::ApiError;
use tasklane_core::auth::SessionState;
use tasklane_core::models::{NewTask, Task, TaskFilter, TaskStatus};
use tasklane_core::utils::{format_due_date, format_remaining, truncate_string};
use tasklane_core::{AppContext, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Width of the title column in task listings.
const TITLE_COLUMN_WIDTH: usize = 40;

/// Log file name prefix; the appender adds the date.
const LOG_FILE_PREFIX: &str = "tasklane.log";

const USAGE: &str = "\
Usage: tasklane <command>

Commands:
  login [email]                 Sign in (prompts for password)
  register <name> <email>       Create an account and sign in
  logout                        Sign out and forget stored credentials
  renew                         Exchange the current session for a fresh token
  whoami                        Show the signed-in identity
  status                        Show session state and expiry
  tasks [list] [--pending|--completed]
  tasks add <title> [description]
  tasks done <id>               Toggle completion
  tasks rm <id>                 Delete a task
";

/// Initialize the tracing subscriber for logging.
/// The returned guard must be held until exit so buffered file logs are flushed.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_to_file.then(Config::log_dir) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    let _log_guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprint!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "help" | "-h" | "--help") {
        print!("{}", USAGE);
        return Ok(());
    }

    let ctx = AppContext::from_config(&config)?;
    info!(command, "tasklane starting");

    let result = match command {
        "login" => login(&ctx, &mut config, args.get(1).cloned()).await,
        "register" => register(&ctx, &mut config, &args[1..]).await,
        "logout" => {
            ctx.session.logout().await;
            println!("Logged out.");
            Ok(())
        }
        "renew" => {
            let identity = ctx.session.renew().await?;
            println!("Session renewed for {}", identity.display_name());
            Ok(())
        }
        "whoami" => whoami(&ctx),
        "status" => status(&ctx, &config),
        "tasks" => tasks(&ctx, &args[1..]).await,
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    };

    result.map_err(explain)
}

/// Turn API failures into the hint a user needs next.
fn explain(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::AuthenticationRequired) => {
            anyhow::anyhow!("Not logged in. Run `tasklane login` first.")
        }
        Some(api_err) if api_err.is_unauthorized() => anyhow::anyhow!(
            "{}. Your session was rejected; run `tasklane login` again.",
            api_err
        ),
        _ => err,
    }
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn prompt_password(label: &str) -> Result<String> {
    rpassword::prompt_password(label).context("Failed to read password")
}

// ===== Session Commands =====

async fn login(ctx: &AppContext, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    if email.is_empty() {
        bail!("Email is required");
    }
    let password = prompt_password(&format!("Password for {}: ", email))?;

    let identity = ctx.session.login(&email, &password).await?;
    println!("Logged in as {} ({})", identity.display_name(), identity.email);

    remember_email(config, &email);
    Ok(())
}

async fn register(ctx: &AppContext, config: &mut Config, args: &[String]) -> Result<()> {
    let (name, email) = match args {
        [name, email, ..] => (name.clone(), email.clone()),
        _ => bail!("Usage: tasklane register <name> <email>"),
    };
    let password = prompt_password("Choose a password: ")?;
    let confirm = prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let identity = ctx.session.register(&name, &email, &password).await?;
    println!("Registered and logged in as {}", identity.display_name());

    remember_email(config, &email);
    Ok(())
}

fn remember_email(config: &mut Config, email: &str) {
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }
}

fn whoami(ctx: &AppContext) -> Result<()> {
    match ctx.session.identity() {
        Some(identity) => {
            println!("{}", identity.display_name());
            println!("  id:    {}", identity.id);
            println!("  email: {}", identity.email);
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

fn status(ctx: &AppContext, config: &Config) -> Result<()> {
    println!("Server:  {}", config.api_base_url);
    println!("Storage: {:?}", config.storage);

    match ctx.session.state() {
        SessionState::Anonymous => println!("Session: anonymous"),
        SessionState::Active => {
            println!("Session: active");
            if let Some(expires_at) = ctx.session.expires_at() {
                println!("Expires: {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if let Some(remaining) = ctx.session.time_until_expiry() {
                println!("Remaining: {}", format_remaining(remaining));
            }
            if ctx.session.needs_refresh() {
                println!("Session expires soon; run `tasklane renew` to extend it.");
            }
        }
    }
    Ok(())
}

// ===== Task Commands =====

/// A parsed `tasks` subcommand.
#[derive(Debug, PartialEq)]
enum TasksCommand {
    List(Option<TaskStatus>),
    Add {
        title: String,
        description: Option<String>,
    },
    Toggle(i64),
    Remove(i64),
}

impl TasksCommand {
    /// Parse the arguments after `tasks`. No arguments lists everything.
    fn parse(args: &[String]) -> Result<Self> {
        let (sub, rest) = match args.split_first() {
            Some((sub, rest)) => (sub.as_str(), rest),
            None => return Ok(TasksCommand::List(None)),
        };
        match sub {
            "list" => parse_list_flags(rest),
            "--pending" | "--completed" => parse_list_flags(args),
            "add" => {
                let title = rest
                    .first()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        anyhow::anyhow!("Usage: tasklane tasks add <title> [description]")
                    })?;
                Ok(TasksCommand::Add {
                    title: title.to_string(),
                    description: rest.get(1).cloned(),
                })
            }
            "done" => Ok(TasksCommand::Toggle(parse_id(rest.first())?)),
            "rm" => Ok(TasksCommand::Remove(parse_id(rest.first())?)),
            other => bail!("Unknown tasks command '{}'\n\n{}", other, USAGE),
        }
    }
}

fn parse_list_flags(flags: &[String]) -> Result<TasksCommand> {
    let mut status = None;
    for flag in flags {
        status = match flag.as_str() {
            "--pending" => Some(TaskStatus::Pending),
            "--completed" => Some(TaskStatus::Completed),
            other => bail!("Unknown flag '{}'", other),
        };
    }
    Ok(TasksCommand::List(status))
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow::anyhow!("A task id is required"))?;
    raw.parse()
        .with_context(|| format!("'{}' is not a task id", raw))
}

async fn tasks(ctx: &AppContext, args: &[String]) -> Result<()> {
    match TasksCommand::parse(args)? {
        TasksCommand::List(status) => list_tasks(ctx, status).await,
        TasksCommand::Add { title, description } => {
            let mut task = NewTask::new(title);
            if let Some(description) = description {
                task = task.with_description(description);
            }
            let created = ctx.api.create_task(&task).await?;
            println!("Created task #{}: {}", created.id, created.title);
            Ok(())
        }
        TasksCommand::Toggle(id) => {
            let task = ctx.api.toggle_task(id).await?;
            let state = if task.completed { "completed" } else { "pending" };
            println!("Task #{} is now {}", task.id, state);
            Ok(())
        }
        TasksCommand::Remove(id) => {
            ctx.api.delete_task(id).await?;
            println!("Deleted task #{}", id);
            Ok(())
        }
    }
}

async fn list_tasks(ctx: &AppContext, status: Option<TaskStatus>) -> Result<()> {
    let filter = TaskFilter {
        status,
        ..TaskFilter::default()
    };

    let tasks = ctx.api.list_tasks(&filter).await?;
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for task in &tasks {
        println!("{}", task_row(task));
    }
    Ok(())
}

fn task_row(task: &Task) -> String {
    format!(
        "{:>5}  [{}]  {:<width$}  {}",
        task.id,
        if task.completed { "x" } else { " " },
        truncate_string(&task.title, TITLE_COLUMN_WIDTH),
        format_due_date(task.due_date),
        width = TITLE_COLUMN_WIDTH
    )
}
