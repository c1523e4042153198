/*
[INPUT]:  CLI arguments, YAML configuration, OS shutdown signals
[OUTPUT]: Executed task/auth commands against the stride backend
[POS]:    Binary entry point and composition root
[UPDATE]: When changing CLI commands, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use stride_cli::{AppConfig, FileVault, Profile, TaskStore};
use stride_client::slug::generate_task_slug;
use stride_client::{
    AddStepRequest, ApiGateway, AuthSessionManager, IdentityClient, PollConfig, Preferences,
    QueuePoller, Session, SessionStore, StrideError, TaskQuery, TaskStatus, TaskUpdate,
};

#[derive(Parser, Debug)]
#[command(name = "stride", version, about = "Task and step client for the stride backend")]
struct Cli {
    /// Config file; defaults to <config dir>/stride/config.yaml
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Overrides the log filter from the config file
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        email: Option<String>,
    },
    /// Create an account
    Signup {
        email: Option<String>,
    },
    /// Sign out and clear local state
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List tasks
    Tasks {
        /// Filter: active, completed, or archived
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Lightweight task rows with step progress
    Summary,
    /// Generate a new task (and its steps) from a prompt
    Create {
        prompt: String,
    },
    /// Duplicate a task; steps are regenerated
    Duplicate {
        task_id: String,
    },
    /// Rewrite a task's title and steps
    Rewrite {
        task_id: String,
    },
    /// Archive or rename a task
    Update {
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Show the steps of a task
    Steps {
        task_id: String,
        #[arg(long)]
        metadata: bool,
    },
    /// Mark a step complete (or not, with --undo)
    CompleteStep {
        step_id: String,
        #[arg(long)]
        undo: bool,
    },
    /// Generate an additional step from a prompt
    AddStep {
        task_id: String,
        prompt: String,
        /// Step id to insert after; appended when absent
        #[arg(long = "after")]
        insert_after: Option<String>,
    },
    /// Split a step into smaller steps
    SplitStep {
        step_id: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Rewrite a single step
    RewriteStep {
        step_id: String,
    },
    /// Set or clear the note on a step
    Note {
        step_id: String,
        note: Option<String>,
        #[arg(long)]
        clear: bool,
    },
    /// Show or update preferences
    Prefs {
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        view: Option<String>,
        #[arg(long)]
        notifications: Option<bool>,
    },
}

/// Everything a command handler needs, wired once at startup.
struct App {
    gateway: Arc<ApiGateway>,
    manager: Arc<AuthSessionManager>,
    vault: Arc<FileVault>,
    store: TaskStore,
    shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config_path = match &args.config_path {
        Some(path) => path.clone(),
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::from_file(&config_path)?;

    let _log_guard = init_tracing(&config, args.log_level.as_deref())?;
    info!(config_path = %config_path.display(), "starting stride");

    let app = App::build(&config)?;
    setup_signal_handlers(app.shutdown.clone());

    app.startup_resume().await;
    app.run(args.command).await
}

impl App {
    fn build(config: &AppConfig) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let vault = Arc::new(FileVault::new(&data_dir));

        let sessions = SessionStore::new();
        let identity = IdentityClient::new(&config.identity_base_url, &config.api_key)
            .context("construct identity client")?;
        let manager = AuthSessionManager::new(identity, sessions.clone(), vault.clone());

        let gateway = Arc::new(
            ApiGateway::new(&config.api_base_url, &config.api_key, sessions)
                .context("construct api gateway")?,
        );
        gateway.set_session_hooks(manager.clone());

        let store = TaskStore::new(gateway.clone());

        Ok(Self {
            gateway,
            manager,
            vault,
            store,
            shutdown: CancellationToken::new(),
        })
    }

    /// Restore the persisted session and run the resume validation
    /// path. A rejected session leaves us signed out; a network failure
    /// keeps the restored session.
    async fn startup_resume(&self) {
        if self.manager.restore_session().await.is_none() {
            return;
        }
        match self.manager.handle_resume().await {
            Ok(()) => {}
            Err(StrideError::SessionExpired) => {
                self.vault.clear_profile().await.ok();
                eprintln!("Session expired, please sign in again");
            }
            Err(err) => warn!(error = %err, "resume validation failed"),
        }
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { email } => self.login(email).await,
            Command::Signup { email } => self.signup(email).await,
            Command::Logout => self.logout().await,
            Command::Whoami => self.whoami().await,
            Command::Tasks {
                status,
                limit,
                offset,
            } => self.list_tasks(status, limit, offset).await,
            Command::Summary => self.summary().await,
            Command::Create { prompt } => self.create_task(&prompt).await,
            Command::Duplicate { task_id } => self.duplicate_task(&task_id).await,
            Command::Rewrite { task_id } => self.rewrite_task(&task_id).await,
            Command::Update {
                task_id,
                title,
                status,
            } => self.update_task(&task_id, title, status).await,
            Command::Steps { task_id, metadata } => self.steps(&task_id, metadata).await,
            Command::CompleteStep { step_id, undo } => self.complete_step(&step_id, !undo).await,
            Command::AddStep {
                task_id,
                prompt,
                insert_after,
            } => self.add_step(&task_id, &prompt, insert_after).await,
            Command::SplitStep { step_id, context } => {
                self.split_step(&step_id, context.as_deref()).await
            }
            Command::RewriteStep { step_id } => self.rewrite_step(&step_id).await,
            Command::Note {
                step_id,
                note,
                clear,
            } => self.note(&step_id, note, clear).await,
            Command::Prefs {
                theme,
                view,
                notifications,
            } => self.prefs(theme, view, notifications).await,
        }
    }

    fn require_session(&self) -> Result<Session> {
        self.manager
            .current_session()
            .ok_or_else(|| anyhow!("not signed in; run `stride login`"))
    }

    async fn adopt_profile(&self, session: &Session, email: &str) {
        let profile = Profile {
            user_id: session.user_id.clone(),
            email: Some(email.to_string()),
            signed_in_at: Utc::now(),
        };
        if let Err(err) = self.vault.store_profile(&profile).await {
            warn!(error = %err, "failed to persist profile");
        }
    }

    async fn login(&self, email: Option<String>) -> Result<()> {
        let email = prompt_email(email)?;
        let password = Password::new()
            .with_prompt("Password")
            .interact()
            .context("read password")?;

        let session = self.manager.sign_in(&email, &password).await?;
        self.adopt_profile(&session, &email).await;
        println!("Signed in as {email}");
        Ok(())
    }

    async fn signup(&self, email: Option<String>) -> Result<()> {
        let email = prompt_email(email)?;
        let password = Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .context("read password")?;

        let result = self.manager.sign_up(&email, &password).await?;
        if result.confirmation_required {
            println!("Check {email} for a confirmation link, then run `stride login`");
            return Ok(());
        }
        if let Some(session) = result.session {
            self.adopt_profile(&session, &email).await;
            println!("Account created; signed in as {email}");
        }
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.manager.sign_out().await;
        self.vault.clear_profile().await.ok();
        println!("Signed out");
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        match self.vault.load_profile().await {
            Some(profile) => {
                let email = profile.email.as_deref().unwrap_or("<unknown>");
                println!("{} ({})", email, profile.user_id);
                println!("signed in at {}", profile.signed_in_at.to_rfc3339());
            }
            None => match self.manager.current_session() {
                Some(session) => println!("{}", session.user_id),
                None => println!("not signed in"),
            },
        }
        Ok(())
    }

    async fn list_tasks(
        &self,
        status: Option<String>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<()> {
        let session = self.require_session()?;
        let query = TaskQuery {
            status: status.as_deref().map(parse_status).transpose()?,
            limit,
            offset,
        };

        let tasks = self.store.refresh_tasks(&session.user_id, query).await?;
        if tasks.is_empty() {
            println!("no tasks");
            return Ok(());
        }
        for task in tasks {
            let slug = generate_task_slug(&task.title, &task.id);
            println!("{:<10} {:<24} {}", task.status.as_query_value(), slug, task.title);
        }
        Ok(())
    }

    async fn summary(&self) -> Result<()> {
        let session = self.require_session()?;
        let rows = self.gateway.get_tasks_summary(&session.user_id).await?;
        for row in rows {
            println!(
                "{:<10} {:>3}/{:<3} {}",
                row.status.as_query_value(),
                row.completed_step_count,
                row.step_count,
                row.title
            );
        }
        Ok(())
    }

    async fn create_task(&self, prompt: &str) -> Result<()> {
        self.require_session()?;
        let queue_ref = self.gateway.create_task(prompt).await?;
        info!(queue_id = %queue_ref.queue_id, "task generation enqueued");
        println!("Generating task...");

        let result = self.wait_for_job(&queue_ref.queue_id, PollConfig::unbounded()).await?;
        match result.get("task_id").and_then(|v| v.as_str()) {
            Some(task_id) => println!("Task created: {task_id}"),
            None => println!("Task created"),
        }
        Ok(())
    }

    async fn duplicate_task(&self, task_id: &str) -> Result<()> {
        let session = self.require_session()?;
        let task_id = self.store.resolve_task_id(&session.user_id, task_id).await?;
        let queue_ref = self.gateway.duplicate_task(&task_id).await?;
        println!("Duplicating task...");
        self.wait_for_job(&queue_ref.queue_id, PollConfig::unbounded()).await?;
        println!("Task duplicated");
        Ok(())
    }

    async fn rewrite_task(&self, task_id: &str) -> Result<()> {
        let session = self.require_session()?;
        let task_id = self.store.resolve_task_id(&session.user_id, task_id).await?;
        let queue_ref = self.gateway.rewrite_task(&task_id).await?;
        println!("Rewriting task...");
        self.wait_for_job(&queue_ref.queue_id, PollConfig::unbounded()).await?;
        println!("Task rewritten");
        Ok(())
    }

    async fn update_task(
        &self,
        task_id: &str,
        title: Option<String>,
        status: Option<String>,
    ) -> Result<()> {
        let session = self.require_session()?;
        if title.is_none() && status.is_none() {
            bail!("nothing to update; pass --title or --status");
        }
        let task_id = self.store.resolve_task_id(&session.user_id, task_id).await?;
        let update = TaskUpdate {
            title,
            status: status.as_deref().map(parse_status).transpose()?,
            ..TaskUpdate::default()
        };
        let task = self.gateway.update_task(&task_id, &update).await?;
        println!("Updated {}", task.id);
        Ok(())
    }

    async fn steps(&self, task_id: &str, metadata: bool) -> Result<()> {
        let session = self.require_session()?;
        let task_id = self.store.resolve_task_id(&session.user_id, task_id).await?;
        let response = self.gateway.get_task_steps(&task_id, metadata).await?;
        for step in response.steps {
            let mark = if step.is_completed { "x" } else { " " };
            println!("[{mark}] {:<12} {}", step.id, step.title);
            if metadata {
                if let Some(description) = step.description {
                    println!("      {description}");
                }
            }
            if let Some(note) = step.note {
                println!("      note: {note}");
            }
        }
        Ok(())
    }

    async fn complete_step(&self, step_id: &str, completed: bool) -> Result<()> {
        self.require_session()?;
        let step = self.store.set_step_completed(step_id, completed).await?;
        let verb = if completed { "completed" } else { "reopened" };
        println!("{verb} {}", step.title);
        Ok(())
    }

    async fn add_step(
        &self,
        task_id: &str,
        prompt: &str,
        insert_after: Option<String>,
    ) -> Result<()> {
        let session = self.require_session()?;
        let task_id = self.store.resolve_task_id(&session.user_id, task_id).await?;
        let request = AddStepRequest {
            task_id: task_id.clone(),
            prompt: prompt.to_string(),
            insert_after_step_id: insert_after,
        };
        let queue_ref = self.gateway.add_step(&request).await?;
        println!("Generating step...");
        self.wait_for_job(&queue_ref.queue_id, PollConfig::bounded()).await?;
        self.show_refreshed_steps(&task_id).await
    }

    async fn split_step(&self, step_id: &str, context: Option<&str>) -> Result<()> {
        self.require_session()?;
        let queue_ref = self.gateway.split_step(step_id, context).await?;
        println!("Splitting step...");
        let result = self.wait_for_job(&queue_ref.queue_id, PollConfig::bounded()).await?;
        match result.get("task_id").and_then(|v| v.as_str()) {
            Some(task_id) => self.show_refreshed_steps(task_id).await,
            None => {
                println!("Step split");
                Ok(())
            }
        }
    }

    async fn rewrite_step(&self, step_id: &str) -> Result<()> {
        self.require_session()?;
        let queue_ref = self.gateway.rewrite_step(step_id).await?;
        println!("Rewriting step...");
        self.wait_for_job(&queue_ref.queue_id, PollConfig::bounded()).await?;
        println!("Step rewritten");
        Ok(())
    }

    async fn note(&self, step_id: &str, note: Option<String>, clear: bool) -> Result<()> {
        self.require_session()?;
        if clear {
            self.gateway.delete_step_note(step_id).await?;
            println!("Note cleared");
            return Ok(());
        }
        let note = note.ok_or_else(|| anyhow!("pass a note or --clear"))?;
        self.gateway.update_step_note(step_id, &note).await?;
        println!("Note saved");
        Ok(())
    }

    async fn prefs(
        &self,
        theme: Option<String>,
        view: Option<String>,
        notifications: Option<bool>,
    ) -> Result<()> {
        self.require_session()?;

        let preferences = if theme.is_none() && view.is_none() && notifications.is_none() {
            self.gateway.get_preferences().await?
        } else {
            let mut preferences = self.gateway.get_preferences().await?;
            if theme.is_some() {
                preferences.theme = theme;
            }
            if view.is_some() {
                preferences.default_task_view = view;
            }
            if notifications.is_some() {
                preferences.notifications_enabled = notifications;
            }
            self.gateway.update_preferences(&preferences).await?
        };
        print_preferences(&preferences);
        Ok(())
    }

    /// Poll a queue job to its terminal state, honoring Ctrl-C. A
    /// cancelled poll does not mean the job failed; the server keeps
    /// working on it.
    async fn wait_for_job(
        &self,
        queue_id: &str,
        config: PollConfig,
    ) -> Result<serde_json::Value> {
        let poller = QueuePoller::new(self.gateway.clone(), config);
        match poller.wait(queue_id, &self.shutdown).await {
            Ok(result) => Ok(result),
            Err(StrideError::Cancelled) => {
                println!("Cancelled; the job may still complete server-side");
                Err(anyhow!("interrupted"))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn show_refreshed_steps(&self, task_id: &str) -> Result<()> {
        let steps = self.store.refresh_steps(task_id).await?;
        for step in steps {
            let mark = if step.is_completed { "x" } else { " " };
            println!("[{mark}] {:<12} {}", step.id, step.title);
        }
        Ok(())
    }
}

fn prompt_email(email: Option<String>) -> Result<String> {
    match email {
        Some(email) => Ok(email),
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .context("read email"),
    }
}

fn parse_status(value: &str) -> Result<TaskStatus> {
    match value {
        "active" => Ok(TaskStatus::Active),
        "completed" => Ok(TaskStatus::Completed),
        "archived" => Ok(TaskStatus::Archived),
        other => bail!("unknown status '{other}'; expected active, completed, or archived"),
    }
}

fn print_preferences(preferences: &Preferences) {
    println!("theme:         {}", preferences.theme.as_deref().unwrap_or("default"));
    println!(
        "task view:     {}",
        preferences.default_task_view.as_deref().unwrap_or("default")
    );
    println!(
        "notifications: {}",
        preferences
            .notifications_enabled
            .map(|on| if on { "on" } else { "off" })
            .unwrap_or("default")
    );
}

fn init_tracing(
    config: &AppConfig,
    override_level: Option<&str>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let directive = override_level.unwrap_or(&config.log.level);
    let filter = EnvFilter::try_new(directive).context("invalid log level")?;

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &config.log.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "stride.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
                .map_err(|err| anyhow!(err))
                .context("initialize tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()
                .map_err(|err| anyhow!(err))
                .context("initialize tracing subscriber")?;
            Ok(None)
        }
    }
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown.cancel();
    });
}
