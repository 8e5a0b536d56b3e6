mod commands;
mod config;
mod server;
mod tls;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_event_add, cmd_event_calendar, cmd_event_delete, cmd_event_list, cmd_event_upcoming,
    cmd_export, cmd_finance_add, cmd_finance_balance, cmd_finance_delete, cmd_finance_list,
    cmd_focus_start, cmd_focus_stats, cmd_goal_add, cmd_goal_delete, cmd_goal_list,
    cmd_goal_progress, cmd_habit_add, cmd_habit_delete, cmd_habit_list, cmd_habit_toggle,
    cmd_history, cmd_import, cmd_note_add, cmd_note_delete, cmd_note_list, cmd_note_show,
    cmd_shop_add, cmd_shop_clear, cmd_shop_delete, cmd_shop_list, cmd_shop_toggle,
    cmd_subtask_add, cmd_subtask_delete, cmd_subtask_toggle, cmd_summary, cmd_task_add,
    cmd_task_delete, cmd_task_list, cmd_task_show, cmd_task_toggle, cmd_water_log,
    cmd_water_set_weight, cmd_water_show, cmd_weekly,
};
use crate::config::Config;
use cadence_core::service::CadenceService;

#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "A personal productivity tracker CLI",
    long_about = "\n\n   ██████╗ █████╗ ██████╗ ███████╗███╗   ██╗ ██████╗███████╗
  ██╔════╝██╔══██╗██╔══██╗██╔════╝████╗  ██║██╔════╝██╔════╝
  ██║     ███████║██║  ██║█████╗  ██╔██╗ ██║██║     █████╗
  ██║     ██╔══██║██║  ██║██╔══╝  ██║╚██╗██║██║     ██╔══╝
  ╚██████╗██║  ██║██████╔╝███████╗██║ ╚████║╚██████╗███████╗
   ╚═════╝╚═╝  ╚═╝╚═════╝ ╚══════╝╚═╝  ╚═══╝ ╚═════╝╚══════╝
        your day, in rhythm.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tasks and subtasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage the shopping list
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Track income and expenses
    Finance {
        #[command(subcommand)]
        command: FinanceCommands,
    },
    /// Keep quick notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Track daily habits and streaks
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
    /// Track longer-term goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Manage calendar events
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Log water intake
    Water {
        #[command(subcommand)]
        command: WaterCommands,
    },
    /// Pomodoro focus sessions
    Focus {
        #[command(subcommand)]
        command: FocusCommands,
    },
    /// Show the day's dashboard (defaults to today)
    Summary {
        /// Date to show (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show daily water/focus history for the last N days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weekly totals for the last N weeks
    Weekly {
        /// Number of weeks to show
        #[arg(short, long, default_value = "8")]
        weeks: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export all data as JSON (to a file or stdout)
    Export {
        /// Destination file (default: stdout)
        file: Option<std::path::PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a previously exported JSON backup
    Import {
        /// Path to the export file
        file: std::path::PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
        /// Enable TLS (HTTPS). Generates a self-signed certificate on first use.
        #[arg(long)]
        tls: bool,
        /// Path to TLS certificate file (PEM). Implies --tls.
        #[arg(long, value_name = "PATH")]
        tls_cert: Option<std::path::PathBuf>,
        /// Path to TLS private key file (PEM). Implies --tls.
        #[arg(long, value_name = "PATH")]
        tls_key: Option<std::path::PathBuf>,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a task
    Add {
        /// Task text
        text: String,
        /// Priority: low, medium, high
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all tasks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a task with its subtasks
    Show {
        /// Task ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a task done/undone
    Toggle {
        /// Task ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a task (and its subtasks)
    Delete {
        /// Task ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage subtasks
    Sub {
        #[command(subcommand)]
        command: SubtaskCommands,
    },
}

#[derive(Subcommand)]
enum SubtaskCommands {
    /// Add a subtask to a task
    Add {
        /// Parent task ID
        task_id: i64,
        /// Subtask text
        text: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a subtask done/undone
    Toggle {
        /// Subtask ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a subtask
    Delete {
        /// Subtask ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Add an item to the list
    Add {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the shopping list
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle an item bought/not bought
    Toggle {
        /// Item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an item
    Delete {
        /// Item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove all bought items
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FinanceCommands {
    /// Record a transaction (negative amount = expense)
    Add {
        /// Description
        description: String,
        /// Amount (positive = income, negative = expense)
        #[arg(allow_hyphen_values = true)]
        amount: f64,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all transactions
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show income/expense/net totals
    Balance {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Save a note
    Add {
        /// Note content
        content: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all notes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a note in full
    Show {
        /// Note ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a note
    Delete {
        /// Note ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Add a habit
    Add {
        /// Habit name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List habits with current streaks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a habit done/undone for today
    Toggle {
        /// Habit ID
        id: i64,
        /// Toggle a specific date instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a habit
    Delete {
        /// Habit ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Add a goal
    Add {
        /// Goal title
        title: String,
        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Period: weekly, monthly, yearly
        #[arg(long, default_value = "monthly")]
        period: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List goals with progress
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a goal's progress (0-100)
    Progress {
        /// Goal ID
        id: i64,
        /// Progress percentage
        progress: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a goal
    Delete {
        /// Goal ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum EventCommands {
    /// Add a calendar event
    Add {
        /// Event title
        title: String,
        /// Date (YYYY-MM-DD or today/tomorrow)
        date: String,
        /// Time (HH:MM, 24h)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List events (optionally for one month)
    List {
        /// Restrict to a month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the next upcoming events
    Upcoming {
        /// How many events to show
        #[arg(short, long, default_value = "5")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a month calendar with event markers
    Calendar {
        /// Month to render (YYYY-MM, default: current)
        month: Option<String>,
    },
    /// Delete an event
    Delete {
        /// Event ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WaterCommands {
    /// Log water intake in milliliters
    Log {
        /// Amount in ml
        ml: i64,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show progress toward the daily goal
    Show {
        /// Date (default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set body weight to derive the daily goal (35 ml per kg)
    SetWeight {
        /// Weight in kg
        weight_kg: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FocusCommands {
    /// Run a focus countdown in the foreground
    Start {
        /// Session length in minutes (default: 25)
        #[arg(short, long)]
        minutes: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show focus minutes and cycles for the last N days
    Stats {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = CadenceService::open(&config.db_path)?;

    match cli.command {
        Commands::Task { command } => match command {
            TaskCommands::Add {
                text,
                priority,
                json,
            } => cmd_task_add(&svc, &text, &priority, json),
            TaskCommands::List { json } => cmd_task_list(&svc, json),
            TaskCommands::Show { id, json } => cmd_task_show(&svc, id, json),
            TaskCommands::Toggle { id, json } => cmd_task_toggle(&svc, id, json),
            TaskCommands::Delete { id, json } => cmd_task_delete(&svc, id, json),
            TaskCommands::Sub { command } => match command {
                SubtaskCommands::Add {
                    task_id,
                    text,
                    json,
                } => cmd_subtask_add(&svc, task_id, &text, json),
                SubtaskCommands::Toggle { id, json } => cmd_subtask_toggle(&svc, id, json),
                SubtaskCommands::Delete { id, json } => cmd_subtask_delete(&svc, id, json),
            },
        },
        Commands::Shop { command } => match command {
            ShopCommands::Add { name, json } => cmd_shop_add(&svc, &name, json),
            ShopCommands::List { json } => cmd_shop_list(&svc, json),
            ShopCommands::Toggle { id, json } => cmd_shop_toggle(&svc, id, json),
            ShopCommands::Delete { id, json } => cmd_shop_delete(&svc, id, json),
            ShopCommands::Clear { json } => cmd_shop_clear(&svc, json),
        },
        Commands::Finance { command } => match command {
            FinanceCommands::Add {
                description,
                amount,
                date,
                json,
            } => cmd_finance_add(&svc, &description, amount, date, json),
            FinanceCommands::List { json } => cmd_finance_list(&svc, json),
            FinanceCommands::Balance { json } => cmd_finance_balance(&svc, json),
            FinanceCommands::Delete { id, json } => cmd_finance_delete(&svc, id, json),
        },
        Commands::Note { command } => match command {
            NoteCommands::Add { content, json } => cmd_note_add(&svc, &content, json),
            NoteCommands::List { json } => cmd_note_list(&svc, json),
            NoteCommands::Show { id, json } => cmd_note_show(&svc, id, json),
            NoteCommands::Delete { id, json } => cmd_note_delete(&svc, id, json),
        },
        Commands::Habit { command } => match command {
            HabitCommands::Add { name, json } => cmd_habit_add(&svc, &name, json),
            HabitCommands::List { json } => cmd_habit_list(&svc, json),
            HabitCommands::Toggle { id, date, json } => cmd_habit_toggle(&svc, id, date, json),
            HabitCommands::Delete { id, json } => cmd_habit_delete(&svc, id, json),
        },
        Commands::Goal { command } => match command {
            GoalCommands::Add {
                title,
                description,
                period,
                json,
            } => cmd_goal_add(&svc, &title, &description, &period, json),
            GoalCommands::List { json } => cmd_goal_list(&svc, json),
            GoalCommands::Progress { id, progress, json } => {
                cmd_goal_progress(&svc, id, progress, json)
            }
            GoalCommands::Delete { id, json } => cmd_goal_delete(&svc, id, json),
        },
        Commands::Event { command } => match command {
            EventCommands::Add {
                title,
                date,
                time,
                json,
            } => cmd_event_add(&svc, &title, date, time, json),
            EventCommands::List { month, json } => cmd_event_list(&svc, month, json),
            EventCommands::Upcoming { limit, json } => cmd_event_upcoming(&svc, limit, json),
            EventCommands::Calendar { month } => cmd_event_calendar(&svc, month),
            EventCommands::Delete { id, json } => cmd_event_delete(&svc, id, json),
        },
        Commands::Water { command } => match command {
            WaterCommands::Log { ml, date, json } => cmd_water_log(&svc, ml, date, json),
            WaterCommands::Show { date, json } => cmd_water_show(&svc, date, json),
            WaterCommands::SetWeight { weight_kg, json } => {
                cmd_water_set_weight(&svc, weight_kg, json)
            }
        },
        Commands::Focus { command } => match command {
            FocusCommands::Start { minutes, json } => cmd_focus_start(&svc, minutes, json).await,
            FocusCommands::Stats { days, json } => cmd_focus_stats(&svc, days, json),
        },
        Commands::Summary { date, json } => cmd_summary(&svc, date, json),
        Commands::History { days, json } => cmd_history(&svc, days, json),
        Commands::Weekly { weeks, json } => cmd_weekly(&svc, weeks, json),
        Commands::Export { file, json } => cmd_export(&svc, file.as_deref(), json),
        Commands::Import { file, json } => cmd_import(&svc, &file, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
            tls,
            tls_cert,
            tls_key,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _new) = config.load_or_create_api_key()?;
                Some(key)
            };
            let tls_config = if tls || tls_cert.is_some() || tls_key.is_some() {
                let cert_path = tls_cert.map_or_else(tls::default_cert_path, Ok)?;
                let key_path = tls_key.map_or_else(tls::default_key_path, Ok)?;
                Some(server::TlsConfig {
                    cert_path,
                    key_path,
                })
            } else {
                None
            };
            server::start_server(svc, port, &bind, api_key, tls_config).await
        }
    }
}
