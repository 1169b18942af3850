use std::{collections::BTreeMap, io, path::PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;

use crate::{
    clock::{SystemClock, is_date_key, parse_date_key},
    config::Config,
    constants::{BREAK_LABEL, DATE_FORMAT},
    domain::{DayLedger, TimerState},
    engine::{IntervalTicker, TimerEngine},
    error::{CliError, StoreError},
    history::{HistoryIndex, summarize},
    store::{self, FileStore},
    time_format::format_duration,
};

#[derive(Parser, Debug)]
#[command(name = "daytimer")]
#[command(about = "Task timer with daily and lifetime totals", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Start timing a task")]
    Start {
        #[arg(help = "Task name (blank uses the default label)")]
        task: Option<String>,
    },

    #[command(about = "Pause the running task")]
    Pause,

    #[command(about = "Resume a paused task")]
    Resume,

    #[command(about = "Start or end a break")]
    Break,

    #[command(about = "Stop the timer and record the time")]
    Stop,

    #[command(about = "Show the timer state")]
    Status {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },

    #[command(about = "Show today's tasks and totals")]
    Today,

    #[command(about = "Remove a task entry from a day")]
    Remove {
        #[arg(help = "Task name")]
        task: String,

        #[arg(long, help = "Date (YYYY-MM-DD), defaults to today")]
        date: Option<String>,
    },

    #[command(about = "Clear all tasks and break time for a day")]
    Clear {
        #[arg(long, help = "Date (YYYY-MM-DD), defaults to today")]
        date: Option<String>,

        #[arg(long, help = "Confirm the clear")]
        yes: bool,
    },

    #[command(about = "List recorded days, or show one day")]
    History {
        #[arg(help = "Date (YYYY-MM-DD)")]
        date: Option<String>,
    },

    #[command(about = "Show a time report")]
    Report {
        #[arg(
            long,
            help = "Show last 7 days",
            conflicts_with = "month"
        )]
        week: bool,

        #[arg(
            long,
            help = "Show last 30 days",
            conflicts_with = "week"
        )]
        month: bool,
    },

    #[command(about = "List previously used tasks with lifetime totals")]
    Tasks,

    #[command(about = "Export recorded days")]
    Export {
        #[arg(long, value_enum, help = "Export format")]
        format: ExportFormat,

        #[arg(long, short, help = "Output path")]
        out: Option<PathBuf>,
    },

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(help = "Shell type (bash, zsh, fish)")]
        shell: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Today,
    Week,
    Month,
}

impl ReportPeriod {
    fn days(self) -> i64 {
        match self {
            ReportPeriod::Today => 1,
            ReportPeriod::Week => 7,
            ReportPeriod::Month => 30,
        }
    }

    fn title(self) -> &'static str {
        match self {
            ReportPeriod::Today => "Today's Report",
            ReportPeriod::Week => "Weekly Report",
            ReportPeriod::Month => "Monthly Report",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayExport {
    pub date: String,
    pub tasks: BTreeMap<String, u64>,
    pub break_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataExport {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub days: Vec<DayExport>,
    pub overall: BTreeMap<String, u64>,
}

pub fn open_engine(config: &Config) -> Result<TimerEngine, StoreError> {
    let store = FileStore::open(&config.data_dir())?;
    debug!(dir = %store.dir().display(), "store opened");
    Ok(TimerEngine::new(
        Box::new(store),
        Box::new(SystemClock),
        Box::new(IntervalTicker::new()),
        config.engine_settings(),
    ))
}

fn resolve_date(engine: &TimerEngine, date: Option<String>) -> Result<String, CliError> {
    match date {
        Some(date) if is_date_key(&date) => Ok(date),
        Some(date) => Err(CliError::InvalidDate(date)),
        None => Ok(engine.today()),
    }
}

fn print_status(engine: &mut TimerEngine, json: bool) -> Result<(), CliError> {
    let view = engine.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("State:   {}", view.state);
    if view.state != TimerState::Idle {
        println!("Task:    {}", view.label);
        println!("Elapsed: {}", view.elapsed);
    }
    println!(
        "Today:   {} work, {} break",
        format_duration(view.today_total_ms),
        format_duration(view.today.break_ms)
    );
    println!("Overall: {}", format_duration(view.overall_total_ms));
    Ok(())
}

fn print_day(day: &DayLedger) {
    println!("{}", day.date);
    println!("{}", "-".repeat(40));
    for (task, ms) in day.entries_by_duration() {
        println!("{:30} {}", task, format_duration(ms));
    }
    println!("{}", "-".repeat(40));
    println!("{:30} {}", "Total work time", format_duration(day.work_total_ms()));
    println!("{:30} {}", "Total break time", format_duration(day.break_ms));
}

pub fn report(engine: &TimerEngine, period: ReportPeriod) -> Result<(), CliError> {
    let today = engine.today();
    let to = parse_date_key(&today).ok_or_else(|| CliError::InvalidDate(today.clone()))?;
    let from = to - ChronoDuration::days(period.days() - 1);
    let from_key = from.format(DATE_FORMAT).to_string();

    let days = HistoryIndex::new(engine.store()).range(&from_key, &today)?;
    let summary = summarize(&days);

    println!("{} ({}..{})", period.title(), from_key, today);
    println!("{}", "-".repeat(40));
    for (task, ms) in &summary.entries {
        println!("{:30} {}", task, format_duration(*ms));
    }
    println!("{}", "-".repeat(40));
    println!("{:30} {}", "TOTAL", format_duration(summary.work_total_ms));
    println!("{:30} {}", "BREAKS", format_duration(summary.break_total_ms));
    Ok(())
}

pub fn build_export(engine: &TimerEngine) -> Result<DataExport, StoreError> {
    let days = HistoryIndex::new(engine.store()).all_days()?;
    Ok(DataExport {
        schema_version: 1,
        exported_at: Utc::now(),
        days: days
            .into_iter()
            .map(|day| DayExport {
                date: day.date,
                tasks: day.tasks,
                break_ms: day.break_ms,
            })
            .collect(),
        overall: engine.overall().totals(),
    })
}

pub fn export_csv(export: &DataExport) -> Result<String, CliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["date", "task", "milliseconds", "duration"])?;
    for day in &export.days {
        for (task, ms) in &day.tasks {
            let raw = ms.to_string();
            let formatted = format_duration(*ms);
            writer.write_record([
                day.date.as_str(),
                task.as_str(),
                raw.as_str(),
                formatted.as_str(),
            ])?;
        }
        if day.break_ms > 0 {
            let raw = day.break_ms.to_string();
            let formatted = format_duration(day.break_ms);
            writer.write_record([
                day.date.as_str(),
                BREAK_LABEL,
                raw.as_str(),
                formatted.as_str(),
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CliError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn export_data(
    engine: &TimerEngine,
    format: ExportFormat,
    out_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let export = build_export(engine)?;
    let content = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&export)?,
        ExportFormat::Csv => export_csv(&export)?,
    };

    if let Some(path) = out_path {
        store::atomic_write(&path, &content)?;
        println!("Exported to {}", path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

pub fn print_completions(shell: &str) -> Result<(), CliError> {
    use clap_complete::Shell;
    let shell = match shell {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        other => return Err(CliError::UnsupportedShell(other.to_string())),
    };
    clap_complete::generate(shell, &mut Cli::command(), "daytimer", &mut io::stdout());
    Ok(())
}

pub fn run_command(command: Command, config: &Config) -> Result<(), CliError> {
    if let Command::Completions { shell } = &command {
        return print_completions(shell);
    }

    let mut engine = open_engine(config)?;
    match command {
        Command::Completions { .. } => unreachable!("handled before the store is opened"),
        Command::Start { task } => {
            if engine.start(task.as_deref().unwrap_or_default()) {
                println!("Started '{}'", engine.session().task);
            } else {
                println!("Timer already {}: '{}'", engine.state(), engine.session().task);
            }
        }
        Command::Pause => {
            if engine.pause() {
                println!(
                    "Paused '{}' at {}",
                    engine.session().task,
                    format_duration(engine.elapsed_ms())
                );
            } else {
                println!("Nothing to pause (timer is {})", engine.state());
            }
        }
        Command::Resume => {
            if engine.resume() {
                println!("Resumed '{}'", engine.session().task);
            } else {
                println!("Nothing to resume (timer is {})", engine.state());
            }
        }
        Command::Break => {
            let was_on_break = engine.state() == TimerState::OnBreak;
            if !engine.toggle_break() {
                println!("No task to break from");
            } else if was_on_break {
                println!("Break over, back to '{}'", engine.session().task);
            } else {
                println!("On break from '{}'", engine.session().task_before_break);
            }
        }
        Command::Stop => match engine.stop_and_flush() {
            Some(flushed) => println!("Stopped. Recorded {}", format_duration(flushed)),
            None => println!("No active session to stop"),
        },
        Command::Status { json } => print_status(&mut engine, json)?,
        Command::Today => {
            let today = engine.today();
            print_day(&engine.ledger().day(&today));
        }
        Command::Remove { task, date } => {
            let date = resolve_date(&engine, date)?;
            if !engine.ledger().day(&date).tasks.contains_key(&task) {
                return Err(CliError::EntryNotFound { date, task });
            }
            let removed = engine.remove_entry(&date, &task);
            println!("Removed '{}' ({}) from {}", task, format_duration(removed), date);
        }
        Command::Clear { date, yes } => {
            let date = resolve_date(&engine, date)?;
            if !yes {
                return Err(CliError::ClearNotConfirmed(date));
            }
            if engine.clear_day(&date) {
                println!("Cleared {}", date);
            }
        }
        Command::History { date: Some(date) } => {
            if !is_date_key(&date) {
                return Err(CliError::InvalidDate(date));
            }
            print_day(&HistoryIndex::new(engine.store()).get_day(&date));
        }
        Command::History { date: None } => {
            let history = HistoryIndex::new(engine.store());
            for date in history.list_dates()? {
                let day = history.get_day(&date);
                println!(
                    "{}  {} work  {} break",
                    date,
                    format_duration(day.work_total_ms()),
                    format_duration(day.break_ms)
                );
            }
        }
        Command::Report { week, month } => {
            let period = if month {
                ReportPeriod::Month
            } else if week {
                ReportPeriod::Week
            } else {
                ReportPeriod::Today
            };
            report(&engine, period)?;
        }
        Command::Tasks => {
            for (task, ms) in engine.overall().totals() {
                println!("{:30} {}", task, format_duration(ms));
            }
        }
        Command::Export { format, out } => export_data(&engine, format, out)?,
    }
    Ok(())
}
