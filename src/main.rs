use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cli;

use cadence::config::{GlobalConfig, load_config};
use cadence::daemon::{SweepDaemon, TickConfig};
use cadence::domain::{
    BulkScheduleRequest, ContentType, Platform, PlatformStatus, ScheduleQuery, ScheduleRequest, ScheduleStatus,
    ScheduleUpdate, ScheduledContent, TimeRange, ViewType,
};
use cadence::orchestrator::SchedulingOrchestrator;
use cli::{Cli, Commands};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("cadence.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.unwrap_or("info")))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    // YAML is a superset of JSON, so both formats parse here
    serde_yaml::from_str(&text).context(format!("Failed to parse {}", path.display()))
}

async fn run_application(cli: &Cli, config: &GlobalConfig) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let orchestrator = Arc::new(SchedulingOrchestrator::open(config).context("Failed to open schedule store")?);

    match &cli.command {
        Commands::Daemon { ticks } => handle_daemon_command(orchestrator, config, *ticks).await,
        Commands::Sweep => handle_sweep_command(&orchestrator).await,
        Commands::Schedule { file } => handle_schedule_command(&orchestrator, file).await,
        Commands::Bulk { file } => handle_bulk_command(&orchestrator, file).await,
        Commands::List {
            brand,
            status,
            platform,
            limit,
        } => handle_list_command(&orchestrator, brand.as_deref(), status.as_deref(), *platform, *limit).await,
        Commands::Status { id } => handle_status_command(&orchestrator, id).await,
        Commands::Edit { id, file, user } => handle_edit_command(&orchestrator, id, file, user.as_deref()).await,
        Commands::Cancel { id, reason, user } => {
            handle_cancel_command(&orchestrator, id, reason.as_deref(), user.as_deref()).await
        }
        Commands::Calendar {
            brand,
            view,
            date,
            timezone,
        } => handle_calendar_command(&orchestrator, brand, view, date.as_deref(), timezone.as_deref()).await,
        Commands::Suggest {
            brand,
            platforms,
            content_type,
            days,
            count,
        } => handle_suggest_command(&orchestrator, brand, platforms, *content_type, *days, *count).await,
    }
}

async fn handle_daemon_command(
    orchestrator: Arc<SchedulingOrchestrator>,
    config: &GlobalConfig,
    ticks: Option<u64>,
) -> Result<()> {
    let mut tick_config = TickConfig::from(&config.sweep);
    if let Some(ticks) = ticks {
        tick_config = tick_config.with_max_ticks(ticks);
    }
    println!(
        "{} every {}s (Ctrl-C to stop)",
        "Sweeping".cyan(),
        tick_config.tick_interval.as_secs()
    );

    let mut daemon = SweepDaemon::new(orchestrator, tick_config);
    let state = daemon
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Daemon failed")?;

    println!(
        "{} {} ticks: {} published, {} partial, {} retried, {} failed, {} reminders, {} errors",
        "Stopped after".green(),
        state.tick_count,
        state.total_published,
        state.total_partial,
        state.total_retried,
        state.total_failed,
        state.total_reminders,
        state.total_errors
    );
    Ok(())
}

async fn handle_sweep_command(orchestrator: &SchedulingOrchestrator) -> Result<()> {
    let (publishing, notifications) = orchestrator.run_sweep().await.context("Sweep failed")?;
    println!(
        "{} {} due, {} published, {} partial, {} retried, {} failed, {} skipped, {} recovered, {} errors",
        "Publishing:".green(),
        publishing.due,
        publishing.published,
        publishing.partial,
        publishing.retried,
        publishing.failed,
        publishing.skipped,
        publishing.recovered,
        publishing.errors
    );
    println!(
        "{} {} due, {} sent, {} skipped, {} errors",
        "Reminders:".green(),
        notifications.due,
        notifications.sent,
        notifications.skipped,
        notifications.errors
    );
    Ok(())
}

async fn handle_schedule_command(orchestrator: &SchedulingOrchestrator, file: &Path) -> Result<()> {
    let request: ScheduleRequest = read_file(file)?;
    match orchestrator.schedule_content(request).await {
        Ok(schedule) => {
            println!("{} {}", "Scheduled:".green(), schedule.id);
            print_schedule(&schedule);
            Ok(())
        }
        Err(cadence::CadenceError::Conflict(conflicts)) => {
            println!("{}", "Rejected because of conflicts:".red());
            for conflict in &conflicts {
                println!(
                    "  [{}] {}: {}",
                    conflict.severity.as_str().red(),
                    conflict.conflict_type.as_str(),
                    conflict.description
                );
            }
            Err(eyre!("{} blocking conflict(s)", conflicts.len()))
        }
        Err(e) => Err(e).context("Failed to schedule content"),
    }
}

async fn handle_bulk_command(orchestrator: &SchedulingOrchestrator, file: &Path) -> Result<()> {
    let request: BulkScheduleRequest = read_file(file)?;
    let result = orchestrator
        .bulk_schedule_content(&request)
        .await
        .context("Bulk scheduling failed")?;

    for scheduled in &result.scheduled {
        println!(
            "  #{} {} {} at {}",
            scheduled.index,
            "scheduled".green(),
            scheduled.schedule.id,
            scheduled.schedule.scheduled_time.to_rfc3339()
        );
    }
    for conflict in &result.conflicts {
        println!(
            "  #{} {} {} conflict(s)",
            conflict.index,
            "conflict".yellow(),
            conflict.conflicts.len()
        );
    }
    for failure in &result.failed {
        println!("  #{} {} [{}] {}", failure.index, "failed".red(), failure.code, failure.error);
    }
    println!(
        "{} {} scheduled, {} conflicts, {} failed",
        "Bulk:".green(),
        result.scheduled.len(),
        result.conflicts.len(),
        result.failed.len()
    );
    Ok(())
}

async fn handle_list_command(
    orchestrator: &SchedulingOrchestrator,
    brand: Option<&str>,
    status: Option<&str>,
    platform: Option<Platform>,
    limit: Option<usize>,
) -> Result<()> {
    let mut query = ScheduleQuery {
        brand_id: brand.map(str::to_string),
        limit,
        ..Default::default()
    };
    if let Some(status) = status {
        let status = ScheduleStatus::parse(status).ok_or_else(|| eyre!("Unknown status: {}", status))?;
        query.statuses.push(status);
    }
    if let Some(platform) = platform {
        query.platforms.push(platform);
    }

    let schedules = orchestrator.get_scheduled_content(&query).await?;
    if schedules.is_empty() {
        println!("{}", "No schedules".yellow());
        return Ok(());
    }
    for schedule in &schedules {
        println!(
            "{}  {}  {:<10}  {:<7}  {}  [{}]",
            schedule.id,
            schedule.scheduled_time.format("%Y-%m-%d %H:%M"),
            color_status(schedule.status),
            schedule.priority.as_str(),
            schedule.title,
            platform_list(&schedule.platforms)
        );
    }
    Ok(())
}

async fn handle_status_command(orchestrator: &SchedulingOrchestrator, id: &str) -> Result<()> {
    let schedule = orchestrator.get_schedule(id).await?;
    print_schedule(&schedule);
    for status in orchestrator.get_publishing_status(id).await? {
        let state = match status.status {
            PlatformStatus::Published => status.status.as_str().green(),
            PlatformStatus::Failed => status.status.as_str().red(),
            _ => status.status.as_str().normal(),
        };
        print!("  {:<10} {}", status.platform.as_str(), state);
        if let Some(post_id) = &status.platform_post_id {
            print!("  post {}", post_id);
        }
        if let Some(error) = &status.error {
            print!("  [{}] {}", error.code, error.message);
        }
        println!();
    }
    Ok(())
}

async fn handle_edit_command(
    orchestrator: &SchedulingOrchestrator,
    id: &str,
    file: &Path,
    user: Option<&str>,
) -> Result<()> {
    let update: ScheduleUpdate = read_file(file)?;
    let schedule = orchestrator
        .update_scheduled_content(id, update, user)
        .await
        .context(format!("Failed to edit {}", id))?;
    println!("{} {}", "Updated:".green(), schedule.id);
    print_schedule(&schedule);
    Ok(())
}

async fn handle_cancel_command(
    orchestrator: &SchedulingOrchestrator,
    id: &str,
    reason: Option<&str>,
    user: Option<&str>,
) -> Result<()> {
    orchestrator
        .cancel_scheduled_content(id, reason, user)
        .await
        .context(format!("Failed to cancel {}", id))?;
    println!("{} {}", "Cancelled:".red(), id);
    Ok(())
}

async fn handle_calendar_command(
    orchestrator: &SchedulingOrchestrator,
    brand: &str,
    view: &str,
    date: Option<&str>,
    timezone: Option<&str>,
) -> Result<()> {
    let view_type = match view {
        "day" => ViewType::Day,
        "week" => ViewType::Week,
        "month" => ViewType::Month,
        other => return Err(eyre!("Unknown view: {} (expected day, week or month)", other)),
    };
    let start = match date {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d").context("Date must be YYYY-MM-DD")?,
        None => Utc::now().date_naive(),
    };

    let calendar = orchestrator
        .get_calendar_view(brand, view_type, start, timezone)
        .await?;
    println!(
        "{} {} {} to {} ({})",
        "Calendar".cyan(),
        calendar.brand_id,
        calendar.window.start.to_rfc3339(),
        calendar.window.end.to_rfc3339(),
        calendar.timezone
    );
    for schedule in &calendar.schedules {
        println!(
            "  {}  {:<10}  {}  [{}]",
            schedule.scheduled_time.format("%a %m-%d %H:%M"),
            color_status(schedule.status),
            schedule.title,
            platform_list(&schedule.platforms)
        );
    }
    if !calendar.conflicts.is_empty() {
        println!("{}", "Conflicts:".yellow());
        for conflict in &calendar.conflicts {
            println!("  [{}] {}", conflict.severity.as_str(), conflict.description);
        }
    }
    if !calendar.platform_usage.is_empty() {
        println!("{}", "Usage:".cyan());
        for usage in &calendar.platform_usage {
            let line = format!("  {} {:<10} {}/{}", usage.date, usage.platform.as_str(), usage.count, usage.limit);
            if usage.count >= usage.limit {
                println!("{}", line.red());
            } else {
                println!("{}", line);
            }
        }
    }
    if !calendar.optimal_times.is_empty() {
        println!("{}", "Open slots:".cyan());
        for suggestion in &calendar.optimal_times {
            println!("  {}  {:.2}  {}", suggestion.time.to_rfc3339(), suggestion.score, suggestion.reason);
        }
    }
    Ok(())
}

async fn handle_suggest_command(
    orchestrator: &SchedulingOrchestrator,
    brand: &str,
    platforms: &[Platform],
    content_type: ContentType,
    days: i64,
    count: usize,
) -> Result<()> {
    let now = Utc::now();
    let range = TimeRange::new(now, now + Duration::days(days.max(1)))?;
    let suggestions = orchestrator
        .suggest_optimal_times(brand, platforms, content_type, range, count)
        .await?;
    if suggestions.is_empty() {
        println!("{}", "No free slots in range".yellow());
    }
    for (rank, suggestion) in suggestions.iter().enumerate() {
        println!(
            "{}. {}  {}  {}",
            rank + 1,
            suggestion.time.to_rfc3339().green(),
            format!("{:.2}", suggestion.score).cyan(),
            suggestion.reason
        );
    }
    Ok(())
}

fn print_schedule(schedule: &ScheduledContent) {
    println!("  {} {}", "Title:".bold(), schedule.title);
    println!("  {} {}", "Status:".bold(), color_status(schedule.status));
    println!(
        "  {} {} ({})",
        "When:".bold(),
        schedule.scheduled_time.to_rfc3339(),
        schedule.timezone
    );
    println!("  {} {}", "Platforms:".bold(), platform_list(&schedule.platforms));
    println!(
        "  {} {}/{}",
        "Retries:".bold(),
        schedule.retry_count,
        schedule.max_retries
    );
    if let Some(at) = schedule.reminder_at {
        println!("  {} {}", "Reminder:".bold(), at.to_rfc3339());
    }
    if let Some(reason) = &schedule.failure_reason {
        println!("  {} {}", "Note:".bold(), reason.yellow());
    }
    if let Some(reason) = &schedule.cancellation_reason {
        println!("  {} {}", "Cancelled:".bold(), reason);
    }
}

fn color_status(status: ScheduleStatus) -> ColoredString {
    match status {
        ScheduleStatus::Published => status.as_str().green(),
        ScheduleStatus::Failed | ScheduleStatus::Cancelled => status.as_str().red(),
        ScheduleStatus::Publishing => status.as_str().cyan(),
        ScheduleStatus::Draft => status.as_str().dimmed(),
        ScheduleStatus::Scheduled => status.as_str().normal(),
    }
}

fn platform_list(platforms: &[Platform]) -> String {
    platforms.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
