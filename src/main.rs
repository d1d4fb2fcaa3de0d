use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;

use tugas::calendar::WeekWindow;
use tugas::paths;
use tugas::store::{self, ClassifiedRecord, RecordPatch, RecordStore, TaskRecord};

#[derive(Parser)]
#[command(
    name = "tugas",
    version,
    about = "Task-table manager for the course site",
    long_about = "Maintains the comma-delimited task tables behind the course site.\n\nFeatures:\n- List/add/edit/remove tasks by their 1-based index\n- Resolve free-form deadline text: ISO dates, day-first numerics, besok/lusa,\n  weekday names with depan/next, and English equivalents\n- Purge expired tasks and preview this-week/next-week placement\n- Migrate the legacy two-file week split and prune stale backups",
    after_help = "Examples:\n  tugas list\n  tugas add \"Laporan praktikum\" -d besok -l https://kelas.example/submit\n  tugas edit 2 -d \"senin depan\"\n  tugas rm 3 5\n  tugas purge --apply\n  tugas migrate --apply --force-unparsed\n  tugas check --today 2025-10-03\n  tugas prune-backups"
)]
struct Cli {
    /// Data directory holding the task tables (env TUGAS_DATA_DIR, default: data)
    #[arg(long = "dir", global = true)]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// List all tasks with their 1-based indices
    List {
        /// Table file (default: <dir>/daftar-tugas.csv)
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
    /// Add a task to the end of the table
    Add {
        /// Task title
        title: Vec<String>,
        /// Description
        #[arg(short = 's', long = "description")]
        description: Option<String>,
        /// Raw deadline text, e.g. "besok", "2025-12-25", "senin depan"
        #[arg(short = 'd', long = "date")]
        date: Option<String>,
        /// Submission link
        #[arg(short = 'l', long = "link")]
        link: Option<String>,
        /// Table file (default: <dir>/daftar-tugas.csv)
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
    /// Edit fields of the task at a 1-based index
    Edit {
        /// 1-based index from `tugas list`
        index: usize,
        /// New title
        #[arg(long = "title")]
        title: Option<String>,
        /// New description
        #[arg(short = 's', long = "description")]
        description: Option<String>,
        /// New deadline text
        #[arg(short = 'd', long = "date")]
        date: Option<String>,
        /// New submission link
        #[arg(short = 'l', long = "link")]
        link: Option<String>,
        /// Table file (default: <dir>/daftar-tugas.csv)
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
    /// Remove tasks by index; removing several at once leaves a backup
    Rm {
        /// One or more 1-based indices from `tugas list`
        #[arg(required = true)]
        indices: Vec<usize>,
        /// Preview the removal without writing
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Table file (default: <dir>/daftar-tugas.csv)
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
    /// Drop tasks whose deadline already passed (dry-run unless --apply)
    Purge {
        /// Rewrite the file instead of previewing
        #[arg(long)]
        apply: bool,
        /// Reference date YYYY-MM-DD (default: today)
        #[arg(long = "today")]
        today: Option<String>,
        /// Table file (default: <dir>/daftar-tugas.csv)
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
    /// Move next week's tasks that fall due this week into the current table
    Migrate {
        /// Rewrite both files instead of previewing
        #[arg(long)]
        apply: bool,
        /// Also move tasks whose deadline text cannot be resolved
        #[arg(long = "force-unparsed")]
        force_unparsed: bool,
        /// Reference date YYYY-MM-DD (default: today)
        #[arg(long = "today")]
        today: Option<String>,
        /// Current-week file (default: <dir>/minggu-ini.csv)
        #[arg(long = "current")]
        current: Option<PathBuf>,
        /// Next-week file (default: <dir>/minggu-depan.csv)
        #[arg(long = "lookahead")]
        lookahead: Option<PathBuf>,
    },
    /// Report which tasks fall in this week and the next
    Check {
        /// Reference date YYYY-MM-DD (default: today)
        #[arg(long = "today")]
        today: Option<String>,
        /// Table file (default: <dir>/daftar-tugas.csv)
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
    /// Delete empty or unchanged backup copies from the data directory
    PruneBackups,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let dir = cli.dir;
    match cli.action {
        Action::List { file } => list_tasks(&tasks_store(dir.as_deref(), file)),
        Action::Add { title, description, date, link, file } => {
            add_task(&tasks_store(dir.as_deref(), file), title.join(" "), description, date, link)
        }
        Action::Edit { index, title, description, date, link, file } => {
            let patch = RecordPatch { title, description, date_expr: date, link };
            edit_task(&tasks_store(dir.as_deref(), file), index, patch)
        }
        Action::Rm { indices, dry_run, file } => {
            remove_tasks(&tasks_store(dir.as_deref(), file), &indices, dry_run)
        }
        Action::Purge { apply, today, file } => {
            let base = parse_or_today(today.as_deref())?;
            purge_tasks(&tasks_store(dir.as_deref(), file), base, apply)
        }
        Action::Migrate { apply, force_unparsed, today, current, lookahead } => {
            let base = parse_or_today(today.as_deref())?;
            let current = store_at(dir.as_deref(), current, paths::CURRENT_WEEK_FILE);
            let lookahead = store_at(dir.as_deref(), lookahead, paths::NEXT_WEEK_FILE);
            migrate_tasks(&current, &lookahead, base, apply, force_unparsed)
        }
        Action::Check { today, file } => {
            let base = parse_or_today(today.as_deref())?;
            check_tasks(&tasks_store(dir.as_deref(), file), base)
        }
        Action::PruneBackups => prune_backups(&paths::data_dir(dir.as_deref())),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn tasks_store(dir: Option<&Path>, file: Option<PathBuf>) -> RecordStore {
    store_at(dir, file, paths::TASKS_FILE)
}

fn store_at(dir: Option<&Path>, file: Option<PathBuf>, default_name: &str) -> RecordStore {
    RecordStore::new(paths::table_file(dir, file.as_deref(), default_name))
}

fn parse_or_today(s: Option<&str>) -> Result<NaiveDate> {
    match s {
        Some(v) => parse_date(v),
        None => Ok(Local::now().date_naive()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date: {}", s))
}

fn record_line(record: &TaskRecord) -> String {
    let date = if record.date_expr.is_empty() { "no date" } else { record.date_expr.as_str() };
    let mut line = format!("[{}] {}", date, record.title);
    if !record.link.is_empty() {
        line.push(' ');
        line.push_str(&record.link);
    }
    line
}

fn list_tasks(store: &RecordStore) -> Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        println!("No tasks in {}", store.path().display());
        return Ok(());
    }
    for (i, record) in records.iter().enumerate() {
        println!("{} {}", format!("{:>3}.", i + 1).dimmed(), record_line(record));
        if !record.description.is_empty() {
            println!("     {}", record.description.dimmed());
        }
    }
    Ok(())
}

fn add_task(
    store: &RecordStore,
    title: String,
    description: Option<String>,
    date: Option<String>,
    link: Option<String>,
) -> Result<()> {
    let record = store.add(TaskRecord {
        title,
        description: description.unwrap_or_default(),
        date_expr: date.unwrap_or_default(),
        link: link.unwrap_or_default(),
    })?;
    println!("Added: {}", record_line(&record));
    Ok(())
}

fn edit_task(store: &RecordStore, index: usize, patch: RecordPatch) -> Result<()> {
    match store.edit(index, patch)? {
        Some(updated) => println!("Updated {}: {}", index, record_line(&updated)),
        None => println!("No changes given. Pass --title, --description, --date or --link."),
    }
    Ok(())
}

fn remove_tasks(store: &RecordStore, indices: &[usize], dry_run: bool) -> Result<()> {
    if dry_run {
        let outcome = store.plan_remove(indices)?;
        println!("Would remove {} task(s):", outcome.removed.len());
        for record in &outcome.removed {
            println!("  {} {}", "-".red().bold(), record_line(record));
        }
        println!("Dry-run only. Re-run without --dry-run to write.");
        return Ok(());
    }
    let outcome = store.remove(indices)?;
    println!("Removed {} task(s):", outcome.removed.len());
    for record in &outcome.removed {
        println!("  {} {}", "-".red().bold(), record_line(record));
    }
    if let Some(backup) = outcome.backup {
        println!("Backup: {}", backup.display());
    }
    Ok(())
}

fn purge_tasks(store: &RecordStore, base: NaiveDate, apply: bool) -> Result<()> {
    println!("Reference date: {}", base);
    let outcome = if apply { store.purge(base)? } else { store.plan_purge(base)? };
    if outcome.dropped.is_empty() {
        println!("No expired tasks.");
        return Ok(());
    }
    println!("Expired tasks ({}):", outcome.dropped.len());
    for record in &outcome.dropped {
        println!("  {} {}", "-".red().bold(), record_line(record));
    }
    match outcome.backup {
        Some(backup) => {
            println!("Rewrote {} keeping {} task(s).", store.path().display(), outcome.kept.len());
            println!("Backup: {}", backup.display());
        }
        None => println!("Dry-run only. Re-run with --apply to rewrite {}.", store.path().display()),
    }
    Ok(())
}

fn migrate_tasks(
    current: &RecordStore,
    lookahead: &RecordStore,
    base: NaiveDate,
    apply: bool,
    force_unparsed: bool,
) -> Result<()> {
    println!("Reference date: {}", base);
    let outcome = if apply {
        store::migrate(current, lookahead, base, force_unparsed)?
    } else {
        store::plan_migrate(current, lookahead, base, force_unparsed)?
    };
    if outcome.moved.is_empty() {
        println!("Nothing in {} needs to move this week.", lookahead.path().display());
        return Ok(());
    }
    println!("Tasks moving to {} ({}):", current.path().display(), outcome.moved.len());
    for record in &outcome.moved {
        println!("  {} {}", ">".yellow().bold(), record_line(record));
    }
    println!("{} task(s) stay in {}.", outcome.remaining.len(), lookahead.path().display());
    match outcome.backups {
        Some((current_backup, lookahead_backup)) => {
            println!("Backups: {}, {}", current_backup.display(), lookahead_backup.display());
        }
        None => println!("Dry-run only. Re-run with --apply to rewrite both files."),
    }
    Ok(())
}

fn check_tasks(store: &RecordStore, base: NaiveDate) -> Result<()> {
    let report = store.classify(base)?;
    let current = WeekWindow::current(base);
    let next = WeekWindow::next(base);
    println!("Reference date: {}", base);
    println!();
    println!("{} ({} to {}):", "This week".green().bold(), current.start(), current.end());
    print_bucket(&report.this_week);
    println!();
    println!("{} ({} to {}):", "Next week".yellow().bold(), next.start(), next.end());
    print_bucket(&report.next_week);
    Ok(())
}

fn print_bucket(bucket: &[ClassifiedRecord]) {
    if bucket.is_empty() {
        println!("  (none)");
        return;
    }
    for entry in bucket {
        let resolved = match entry.resolved {
            Some(date) => date.to_string(),
            None => "unresolved".to_string(),
        };
        println!("  {} {}", record_line(&entry.record), format!("-> {}", resolved).dimmed());
    }
}

fn prune_backups(dir: &Path) -> Result<()> {
    let pruned = store::prune_backups(dir)?;
    if pruned.is_empty() {
        println!("No empty or duplicate backups in {}.", dir.display());
        return Ok(());
    }
    for entry in &pruned {
        println!("Removed backup: {} ({})", entry.path.display(), entry.reason);
    }
    Ok(())
}
