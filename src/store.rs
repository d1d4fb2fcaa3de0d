//! The record store: one owner per table file.
//!
//! Operations read the whole file, transform in memory, and rewrite the
//! whole file. Destructive rewrites (purge, migrate, bulk removal) copy
//! the original bytes to a timestamped backup first and restore from it
//! when the rewrite fails. There is no locking and no detection of a
//! concurrent writer: the store assumes one invocation at a time, and
//! the last writer wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

use crate::calendar::{is_next_week, is_same_week};
use crate::resolve::resolve;
use crate::table::{self, Row};

/// Fixed column set of a task table, in on-disk order.
pub const HEADERS: [&str; 4] = ["title", "description", "dateExpression", "link"];

/// One row of a task table. `date_expr` carries the raw deadline text
/// from the `dateExpression` column exactly as stored; it is resolved
/// on demand, never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRecord {
    pub title: String,
    pub description: String,
    pub date_expr: String,
    pub link: String,
}

impl TaskRecord {
    fn from_row(row: &Row) -> Self {
        let get = |key: &str| row.get(key).cloned().unwrap_or_default();
        Self {
            title: get("title"),
            description: get("description"),
            date_expr: get("dateExpression"),
            link: get("link"),
        }
    }

    fn to_row(&self) -> Row {
        Row::from([
            ("title".to_string(), self.title.clone()),
            ("description".to_string(), self.description.clone()),
            ("dateExpression".to_string(), self.date_expr.clone()),
            ("link".to_string(), self.link.clone()),
        ])
    }
}

/// A partial update for [`RecordStore::edit`]; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_expr: Option<String>,
    pub link: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date_expr.is_none()
            && self.link.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("index {index} is out of range: the table has {len} row(s)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("table file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to rewrite {} ({}); original content restored from {}", .path.display(), .source, .backup.display())]
    WriteRestored {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to rewrite {} and the restore failed too ({}); recover manually from {}", .path.display(), .restore_error, .backup.display())]
    Unrecoverable {
        path: PathBuf,
        backup: PathBuf,
        restore_error: io::Error,
        #[source]
        source: io::Error,
    },
}

/// Whole-file access to the durable medium backing a store. The
/// production medium is the filesystem; tests substitute failing media
/// to exercise the backup and restore paths.
pub trait Medium {
    /// Read the whole file; `None` when it does not exist.
    fn read(&self, path: &Path) -> io::Result<Option<String>>;
    /// Overwrite the whole file, creating it if needed.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
    /// Copy `from` over `to`.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `std::fs`-backed medium.
pub struct FsMedium;

impl Medium for FsMedium {
    fn read(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }
}

/// Partition computed by [`RecordStore::plan_purge`] and
/// [`RecordStore::purge`]. `backup` is set only when a rewrite
/// actually happened.
#[derive(Debug)]
pub struct PurgeOutcome {
    pub kept: Vec<TaskRecord>,
    pub dropped: Vec<TaskRecord>,
    pub backup: Option<PathBuf>,
}

/// Result of a removal; `backup` is set only for applied bulk removals.
#[derive(Debug)]
pub struct RemoveOutcome {
    pub removed: Vec<TaskRecord>,
    pub backup: Option<PathBuf>,
}

/// Result of a migration; `backups` pairs the current-week and
/// lookahead backups when the rewrite happened.
#[derive(Debug)]
pub struct MigrateOutcome {
    pub moved: Vec<TaskRecord>,
    pub remaining: Vec<TaskRecord>,
    pub backups: Option<(PathBuf, PathBuf)>,
}

/// One record with its resolution against the reference date.
#[derive(Debug)]
pub struct ClassifiedRecord {
    pub record: TaskRecord,
    pub resolved: Option<NaiveDate>,
}

/// Buckets produced by [`RecordStore::classify`].
#[derive(Debug, Default)]
pub struct WeekReport {
    pub this_week: Vec<ClassifiedRecord>,
    pub next_week: Vec<ClassifiedRecord>,
}

pub struct RecordStore {
    path: PathBuf,
    medium: Box<dyn Medium>,
}

impl RecordStore {
    /// Store over `path` on the real filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_medium(path, Box::new(FsMedium))
    }

    /// Store over `path` with a custom medium.
    pub fn with_medium(path: impl Into<PathBuf>, medium: Box<dyn Medium>) -> Self {
        Self { path: path.into(), medium }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in file order. A missing file is an empty store.
    pub fn list(&self) -> Result<Vec<TaskRecord>, StoreError> {
        Ok(self.read_optional()?.unwrap_or_default())
    }

    /// Append a record. The title must be non-empty after trimming.
    pub fn add(&self, record: TaskRecord) -> Result<TaskRecord, StoreError> {
        if record.title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let mut records = self.read_required()?;
        records.push(record.clone());
        self.write_records(&records)?;
        Ok(record)
    }

    /// Apply `patch` to the record at the 1-based `index`. Returns the
    /// updated record, or `None` when the patch was empty and nothing
    /// was written.
    pub fn edit(&self, index: usize, patch: RecordPatch) -> Result<Option<TaskRecord>, StoreError> {
        let mut records = self.read_required()?;
        check_index(index, records.len())?;
        if patch.is_empty() {
            return Ok(None);
        }
        let record = &mut records[index - 1];
        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        if let Some(date_expr) = patch.date_expr {
            record.date_expr = date_expr;
        }
        if let Some(link) = patch.link {
            record.link = link;
        }
        let updated = record.clone();
        self.write_records(&records)?;
        Ok(Some(updated))
    }

    /// Preview which records [`RecordStore::remove`] would drop,
    /// without writing.
    pub fn plan_remove(&self, indices: &[usize]) -> Result<RemoveOutcome, StoreError> {
        let records = self.read_required()?;
        let (_, removed) = select_removed(&records, indices)?;
        Ok(RemoveOutcome { removed, backup: None })
    }

    /// Remove the records at the given 1-based indices. Every index is
    /// validated before anything is touched. Removing more than one
    /// record is a destructive rewrite and goes through a backup.
    pub fn remove(&self, indices: &[usize]) -> Result<RemoveOutcome, StoreError> {
        if indices.is_empty() {
            return Ok(RemoveOutcome { removed: Vec::new(), backup: None });
        }
        let records = self.read_required()?;
        let (kept, removed) = select_removed(&records, indices)?;
        let backup = if indices.len() > 1 {
            Some(self.rewrite_with_backup(&kept)?)
        } else {
            self.write_records(&kept)?;
            None
        };
        Ok(RemoveOutcome { removed, backup })
    }

    /// Partition for [`RecordStore::purge`] without writing.
    pub fn plan_purge(&self, base: NaiveDate) -> Result<PurgeOutcome, StoreError> {
        let records = self.read_required()?;
        let (kept, dropped) = partition_expired(&records, base);
        Ok(PurgeOutcome { kept, dropped, backup: None })
    }

    /// Drop every record whose date resolves strictly before `base`.
    /// Records with unresolvable dates are always kept. Rewrites the
    /// file only when something was dropped, so repeating a purge with
    /// the same base is a no-op.
    pub fn purge(&self, base: NaiveDate) -> Result<PurgeOutcome, StoreError> {
        let mut outcome = self.plan_purge(base)?;
        if !outcome.dropped.is_empty() {
            outcome.backup = Some(self.rewrite_with_backup(&outcome.kept)?);
        }
        Ok(outcome)
    }

    /// Bucket records into this week and next against `base`. A record
    /// whose date cannot be resolved lands in the current-week bucket
    /// so that a parser gap never hides a task.
    pub fn classify(&self, base: NaiveDate) -> Result<WeekReport, StoreError> {
        let mut report = WeekReport::default();
        for record in self.list()? {
            let resolved = resolve(&record.date_expr, base);
            match resolved {
                Some(date) if is_same_week(date, base) => {
                    report.this_week.push(ClassifiedRecord { record, resolved });
                }
                Some(date) if is_next_week(date, base) => {
                    report.next_week.push(ClassifiedRecord { record, resolved });
                }
                Some(_) => {}
                None => report.this_week.push(ClassifiedRecord { record, resolved }),
            }
        }
        Ok(report)
    }

    fn read_optional(&self) -> Result<Option<Vec<TaskRecord>>, StoreError> {
        let Some(text) = self.medium.read(&self.path).map_err(|e| self.io_err(e))? else {
            return Ok(None);
        };
        let parsed = table::parse(&text);
        for diag in &parsed.skipped {
            tracing::warn!(
                file = %self.path.display(),
                line = diag.line,
                "skipping malformed row: {}",
                diag.message
            );
        }
        Ok(Some(parsed.rows.iter().map(TaskRecord::from_row).collect()))
    }

    fn read_required(&self) -> Result<Vec<TaskRecord>, StoreError> {
        self.read_optional()?
            .ok_or_else(|| StoreError::Missing(self.path.clone()))
    }

    fn render(records: &[TaskRecord]) -> String {
        let rows: Vec<Row> = records.iter().map(TaskRecord::to_row).collect();
        table::serialize(&rows, &HEADERS)
    }

    fn write_records(&self, records: &[TaskRecord]) -> Result<(), StoreError> {
        self.medium
            .write(&self.path, &Self::render(records))
            .map_err(|e| self.io_err(e))
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }

    fn make_backup(&self) -> Result<PathBuf, StoreError> {
        let backup = backup_path(&self.path);
        self.medium
            .copy(&self.path, &backup)
            .map_err(|e| self.io_err(e))?;
        Ok(backup)
    }

    /// Back up the current bytes, then overwrite. On a failed overwrite
    /// the backup is copied back and the error reports whether that
    /// restore succeeded. The backup file is retained either way.
    fn rewrite_with_backup(&self, records: &[TaskRecord]) -> Result<PathBuf, StoreError> {
        let backup = self.make_backup()?;
        match self.medium.write(&self.path, &Self::render(records)) {
            Ok(()) => Ok(backup),
            Err(source) => match self.medium.copy(&backup, &self.path) {
                Ok(()) => Err(StoreError::WriteRestored {
                    path: self.path.clone(),
                    backup,
                    source,
                }),
                Err(restore_error) => Err(StoreError::Unrecoverable {
                    path: self.path.clone(),
                    backup,
                    restore_error,
                    source,
                }),
            },
        }
    }
}

/// Preview a migration without writing either file. Both files must
/// exist.
pub fn plan_migrate(
    current: &RecordStore,
    lookahead: &RecordStore,
    base: NaiveDate,
    force_unparsed: bool,
) -> Result<MigrateOutcome, StoreError> {
    current.read_required()?;
    let ahead = lookahead.read_required()?;
    let (moved, remaining) = partition_lookahead(&ahead, base, force_unparsed);
    Ok(MigrateOutcome { moved, remaining, backups: None })
}

/// Move every lookahead record whose date resolves into the week of
/// `base` (and, with `force_unparsed`, the unresolvable ones) to the
/// end of the current table. Both files are backed up and rewritten as
/// one transaction: when either write fails, both are restored.
pub fn migrate(
    current: &RecordStore,
    lookahead: &RecordStore,
    base: NaiveDate,
    force_unparsed: bool,
) -> Result<MigrateOutcome, StoreError> {
    let current_records = current.read_required()?;
    let ahead = lookahead.read_required()?;
    let (moved, remaining) = partition_lookahead(&ahead, base, force_unparsed);
    if moved.is_empty() {
        return Ok(MigrateOutcome { moved, remaining, backups: None });
    }

    let mut merged = current_records;
    merged.extend(moved.iter().cloned());

    let current_backup = current.make_backup()?;
    let lookahead_backup = lookahead.make_backup()?;

    let failed = match current.medium.write(current.path(), &RecordStore::render(&merged)) {
        Err(source) => Some((current.path(), &current_backup, source)),
        Ok(()) => {
            match lookahead.medium.write(lookahead.path(), &RecordStore::render(&remaining)) {
                Err(source) => Some((lookahead.path(), &lookahead_backup, source)),
                Ok(()) => None,
            }
        }
    };

    if let Some((failed_path, failed_backup, source)) = failed {
        let restored_current = current.medium.copy(&current_backup, current.path());
        let restored_lookahead = lookahead.medium.copy(&lookahead_backup, lookahead.path());
        return Err(match (restored_current, restored_lookahead) {
            (Ok(()), Ok(())) => StoreError::WriteRestored {
                path: failed_path.to_path_buf(),
                backup: failed_backup.clone(),
                source,
            },
            (Err(restore_error), _) => StoreError::Unrecoverable {
                path: current.path().to_path_buf(),
                backup: current_backup.clone(),
                restore_error,
                source,
            },
            (_, Err(restore_error)) => StoreError::Unrecoverable {
                path: lookahead.path().to_path_buf(),
                backup: lookahead_backup.clone(),
                restore_error,
                source,
            },
        });
    }

    Ok(MigrateOutcome {
        moved,
        remaining,
        backups: Some((current_backup, lookahead_backup)),
    })
}

/// Why [`prune_backups`] deleted a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    Empty,
    SameAsOriginal,
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneReason::Empty => write!(f, "empty"),
            PruneReason::SameAsOriginal => write!(f, "identical to original"),
        }
    }
}

#[derive(Debug)]
pub struct PrunedBackup {
    pub path: PathBuf,
    pub reason: PruneReason,
}

/// Delete backup copies under `dir` that are empty or byte-identical
/// to the file they were taken from. Backups whose original is gone
/// are kept. Returns the deletions that actually happened.
pub fn prune_backups(dir: &Path) -> Result<Vec<PrunedBackup>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut pruned = Vec::new();
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(split) = name.find(".bak.") else { continue };
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let backup = entry.path();
        let reason = if meta.len() == 0 {
            Some(PruneReason::Empty)
        } else {
            let original = dir.join(&name[..split]);
            match (fs::read(&backup), fs::read(&original)) {
                (Ok(a), Ok(b)) if a == b => Some(PruneReason::SameAsOriginal),
                _ => None,
            }
        };
        let Some(reason) = reason else { continue };
        match fs::remove_file(&backup) {
            Ok(()) => pruned.push(PrunedBackup { path: backup, reason }),
            Err(err) => {
                tracing::warn!(file = %backup.display(), "failed to delete backup: {err}");
            }
        }
    }
    Ok(pruned)
}

/// Timestamped name for a backup copy: `<file>.bak.<instant>` with the
/// instant's colons and dots flattened to dashes.
fn backup_path(path: &Path) -> PathBuf {
    let stamp = Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".bak.{stamp}"));
    PathBuf::from(name)
}

fn check_index(index: usize, len: usize) -> Result<(), StoreError> {
    if index < 1 || index > len {
        return Err(StoreError::IndexOutOfRange { index, len });
    }
    Ok(())
}

fn select_removed(
    records: &[TaskRecord],
    indices: &[usize],
) -> Result<(Vec<TaskRecord>, Vec<TaskRecord>), StoreError> {
    for &index in indices {
        check_index(index, records.len())?;
    }
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut kept = records.to_vec();
    let mut removed = Vec::with_capacity(sorted.len());
    // remove back to front so the earlier indices stay valid
    for &index in sorted.iter().rev() {
        removed.push(kept.remove(index - 1));
    }
    removed.reverse();
    Ok((kept, removed))
}

fn partition_expired(
    records: &[TaskRecord],
    base: NaiveDate,
) -> (Vec<TaskRecord>, Vec<TaskRecord>) {
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for record in records {
        match resolve(&record.date_expr, base) {
            Some(date) if date < base => dropped.push(record.clone()),
            _ => kept.push(record.clone()),
        }
    }
    (kept, dropped)
}

fn partition_lookahead(
    records: &[TaskRecord],
    base: NaiveDate,
    force_unparsed: bool,
) -> (Vec<TaskRecord>, Vec<TaskRecord>) {
    let mut moved = Vec::new();
    let mut remaining = Vec::new();
    for record in records {
        match resolve(&record.date_expr, base) {
            Some(date) if is_same_week(date, base) => moved.push(record.clone()),
            None if force_unparsed => moved.push(record.clone()),
            _ => remaining.push(record.clone()),
        }
    }
    (moved, remaining)
}
