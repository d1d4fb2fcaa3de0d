//! Locations of the data directory and its table files.

use std::env;
use std::path::{Path, PathBuf};

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "TUGAS_DATA_DIR";
/// Directory used when neither the flag nor the environment says
/// otherwise, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";
/// Canonical single-file task table.
pub const TASKS_FILE: &str = "daftar-tugas.csv";
/// Current-week table of the legacy two-file layout.
pub const CURRENT_WEEK_FILE: &str = "minggu-ini.csv";
/// Next-week table of the legacy two-file layout.
pub const NEXT_WEEK_FILE: &str = "minggu-depan.csv";

/// Resolve the data directory: explicit flag first, then
/// `TUGAS_DATA_DIR`, then the default.
pub fn data_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

/// Resolve a table file: an explicit file wins outright, otherwise the
/// default name inside the resolved data directory.
pub fn table_file(dir_flag: Option<&Path>, file_flag: Option<&Path>, default_name: &str) -> PathBuf {
    match file_flag {
        Some(file) => file.to_path_buf(),
        None => data_dir(dir_flag).join(default_name),
    }
}
