use std::env;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tugas::paths::{self, DATA_DIR_ENV};

#[test]
#[serial]
fn explicit_dir_beats_the_environment() {
    env::set_var(DATA_DIR_ENV, "/from-env");
    assert_eq!(paths::data_dir(Some(Path::new("/flag"))), PathBuf::from("/flag"));
    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn environment_overrides_the_default() {
    env::set_var(DATA_DIR_ENV, "/from-env");
    assert_eq!(paths::data_dir(None), PathBuf::from("/from-env"));
    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn default_data_dir_is_relative() {
    env::remove_var(DATA_DIR_ENV);
    assert_eq!(paths::data_dir(None), PathBuf::from("data"));
}

#[test]
#[serial]
fn empty_environment_value_falls_back_to_the_default() {
    env::set_var(DATA_DIR_ENV, "");
    assert_eq!(paths::data_dir(None), PathBuf::from("data"));
    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn table_file_prefers_the_explicit_file() {
    env::remove_var(DATA_DIR_ENV);
    assert_eq!(
        paths::table_file(Some(Path::new("ignored")), Some(Path::new("x.csv")), paths::TASKS_FILE),
        PathBuf::from("x.csv")
    );
    assert_eq!(
        paths::table_file(Some(Path::new("d")), None, paths::TASKS_FILE),
        PathBuf::from("d").join("daftar-tugas.csv")
    );
}
