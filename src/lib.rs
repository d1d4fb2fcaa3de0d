//! Task-table toolchain for a course site fed by flat CSV files.
//!
//! The crate splits into four core pieces: [`calendar`] for Monday-based
//! week arithmetic, [`resolve`] for turning free-form deadline text into
//! concrete dates, [`table`] for the delimited file format, and [`store`]
//! for the whole-file read-rewrite cycle with backups around destructive
//! changes. [`paths`] locates the data directory and its table files.
//!
//! Known limitations: records have no identity beyond their position in
//! the file, so indices shift after every removal, and there is no
//! cross-process locking; concurrent invocations race and the last
//! writer wins.

pub mod calendar;
pub mod paths;
pub mod resolve;
pub mod store;
pub mod table;

pub use calendar::WeekWindow;
pub use resolve::resolve;
pub use store::{RecordStore, StoreError, TaskRecord};
