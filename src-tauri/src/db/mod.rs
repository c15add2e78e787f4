use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tauri::Manager;

use crate::error::{sqlite_failure, AppError};

pub mod migrations;
pub mod quotes;
pub mod settings;

pub const DB_FILE_NAME: &str = "orcamentos.db";
pub const DB_PATH_ENV: &str = "ORCAMENTOS_DB_PATH";

/// Handle to the single-file store.
///
/// Holds only the path: every operation opens its own connection, runs,
/// and drops it, so nothing stays locked between commands.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Opens (or creates) the store and brings the schema up to date.
    /// Must succeed before any gateway call is made.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { path };
        let conn = store.connect()?;
        migrations::run(&conn)?;
        tracing::info!(path = %store.path.display(), "store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn connect(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.path)?;
        configure_sqlite(&conn)?;
        Ok(conn)
    }

    /// Runs one gateway operation on a fresh connection.
    pub fn with_conn<T, F>(&self, op_name: &'static str, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, AppError>,
    {
        let res = self.connect().map_err(AppError::from).and_then(|conn| f(&conn));
        if let Err(e) = &res {
            if !e.is_not_found() {
                tracing::warn!(op = op_name, error = %e, "store operation failed");
            }
        }
        res
    }
}

fn configure_sqlite(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn sqlite_message_contains(err: &rusqlite::Error, needle: &str) -> bool {
    sqlite_failure(err)
        .and_then(|(_, msg)| msg)
        .is_some_and(|msg| msg.contains(needle))
}

/// A statement referenced a column the file does not have yet.
pub(crate) fn is_missing_column(err: &rusqlite::Error) -> bool {
    sqlite_message_contains(err, "no such column")
}

/// `ALTER TABLE ... ADD COLUMN` on a column that already exists.
pub(crate) fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    sqlite_message_contains(err, "duplicate column name")
}

/// Directories the database may live in, most preferred first.
fn db_dir_candidates(app: &tauri::AppHandle) -> Vec<PathBuf> {
    let resolver = app.path();
    [resolver.app_data_dir().ok(), resolver.app_local_data_dir().ok()]
        .into_iter()
        .flatten()
        .chain(std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)))
        .chain(std::env::current_dir().ok())
        .collect()
}

/// An explicit override wins; otherwise an existing file is reused, and a
/// fresh install lands in the first candidate directory.
fn pick_db_path(override_path: Option<OsString>, dirs: &[PathBuf]) -> Option<PathBuf> {
    if let Some(p) = override_path.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(p));
    }
    let files: Vec<PathBuf> = dirs.iter().map(|d| d.join(DB_FILE_NAME)).collect();
    files
        .iter()
        .find(|p| p.is_file())
        .or_else(|| files.first())
        .cloned()
}

pub fn resolve_db_path(app: &tauri::AppHandle) -> Result<PathBuf, AppError> {
    pick_db_path(std::env::var_os(DB_PATH_ENV), &db_dir_candidates(app))
        .ok_or_else(|| AppError::InvalidInput("unable to resolve database path".to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join(DB_FILE_NAME);
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn with_conn_surfaces_storage_errors() {
        let (_dir, store) = test_support::temp_store();
        let res: Result<i64, AppError> = store.with_conn("bad_sql", |conn| {
            Ok(conn.query_row("SELECT nope FROM missing_table", [], |r| r.get(0))?)
        });
        let err = res.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(err.to_string().contains("missing_table"));
    }

    #[test]
    fn missing_and_duplicate_columns_are_recognised() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT)").unwrap();

        let missing = conn.prepare("SELECT b FROM t").unwrap_err();
        assert!(is_missing_column(&missing), "{missing:?}");
        assert!(!is_duplicate_column(&missing));

        let dup = conn.execute("ALTER TABLE t ADD COLUMN a TEXT", []).unwrap_err();
        assert!(is_duplicate_column(&dup), "{dup:?}");
        assert!(!is_missing_column(&dup));

        let other = conn.prepare("SELECT a FROM nowhere").unwrap_err();
        assert!(!is_missing_column(&other));
    }

    #[test]
    fn db_path_prefers_override_then_existing_file() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let dirs = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        assert_eq!(pick_db_path(None, &dirs), Some(a.path().join(DB_FILE_NAME)));

        std::fs::write(b.path().join(DB_FILE_NAME), b"").unwrap();
        assert_eq!(pick_db_path(None, &dirs), Some(b.path().join(DB_FILE_NAME)));

        let forced = OsString::from("/srv/orcamentos/dados.db");
        assert_eq!(pick_db_path(Some(forced), &dirs), Some(PathBuf::from("/srv/orcamentos/dados.db")));
        assert_eq!(pick_db_path(Some(OsString::new()), &[]), None);
    }
}
