use rusqlite::Connection;

use super::is_duplicate_column;
use crate::error::AppError;

/// Oldest table shapes. Everything added since then arrives through
/// `COLUMN_MIGRATIONS`, so a fresh file and a years-old file end up identical.
const BASE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS quotes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client TEXT,
        items TEXT,
        total REAL,
        date_created TEXT
    );

    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY,
        company_name TEXT,
        footer_text TEXT
    );
"#;

/// One additive column. `add` fails with "duplicate column name" once the
/// column exists; that failure is the idempotence mechanism.
pub(crate) struct ColumnMigration {
    pub table: &'static str,
    pub column: &'static str,
    pub add: &'static str,
    pub backfill: Option<&'static str>,
}

const COLUMN_MIGRATIONS: &[ColumnMigration] = &[
    ColumnMigration {
        table: "quotes",
        column: "client_email",
        add: "ALTER TABLE quotes ADD COLUMN client_email TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "quotes",
        column: "client_phone",
        add: "ALTER TABLE quotes ADD COLUMN client_phone TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "quotes",
        column: "client_address",
        add: "ALTER TABLE quotes ADD COLUMN client_address TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "quotes",
        column: "status",
        add: "ALTER TABLE quotes ADD COLUMN status TEXT DEFAULT 'PENDING'",
        backfill: Some("UPDATE quotes SET status = 'PENDING' WHERE status IS NULL OR status = ''"),
    },
    ColumnMigration {
        table: "settings",
        column: "company_legal_name",
        add: "ALTER TABLE settings ADD COLUMN company_legal_name TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "settings",
        column: "company_cnpj",
        add: "ALTER TABLE settings ADD COLUMN company_cnpj TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "settings",
        column: "company_address",
        add: "ALTER TABLE settings ADD COLUMN company_address TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "settings",
        column: "company_phone",
        add: "ALTER TABLE settings ADD COLUMN company_phone TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "settings",
        column: "pdf_save_path",
        add: "ALTER TABLE settings ADD COLUMN pdf_save_path TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "settings",
        column: "pdf_create_subfolder",
        add: "ALTER TABLE settings ADD COLUMN pdf_create_subfolder INTEGER DEFAULT 0",
        backfill: Some("UPDATE settings SET pdf_create_subfolder = 0 WHERE pdf_create_subfolder IS NULL"),
    },
    ColumnMigration {
        table: "settings",
        column: "pdf_auto_save",
        add: "ALTER TABLE settings ADD COLUMN pdf_auto_save INTEGER DEFAULT 1",
        backfill: Some("UPDATE settings SET pdf_auto_save = 1 WHERE pdf_auto_save IS NULL"),
    },
    ColumnMigration {
        table: "settings",
        column: "logo_path",
        add: "ALTER TABLE settings ADD COLUMN logo_path TEXT",
        backfill: None,
    },
    ColumnMigration {
        table: "settings",
        column: "payment_pix",
        add: "ALTER TABLE settings ADD COLUMN payment_pix INTEGER DEFAULT 0",
        backfill: Some("UPDATE settings SET payment_pix = 0 WHERE payment_pix IS NULL"),
    },
    ColumnMigration {
        table: "settings",
        column: "payment_credit",
        add: "ALTER TABLE settings ADD COLUMN payment_credit INTEGER DEFAULT 0",
        backfill: Some("UPDATE settings SET payment_credit = 0 WHERE payment_credit IS NULL"),
    },
    ColumnMigration {
        table: "settings",
        column: "payment_debit",
        add: "ALTER TABLE settings ADD COLUMN payment_debit INTEGER DEFAULT 0",
        backfill: Some("UPDATE settings SET payment_debit = 0 WHERE payment_debit IS NULL"),
    },
    ColumnMigration {
        table: "settings",
        column: "payment_cash",
        add: "ALTER TABLE settings ADD COLUMN payment_cash INTEGER DEFAULT 0",
        backfill: Some("UPDATE settings SET payment_cash = 0 WHERE payment_cash IS NULL"),
    },
];

pub fn run(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(BASE_SCHEMA)?;

    let mut added = 0usize;
    for m in COLUMN_MIGRATIONS {
        if apply_column(conn, m)? {
            added += 1;
        }
    }
    if added > 0 {
        tracing::info!(added, "schema migrated");
    }
    Ok(())
}

/// Returns `true` when the column was newly added.
pub(crate) fn apply_column(conn: &Connection, m: &ColumnMigration) -> Result<bool, AppError> {
    match conn.execute(m.add, []) {
        Ok(_) => {}
        Err(e) if is_duplicate_column(&e) => {
            tracing::debug!(table = m.table, column = m.column, "column already present");
            return Ok(false);
        }
        Err(source) => {
            tracing::error!(table = m.table, column = m.column, error = %source, "migration failed");
            return Err(AppError::Migration {
                table: m.table,
                column: m.column,
                source,
            });
        }
    }

    if let Some(sql) = m.backfill {
        let rows = conn.execute(sql, []).map_err(|source| AppError::Migration {
            table: m.table,
            column: m.column,
            source,
        })?;
        tracing::debug!(table = m.table, column = m.column, rows, "backfilled default");
    }
    Ok(true)
}
