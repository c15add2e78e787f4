use rusqlite::{params, Connection, OptionalExtension, Row};
use time::{macros::format_description, OffsetDateTime};

use super::is_missing_column;
use crate::error::AppError;
use crate::models::{Quote, QuoteInput, QuoteItem, QuoteStats, QuoteStatus, QuoteSummary};

const INSERT_QUOTE: &str = r#"INSERT INTO quotes (
        client, client_email, client_phone, client_address, items, total, date_created, status
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'PENDING')"#;

const UPDATE_QUOTE: &str = r#"UPDATE quotes SET
        client = ?2,
        client_email = ?3,
        client_phone = ?4,
        client_address = ?5,
        items = ?6,
        total = ?7,
        date_created = ?8
    WHERE id = ?1"#;

const SELECT_QUOTE: &str = "SELECT id, client, client_email, client_phone, client_address, items, total, date_created, status FROM quotes WHERE id = ?1";
const SELECT_QUOTE_LEGACY: &str = "SELECT id, client, items, total, date_created FROM quotes WHERE id = ?1";

const LIST_QUOTES: &str = "SELECT id, client, client_email, client_phone, client_address, items, total, date_created, status FROM quotes ORDER BY id DESC";
const LIST_QUOTES_LEGACY: &str = "SELECT id, client, items, total, date_created FROM quotes ORDER BY id DESC";

/// One `quotes` row, read by fixed column position.
struct QuoteRow {
    id: i64,
    client: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    items_json: Option<String>,
    total: Option<f64>,
    date: Option<String>,
    status: Option<String>,
}

impl QuoteRow {
    fn from_current(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            client: r.get(1)?,
            email: r.get(2)?,
            phone: r.get(3)?,
            address: r.get(4)?,
            items_json: r.get(5)?,
            total: r.get(6)?,
            date: r.get(7)?,
            status: r.get(8)?,
        })
    }

    /// Shape of files written before the client contact and status columns.
    fn from_legacy(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            client: r.get(1)?,
            email: None,
            phone: None,
            address: None,
            items_json: r.get(2)?,
            total: r.get(3)?,
            date: r.get(4)?,
            status: None,
        })
    }

    fn items(&self) -> Result<Vec<QuoteItem>, serde_json::Error> {
        match self.items_json.as_deref().map(str::trim) {
            None | Some("") => Ok(Vec::new()),
            Some(json) => serde_json::from_str(json),
        }
    }

    fn into_quote(self) -> Result<Quote, AppError> {
        let items = self.items()?;
        Ok(Quote {
            id: self.id,
            client: self.client.unwrap_or_default(),
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            address: non_blank(self.address),
            items,
            total: self.total.unwrap_or(0.0),
            date: self.date.unwrap_or_default(),
            status: QuoteStatus::from_stored(self.status.as_deref()),
        })
    }

    fn into_summary(self) -> QuoteSummary {
        let items_count = match self.items() {
            Ok(items) => items.len(),
            Err(e) => {
                tracing::warn!(id = self.id, error = %e, "unreadable items column");
                0
            }
        };
        QuoteSummary {
            id: self.id,
            client: self.client.unwrap_or_default(),
            total: self.total.unwrap_or(0.0),
            date: self.date.unwrap_or_default(),
            items_count,
            status: QuoteStatus::from_stored(self.status.as_deref()),
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Orçamento #{id} não encontrado"))
}

pub fn today_br() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[day]/[month]/[year]"))
        .unwrap_or_else(|_| "01/01/1970".to_string())
}

/// Inserts when the input carries no id, otherwise rewrites that row in
/// place (status untouched). Returns the row id.
pub fn save_quote(conn: &Connection, input: &QuoteInput) -> Result<i64, AppError> {
    let client = input.client.trim();
    if client.is_empty() {
        return Err(AppError::InvalidInput("client name is required".to_string()));
    }

    let items_sum: f64 = input.items.iter().map(|it| it.line_total).sum();
    if (items_sum - input.total).abs() > 0.005 {
        // Stored as supplied; the frontend owns the total.
        tracing::warn!(total = input.total, items_sum, client, "quote total differs from sum of line totals");
    }

    let items_json = serde_json::to_string(&input.items)?;
    let date = input
        .date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(today_br);
    let email = input.email.as_deref().unwrap_or("");
    let phone = input.phone.as_deref().unwrap_or("");
    let address = input.address.as_deref().unwrap_or("");

    match input.target_id()? {
        Some(id) => {
            let changed = conn.execute(
                UPDATE_QUOTE,
                params![id, client, email, phone, address, items_json, input.total, date],
            )?;
            if changed == 0 {
                return Err(not_found(id));
            }
            Ok(id)
        }
        None => {
            conn.execute(
                INSERT_QUOTE,
                params![client, email, phone, address, items_json, input.total, date],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}

pub fn delete_quote(conn: &Connection, id: i64) -> Result<(), AppError> {
    let changed = conn.execute("DELETE FROM quotes WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub fn update_status(conn: &Connection, id: i64, status: QuoteStatus) -> Result<(), AppError> {
    let changed = conn.execute(
        "UPDATE quotes SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub fn get_quote(conn: &Connection, id: i64) -> Result<Quote, AppError> {
    let row = match conn
        .query_row(SELECT_QUOTE, params![id], QuoteRow::from_current)
        .optional()
    {
        Err(e) if is_missing_column(&e) => conn
            .query_row(SELECT_QUOTE_LEGACY, params![id], QuoteRow::from_legacy)
            .optional()?,
        other => other?,
    };

    row.ok_or_else(|| not_found(id))?.into_quote()
}

pub fn list_quotes(conn: &Connection) -> Result<Vec<QuoteSummary>, AppError> {
    let (mut stmt, legacy) = match conn.prepare(LIST_QUOTES) {
        Ok(stmt) => (stmt, false),
        Err(e) if is_missing_column(&e) => (conn.prepare(LIST_QUOTES_LEGACY)?, true),
        Err(e) => return Err(e.into()),
    };
    let read: fn(&Row<'_>) -> rusqlite::Result<QuoteRow> = if legacy {
        QuoteRow::from_legacy
    } else {
        QuoteRow::from_current
    };

    let rows = stmt.query_map([], read)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_summary());
    }
    Ok(out)
}

/// Status buckets computed in SQL with the same rule `QuoteStatus::from_stored`
/// applies: case and surrounding blanks are ignored, anything unrecognised is
/// pending.
const STATS_BY_STATUS: &str = r#"SELECT
        CASE UPPER(TRIM(COALESCE(status, '')))
            WHEN 'APPROVED' THEN 'APPROVED'
            WHEN 'REJECTED' THEN 'REJECTED'
            ELSE 'PENDING'
        END AS bucket,
        COUNT(*),
        COALESCE(SUM(total), 0)
    FROM quotes
    GROUP BY bucket"#;
const STATS_LEGACY: &str = "SELECT 'PENDING', COUNT(*), COALESCE(SUM(total), 0) FROM quotes";

pub fn get_stats(conn: &Connection) -> Result<QuoteStats, AppError> {
    let mut stmt = match conn.prepare(STATS_BY_STATUS) {
        Ok(stmt) => stmt,
        Err(e) if is_missing_column(&e) => conn.prepare(STATS_LEGACY)?,
        Err(e) => return Err(e.into()),
    };

    let rows = stmt.query_map([], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?, r.get::<_, f64>(2)?))
    })?;

    let mut stats = QuoteStats::default();
    for row in rows {
        let (bucket, count, value) = row?;
        stats.total_count += count;
        match QuoteStatus::from_stored(Some(&bucket)) {
            QuoteStatus::Approved => {
                stats.approved_count = count;
                stats.approved_value = value;
            }
            QuoteStatus::Rejected => stats.rejected_count = count,
            QuoteStatus::Pending => {
                stats.pending_count = count;
                stats.pending_value = value;
            }
        }
    }
    Ok(stats)
}
