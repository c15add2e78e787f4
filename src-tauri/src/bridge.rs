use std::path::{Path, PathBuf};

use crate::db::{quotes, settings, Store};
use crate::error::AppError;
use crate::export::{self, GeneratedPdf};
use crate::logo::{self, LogoSelection};
use crate::models::{Quote, QuoteInput, QuoteStats, QuoteStatus, QuoteSummary, Settings};
use crate::pdf;

/// Everything a bridge operation needs, resolved once at startup and
/// handed to Tauri as managed state.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub store: Store,
    /// Holds the processed `logo.png`.
    pub data_dir: PathBuf,
    /// Fallback output directory when auto-save cannot be used.
    pub temp_dir: PathBuf,
}

impl AppContext {
    pub fn new(store: Store, data_dir: PathBuf) -> Self {
        Self {
            store,
            data_dir,
            temp_dir: std::env::temp_dir(),
        }
    }
}

pub fn save_quote(ctx: &AppContext, input: &QuoteInput) -> Result<i64, AppError> {
    ctx.store.with_conn("save_quote", |conn| quotes::save_quote(conn, input))
}

pub fn delete_quote(ctx: &AppContext, id: i64) -> Result<(), AppError> {
    ctx.store.with_conn("delete_quote", |conn| quotes::delete_quote(conn, id))
}

pub fn update_quote_status(ctx: &AppContext, id: i64, status: &str) -> Result<QuoteStatus, AppError> {
    let status = QuoteStatus::parse(status)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown status {status:?}")))?;
    ctx.store
        .with_conn("update_quote_status", |conn| quotes::update_status(conn, id, status))?;
    Ok(status)
}

pub fn get_quote_detail(ctx: &AppContext, id: i64) -> Result<Quote, AppError> {
    ctx.store.with_conn("get_quote_detail", |conn| quotes::get_quote(conn, id))
}

pub fn list_quotes(ctx: &AppContext) -> Result<Vec<QuoteSummary>, AppError> {
    ctx.store.with_conn("list_quotes", quotes::list_quotes)
}

pub fn get_stats(ctx: &AppContext) -> Result<QuoteStats, AppError> {
    ctx.store.with_conn("get_stats", quotes::get_stats)
}

pub fn save_settings(ctx: &AppContext, s: &Settings) -> Result<(), AppError> {
    ctx.store.with_conn("save_settings", |conn| settings::save_settings(conn, s))
}

pub fn get_settings(ctx: &AppContext) -> Result<Settings, AppError> {
    ctx.store.with_conn("get_settings", settings::read_settings)
}

pub fn select_logo(ctx: &AppContext, src: &Path) -> Result<LogoSelection, AppError> {
    logo::select_logo(src, &ctx.data_dir).inspect_err(|e| {
        tracing::warn!(src = %src.display(), error = %e, "logo processing failed");
    })
}

/// Renders the stored quote with the current settings and writes it to the
/// resolved destination. Opening the file is left to the caller.
pub fn generate_pdf(ctx: &AppContext, id: i64) -> Result<GeneratedPdf, AppError> {
    let (quote, settings) = ctx.store.with_conn("generate_pdf", |conn| {
        Ok((quotes::get_quote(conn, id)?, settings::read_settings(conn)?))
    })?;

    let logo = pdf::load_logo(&settings.logo_path);
    let rendered = pdf::render_quote_pdf(&quote, &settings, logo.as_ref())?;
    tracing::debug!(id, pages = rendered.pages, bytes = rendered.bytes.len(), "pdf rendered");

    export::write_pdf(&settings, quote.id, &quote.client, &ctx.temp_dir, &rendered.bytes)
}
