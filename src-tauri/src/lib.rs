use std::path::{Path, PathBuf};

use tauri::Manager;
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;
use tracing_subscriber::EnvFilter;

pub mod bridge;
pub mod db;
pub mod error;
pub mod export;
pub mod logo;
pub mod models;
pub mod pdf;

use bridge::AppContext;
use error::{AppError, Envelope};
use export::GeneratedPdf;
use logo::LogoSelection;
use models::{Quote, QuoteInput, QuoteStats, QuoteStatus, QuoteSummary, Settings};

type CommandResult<T> = Result<Envelope<T>, String>;

/// Runs `f` off the async runtime; store calls and image work block.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tauri::async_runtime::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Task(e.to_string()))?
}

async fn with_context<T, F>(state: tauri::State<'_, AppContext>, f: F) -> CommandResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppContext) -> Result<T, AppError> + Send + 'static,
{
    let ctx = state.inner().clone();
    Ok(blocking(move || f(&ctx)).await.into())
}

#[tauri::command]
async fn select_folder(app: tauri::AppHandle) -> CommandResult<Option<String>> {
    let res = blocking(move || {
        let picked = app.dialog().file().blocking_pick_folder();
        match picked {
            None => Ok(None),
            Some(fp) => fp
                .into_path()
                .map(|p| Some(p.to_string_lossy().to_string()))
                .map_err(|e| AppError::Dialog(e.to_string())),
        }
    })
    .await;
    Ok(res.into())
}

#[tauri::command]
async fn select_logo(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppContext>,
) -> CommandResult<Option<LogoSelection>> {
    let ctx = state.inner().clone();
    let res = blocking(move || {
        let picked = app
            .dialog()
            .file()
            .add_filter("Imagens", &["png", "jpg", "jpeg"])
            .blocking_pick_file();
        let Some(fp) = picked else {
            return Ok(None);
        };
        let src: PathBuf = fp.into_path().map_err(|e| AppError::Dialog(e.to_string()))?;
        bridge::select_logo(&ctx, &src).map(Some)
    })
    .await;
    Ok(res.into())
}

#[tauri::command]
async fn update_quote_status(
    state: tauri::State<'_, AppContext>,
    id: i64,
    status: String,
) -> CommandResult<QuoteStatus> {
    with_context(state, move |ctx| bridge::update_quote_status(ctx, id, &status)).await
}

#[tauri::command]
async fn delete_quote(state: tauri::State<'_, AppContext>, id: i64) -> CommandResult<()> {
    with_context(state, move |ctx| bridge::delete_quote(ctx, id)).await
}

#[tauri::command]
async fn save_quote(state: tauri::State<'_, AppContext>, quote: QuoteInput) -> CommandResult<i64> {
    with_context(state, move |ctx| bridge::save_quote(ctx, &quote)).await
}

#[tauri::command]
async fn get_quote_detail(state: tauri::State<'_, AppContext>, id: i64) -> CommandResult<Quote> {
    with_context(state, move |ctx| bridge::get_quote_detail(ctx, id)).await
}

#[tauri::command]
async fn list_quotes(state: tauri::State<'_, AppContext>) -> CommandResult<Vec<QuoteSummary>> {
    with_context(state, bridge::list_quotes).await
}

#[tauri::command]
async fn get_stats(state: tauri::State<'_, AppContext>) -> CommandResult<QuoteStats> {
    with_context(state, bridge::get_stats).await
}

#[tauri::command]
async fn save_settings(state: tauri::State<'_, AppContext>, settings: Settings) -> CommandResult<()> {
    with_context(state, move |ctx| bridge::save_settings(ctx, &settings)).await
}

#[tauri::command]
async fn get_settings(state: tauri::State<'_, AppContext>) -> CommandResult<Settings> {
    with_context(state, bridge::get_settings).await
}

#[tauri::command]
async fn generate_pdf(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppContext>,
    id: i64,
) -> CommandResult<GeneratedPdf> {
    let ctx = state.inner().clone();
    let res = blocking(move || bridge::generate_pdf(&ctx, id)).await;

    if let Ok(out) = &res {
        // The file is already written; a viewer failure is not a generation failure.
        if let Err(e) = app.opener().open_path(out.file.clone(), None::<&str>) {
            tracing::warn!(file = %out.file, error = %e, "could not open generated pdf");
        }
    }
    Ok(res.into())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn open_context(app: &tauri::AppHandle) -> Result<AppContext, AppError> {
    let db_path = db::resolve_db_path(app)?;
    let store = db::Store::open(&db_path)?;

    let data_dir = match app.path().app_data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "app data dir unavailable; storing logo next to the database");
            db_path.parent().map(Path::to_path_buf).unwrap_or_default()
        }
    };

    Ok(AppContext::new(store, data_dir))
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging();

    tauri::Builder::default()
        .setup(|app| {
            let handle = app.handle();
            let ctx = open_context(handle).inspect_err(|e| {
                tracing::error!(error = %e, "startup aborted: store unavailable");
            })?;
            app.manage(ctx);
            Ok(())
        })
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .invoke_handler(tauri::generate_handler![
            select_folder,
            select_logo,
            update_quote_status,
            delete_quote,
            save_quote,
            get_quote_detail,
            list_quotes,
            get_stats,
            save_settings,
            get_settings,
            generate_pdf
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
