use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;
use crate::models::Settings;

const FORBIDDEN_PATH_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strips characters that are not allowed in a path segment on common
/// filesystems, plus surrounding whitespace.
pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .filter(|c| !FORBIDDEN_PATH_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn pdf_filename(id: i64, client: &str) -> String {
    format!("Orcamento_{}_{}.pdf", id, sanitize_filename(client))
}

/// Where a generated document ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPdf {
    pub file: String,
    pub saved_automatically: bool,
}

/// Picks the output directory. The configured directory is used only when
/// auto-save is on and it exists; otherwise `temp_dir`. The flag reports
/// which of the two was chosen.
pub fn resolve_output_dir(
    settings: &Settings,
    client: &str,
    temp_dir: &Path,
) -> Result<(PathBuf, bool), AppError> {
    let configured = settings.pdf_save_path.trim();
    if !settings.auto_save || configured.is_empty() {
        return Ok((temp_dir.to_path_buf(), false));
    }

    let base = PathBuf::from(configured);
    if !base.is_dir() {
        tracing::warn!(path = %base.display(), "configured save directory missing; using temp dir");
        return Ok((temp_dir.to_path_buf(), false));
    }

    if settings.create_subfolder {
        let folder = sanitize_filename(client);
        if !folder.is_empty() {
            let dir = base.join(folder);
            std::fs::create_dir_all(&dir)?;
            return Ok((dir, true));
        }
    }

    Ok((base, true))
}

/// Writes the rendered bytes to the resolved destination.
pub fn write_pdf(
    settings: &Settings,
    id: i64,
    client: &str,
    temp_dir: &Path,
    bytes: &[u8],
) -> Result<GeneratedPdf, AppError> {
    let (dir, saved_automatically) = resolve_output_dir(settings, client, temp_dir)?;
    std::fs::create_dir_all(&dir)?;

    let full_path = dir.join(pdf_filename(id, client));
    std::fs::write(&full_path, bytes)?;
    tracing::info!(path = %full_path.display(), saved_automatically, "pdf written");

    Ok(GeneratedPdf {
        file: full_path.to_string_lossy().to_string(),
        saved_automatically,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto_save_to(dir: &Path, subfolder: bool) -> Settings {
        Settings {
            pdf_save_path: dir.to_string_lossy().to_string(),
            auto_save: true,
            create_subfolder: subfolder,
            ..Settings::default()
        }
    }

    #[test]
    fn sanitize_strips_reserved_characters() {
        let out = sanitize_filename("  João <Silva>/Ltda: \"A|B\"?* \\ ");
        for c in FORBIDDEN_PATH_CHARS {
            assert!(!out.contains(c), "{c} left in {out:?}");
        }
        assert_eq!(out, "João SilvaLtda AB");
    }

    #[test]
    fn filename_is_deterministic() {
        assert_eq!(pdf_filename(12, "Maria / Souza"), "Orcamento_12_Maria  Souza.pdf");
        assert_eq!(pdf_filename(12, "Maria / Souza"), pdf_filename(12, "Maria / Souza"));
    }

    #[test]
    fn missing_directory_falls_back_to_temp() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let (dir, auto) = resolve_output_dir(&auto_save_to(&missing, false), "Ana", tmp.path()).unwrap();
        assert_eq!(dir, tmp.path());
        assert!(!auto);
    }

    #[test]
    fn auto_save_disabled_uses_temp() {
        let out = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let mut s = auto_save_to(out.path(), false);
        s.auto_save = false;
        let (dir, auto) = resolve_output_dir(&s, "Ana", tmp.path()).unwrap();
        assert_eq!(dir, tmp.path());
        assert!(!auto);
    }

    #[test]
    fn subfolder_is_created_per_client() {
        let out = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let (dir, auto) =
            resolve_output_dir(&auto_save_to(out.path(), true), "Ana <Costa>", tmp.path()).unwrap();
        assert!(auto);
        assert_eq!(dir, out.path().join("Ana Costa"));
        assert!(dir.is_dir());
    }

    #[test]
    fn write_pdf_lands_in_configured_dir() {
        let out = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let res = write_pdf(&auto_save_to(out.path(), false), 3, "Bia", tmp.path(), b"%PDF-1.3").unwrap();
        assert!(res.saved_automatically);
        let path = PathBuf::from(&res.file);
        assert_eq!(path, out.path().join("Orcamento_3_Bia.pdf"));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.3");
    }
}
