use rusqlite::{params, Connection, OptionalExtension, Row};

use super::is_missing_column;
use crate::error::AppError;
use crate::models::Settings;

pub const SETTINGS_ID: i64 = 1;

const SELECT_SETTINGS: &str = r#"SELECT
        company_name, company_legal_name, company_cnpj, company_address, company_phone,
        footer_text, pdf_save_path, pdf_create_subfolder, pdf_auto_save, logo_path,
        payment_pix, payment_credit, payment_debit, payment_cash
    FROM settings WHERE id = ?1"#;
const SELECT_SETTINGS_LEGACY: &str = "SELECT company_name, footer_text FROM settings WHERE id = ?1";

const INSERT_SETTINGS: &str = r#"INSERT INTO settings (
        id, company_name, company_legal_name, company_cnpj, company_address, company_phone,
        footer_text, pdf_save_path, pdf_create_subfolder, pdf_auto_save, logo_path,
        payment_pix, payment_credit, payment_debit, payment_cash
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#;

const UPDATE_SETTINGS: &str = r#"UPDATE settings SET
        company_name = ?2,
        company_legal_name = ?3,
        company_cnpj = ?4,
        company_address = ?5,
        company_phone = ?6,
        footer_text = ?7,
        pdf_save_path = ?8,
        pdf_create_subfolder = ?9,
        pdf_auto_save = ?10,
        logo_path = ?11,
        payment_pix = ?12,
        payment_credit = ?13,
        payment_debit = ?14,
        payment_cash = ?15
    WHERE id = ?1"#;

/// Raw settings row. Every column is nullable: rows saved by older builds
/// leave the newer columns NULL.
#[derive(Default)]
struct SettingsRow {
    company_name: Option<String>,
    legal_name: Option<String>,
    tax_id: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    footer_text: Option<String>,
    pdf_save_path: Option<String>,
    create_subfolder: Option<i64>,
    auto_save: Option<i64>,
    logo_path: Option<String>,
    payment_pix: Option<i64>,
    payment_credit: Option<i64>,
    payment_debit: Option<i64>,
    payment_cash: Option<i64>,
}

impl SettingsRow {
    fn from_current(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            company_name: r.get(0)?,
            legal_name: r.get(1)?,
            tax_id: r.get(2)?,
            address: r.get(3)?,
            phone: r.get(4)?,
            footer_text: r.get(5)?,
            pdf_save_path: r.get(6)?,
            create_subfolder: r.get(7)?,
            auto_save: r.get(8)?,
            logo_path: r.get(9)?,
            payment_pix: r.get(10)?,
            payment_credit: r.get(11)?,
            payment_debit: r.get(12)?,
            payment_cash: r.get(13)?,
        })
    }

    fn from_legacy(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            company_name: r.get(0)?,
            footer_text: r.get(1)?,
            ..Self::default()
        })
    }

    fn into_settings(self) -> Settings {
        let defaults = Settings::default();
        let flag = |v: Option<i64>, default: bool| v.map(|n| n != 0).unwrap_or(default);
        Settings {
            company_name: self.company_name.unwrap_or_default(),
            legal_name: self.legal_name.unwrap_or_default(),
            tax_id: self.tax_id.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
            footer_text: self.footer_text.unwrap_or_default(),
            pdf_save_path: self.pdf_save_path.unwrap_or_default(),
            create_subfolder: flag(self.create_subfolder, defaults.create_subfolder),
            auto_save: flag(self.auto_save, defaults.auto_save),
            logo_path: self.logo_path.unwrap_or_default(),
            payment_pix: flag(self.payment_pix, defaults.payment_pix),
            payment_credit: flag(self.payment_credit, defaults.payment_credit),
            payment_debit: flag(self.payment_debit, defaults.payment_debit),
            payment_cash: flag(self.payment_cash, defaults.payment_cash),
        }
    }
}

/// Returns the stored settings, or the defaults when nothing was saved yet.
pub fn read_settings(conn: &Connection) -> Result<Settings, AppError> {
    let row = match conn
        .query_row(SELECT_SETTINGS, params![SETTINGS_ID], SettingsRow::from_current)
        .optional()
    {
        Err(e) if is_missing_column(&e) => {
            tracing::warn!("settings table predates current columns; reading legacy shape");
            conn.query_row(SELECT_SETTINGS_LEGACY, params![SETTINGS_ID], SettingsRow::from_legacy)
                .optional()?
        }
        other => other?,
    };

    Ok(row.map(SettingsRow::into_settings).unwrap_or_default())
}

pub fn save_settings(conn: &Connection, s: &Settings) -> Result<(), AppError> {
    let exists = conn
        .query_row("SELECT id FROM settings WHERE id = ?1", params![SETTINGS_ID], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some();

    let sql = if exists { UPDATE_SETTINGS } else { INSERT_SETTINGS };
    conn.execute(
        sql,
        params![
            SETTINGS_ID,
            s.company_name,
            s.legal_name,
            s.tax_id,
            s.address,
            s.phone,
            s.footer_text,
            s.pdf_save_path,
            s.create_subfolder as i64,
            s.auto_save as i64,
            s.logo_path,
            s.payment_pix as i64,
            s.payment_credit as i64,
            s.payment_debit as i64,
            s.payment_cash as i64,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_store;

    fn sample() -> Settings {
        Settings {
            company_name: "Marcenaria Silva".to_string(),
            legal_name: "Silva & Filhos Ltda".to_string(),
            tax_id: "12.345.678/0001-90".to_string(),
            address: "Rua das Flores, 10 - Curitiba".to_string(),
            phone: "(41) 99999-0000".to_string(),
            footer_text: "Validade: 15 dias".to_string(),
            pdf_save_path: "/home/silva/orcamentos".to_string(),
            create_subfolder: true,
            auto_save: false,
            logo_path: "/home/silva/.local/share/logo.png".to_string(),
            payment_pix: true,
            payment_credit: false,
            payment_debit: true,
            payment_cash: false,
        }
    }

    #[test]
    fn empty_store_returns_defaults() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        let s = read_settings(&conn).unwrap();
        assert_eq!(s, Settings::default());
        assert!(s.auto_save);
        assert!(!s.create_subfolder);
    }

    #[test]
    fn save_then_read_round_trips_every_field() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        save_settings(&conn, &sample()).unwrap();
        assert_eq!(read_settings(&conn).unwrap(), sample());
    }

    #[test]
    fn second_save_updates_the_singleton() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        save_settings(&conn, &sample()).unwrap();

        let mut changed = sample();
        changed.company_name = "Nova".to_string();
        changed.payment_cash = true;
        save_settings(&conn, &changed).unwrap();

        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM settings", [], |r| r.get(0)).unwrap();
        assert_eq!(rows, 1);
        assert_eq!(read_settings(&conn).unwrap(), changed);
    }

    #[test]
    fn null_columns_fall_back_to_defaults() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        conn.execute(
            "INSERT INTO settings (id, company_name, pdf_auto_save, payment_pix) VALUES (1, 'ACME', NULL, NULL)",
            [],
        )
        .unwrap();

        let s = read_settings(&conn).unwrap();
        assert_eq!(s.company_name, "ACME");
        assert_eq!(s.legal_name, "");
        assert!(s.auto_save);
        assert!(!s.payment_pix);
    }

    #[test]
    fn legacy_table_reads_with_defaults() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE settings (id INTEGER PRIMARY KEY, company_name TEXT, footer_text TEXT);
             INSERT INTO settings VALUES (1, 'Antiga', 'Obrigado!');",
        )
        .unwrap();

        let s = read_settings(&conn).unwrap();
        assert_eq!(s.company_name, "Antiga");
        assert_eq!(s.footer_text, "Obrigado!");
        assert_eq!(s.pdf_save_path, "");
        assert!(s.auto_save);
    }
}
