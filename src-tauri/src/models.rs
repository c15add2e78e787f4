use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_COMPANY_NAME: &str = "Minha Empresa";

/// One line of a quote, stored inside `quotes.items` as JSON.
///
/// Wire keys stay the short ones the webview has always sent
/// (`desc`, `qty`, `price`, `total`, `obs`), so rows written by older
/// builds deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    #[serde(rename = "desc", alias = "description")]
    pub description: String,
    #[serde(rename = "qty", alias = "quantity")]
    pub quantity: f64,
    #[serde(rename = "price", alias = "unit_price")]
    pub unit_price: f64,
    #[serde(rename = "total", alias = "line_total")]
    pub line_total: f64,
    #[serde(rename = "obs", alias = "note", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl QuoteItem {
    pub fn note_text(&self) -> Option<&str> {
        self.note.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "PENDING",
            QuoteStatus::Approved => "APPROVED",
            QuoteStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(v: &str) -> Option<Self> {
        let s = v.trim();
        if s.eq_ignore_ascii_case("pending") {
            Some(QuoteStatus::Pending)
        } else if s.eq_ignore_ascii_case("approved") {
            Some(QuoteStatus::Approved)
        } else if s.eq_ignore_ascii_case("rejected") {
            Some(QuoteStatus::Rejected)
        } else {
            None
        }
    }

    /// Rows written before the status column existed carry NULL or ''.
    pub fn from_stored(v: Option<&str>) -> Self {
        v.and_then(QuoteStatus::parse).unwrap_or_default()
    }
}

/// Full quote as returned by the detail lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub client: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub items: Vec<QuoteItem>,
    pub total: f64,
    pub date: String,
    pub status: QuoteStatus,
}

impl Quote {
    pub fn number_label(&self) -> String {
        format!("#{:04}", self.id)
    }
}

/// Payload of the save-quote command.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteInput {
    /// The webview sends `null`, `""`, a number, or a numeric string.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub client: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub items: Vec<QuoteItem>,
    pub total: f64,
    #[serde(default)]
    pub date: Option<String>,
}

impl QuoteInput {
    /// `Some(id)` means update in place, `None` means insert.
    pub fn target_id(&self) -> Result<Option<i64>, AppError> {
        match &self.id {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| AppError::InvalidInput(format!("quote id {n} is not an integer"))),
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<i64>()
                    .map(Some)
                    .map_err(|_| AppError::InvalidInput(format!("quote id {s:?} is not an integer")))
            }
            Some(other) => Err(AppError::InvalidInput(format!("unsupported quote id {other}"))),
        }
    }
}

/// Row of the history list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSummary {
    pub id: i64,
    pub client: String,
    pub total: f64,
    pub date: String,
    pub items_count: usize,
    pub status: QuoteStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuoteStats {
    pub total_count: i64,
    pub approved_count: i64,
    pub approved_value: f64,
    pub pending_count: i64,
    pub pending_value: f64,
    pub rejected_count: i64,
}

/// The singleton settings row (id = 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "company")]
    pub company_name: String,
    pub legal_name: String,
    #[serde(rename = "cnpj")]
    pub tax_id: String,
    pub address: String,
    pub phone: String,
    #[serde(rename = "footer")]
    pub footer_text: String,
    #[serde(rename = "pdf_path")]
    pub pdf_save_path: String,
    pub create_subfolder: bool,
    pub auto_save: bool,
    pub logo_path: String,
    pub payment_pix: bool,
    pub payment_credit: bool,
    pub payment_debit: bool,
    pub payment_cash: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            legal_name: String::new(),
            tax_id: String::new(),
            address: String::new(),
            phone: String::new(),
            footer_text: String::new(),
            pdf_save_path: String::new(),
            create_subfolder: false,
            auto_save: true,
            logo_path: String::new(),
            payment_pix: false,
            payment_credit: false,
            payment_debit: false,
            payment_cash: false,
        }
    }
}

impl Settings {
    pub fn display_name(&self) -> &str {
        let name = self.company_name.trim();
        if name.is_empty() {
            DEFAULT_COMPANY_NAME
        } else {
            name
        }
    }

    pub fn payment_labels(&self) -> Vec<&'static str> {
        [
            (self.payment_pix, "PIX"),
            (self.payment_credit, "Cartão de Crédito"),
            (self.payment_debit, "Cartão de Débito"),
            (self.payment_cash, "Dinheiro"),
        ]
        .into_iter()
        .filter_map(|(on, label)| on.then_some(label))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_with_id(id: serde_json::Value) -> QuoteInput {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "client": "Ana",
            "items": [],
            "total": 0.0
        }))
        .unwrap()
    }

    #[test]
    fn target_id_treats_null_and_blank_as_insert() {
        assert_eq!(input_with_id(serde_json::Value::Null).target_id().unwrap(), None);
        assert_eq!(input_with_id(serde_json::json!("  ")).target_id().unwrap(), None);
        assert_eq!(input_with_id(serde_json::json!(12)).target_id().unwrap(), Some(12));
        assert_eq!(input_with_id(serde_json::json!("12")).target_id().unwrap(), Some(12));
        assert!(input_with_id(serde_json::json!("abc")).target_id().is_err());
    }

    #[test]
    fn item_reads_webview_keys() {
        let item: QuoteItem = serde_json::from_str(
            r#"{"desc":"Pintura","obs":"","qty":2,"price":10.5,"total":21.0}"#,
        )
        .unwrap();
        assert_eq!(item.description, "Pintura");
        assert_eq!(item.quantity, 2.0);
        assert_eq!(item.note_text(), None);
    }

    #[test]
    fn stored_status_defaults_to_pending() {
        assert_eq!(QuoteStatus::from_stored(None), QuoteStatus::Pending);
        assert_eq!(QuoteStatus::from_stored(Some("")), QuoteStatus::Pending);
        assert_eq!(QuoteStatus::from_stored(Some("APPROVED")), QuoteStatus::Approved);
    }

    #[test]
    fn payment_labels_follow_flags() {
        let s = Settings {
            payment_pix: true,
            payment_cash: true,
            ..Settings::default()
        };
        assert_eq!(s.payment_labels(), vec!["PIX", "Dinheiro"]);
        assert!(Settings::default().payment_labels().is_empty());
    }
}
