use std::io::{BufWriter, Cursor};
use std::path::Path;

use printpdf::image_crate::DynamicImage;
use printpdf::path::PaintMode;
use printpdf::{
    Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};

use crate::error::AppError;
use crate::models::{Quote, QuoteItem, Settings};

pub mod format;

use format::{format_currency, format_qty, wrap_text_by_width_mm, Fonts, Typeface, PT_TO_MM};

// Layout constants (A4, millimeters, origin bottom-left)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 15.0;
const CONTENT_RIGHT: f32 = PAGE_W - MARGIN_X;
const CONTENT_W: f32 = CONTENT_RIGHT - MARGIN_X;

const ACCENT_BAR_H: f32 = 5.0;
const LOGO_SIZE: f32 = 22.0;
const LOGO_GAP: f32 = 4.0;
const LOGO_DPI: f32 = 300.0;
// Company lines must stay left of the number/date block.
const IDENTITY_RIGHT: f32 = 108.0;

const COL_DESC_W: f32 = 90.0;
const COL_QTY_W: f32 = 25.0;
const COL_UNIT_W: f32 = 30.0;
const COL_TOTAL_W: f32 = 35.0;
const TABLE_HEADER_H: f32 = 9.0;
const CELL_PAD_X: f32 = 2.0;
const CELL_PAD_Y: f32 = 1.8;
const ROW_FONT: f32 = 10.0;
const ROW_LINE_H: f32 = 5.0;

// A row may not extend below this line; the footer lives underneath.
const ROWS_BOTTOM_LIMIT: f32 = 40.0;
// If the cursor sits below this before the total box, the box goes to a new page.
const TOTAL_BREAK_Y: f32 = 52.0;
const TOTAL_GAP: f32 = 8.0;
const TOTAL_BOX_X: f32 = 120.0;
const TOTAL_BOX_H: f32 = 12.0;
const TOTAL_LABEL_W: f32 = 40.0;

const FOOTER_TEXT_TOP_Y: f32 = 35.0;
const FOOTER_TEXT_MIN_Y: f32 = 20.0;
const PAYMENT_LINE_Y: f32 = 14.0;
const PAGE_STAMP_Y: f32 = 8.0;

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

fn row_height(lines: usize) -> f32 {
    lines as f32 * ROW_LINE_H + 2.0 * CELL_PAD_Y
}

/// How many wrapped lines fit between `y` and the bottom limit.
fn lines_fitting_below(y: f32) -> usize {
    let room = y - ROWS_BOTTOM_LIMIT - 2.0 * CELL_PAD_Y;
    if room <= 0.0 {
        0
    } else {
        ((room + 1e-3) / ROW_LINE_H).floor() as usize
    }
}

#[derive(Debug, Clone, Copy)]
enum Weight {
    Regular,
    Bold,
}

/// Result of a render: the PDF bytes plus the page count.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Owns the document and a flowing cursor `y` on the current page.
struct Painter {
    doc: PdfDocumentReference,
    fonts: Fonts,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    pages: Vec<PdfLayerReference>,
    layer: PdfLayerReference,
    y: f32,
    /// Cursor right under the table header of the current page, once drawn.
    body_top: Option<f32>,
}

impl Painter {
    fn new(title: &str, fonts: Fonts) -> Result<Self, AppError> {
        let (doc, page1, layer1) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let regular = doc
            .add_external_font(Cursor::new(fonts.regular.bytes()))
            .map_err(|e| AppError::Pdf(e.to_string()))?;
        let bold = doc
            .add_external_font(Cursor::new(fonts.bold.bytes()))
            .map_err(|e| AppError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page1).get_layer(layer1);

        Ok(Self {
            doc,
            fonts,
            regular,
            bold,
            pages: vec![layer.clone()],
            layer,
            y: PAGE_H,
            body_top: None,
        })
    }

    fn add_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages.push(self.layer.clone());
        self.y = PAGE_H;
        self.body_top = None;
    }

    fn at_body_top(&self) -> bool {
        self.body_top.is_some_and(|top| (top - self.y).abs() < 1e-3)
    }

    fn face(&self, weight: Weight) -> (&IndirectFontRef, &Typeface) {
        match weight {
            Weight::Regular => (&self.regular, &self.fonts.regular),
            Weight::Bold => (&self.bold, &self.fonts.bold),
        }
    }

    fn width(&self, text: &str, size: f32, weight: Weight) -> f32 {
        self.face(weight).1.width_mm(text, size)
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, weight: Weight, color: Color) {
        self.layer.set_fill_color(color);
        self.layer.use_text(text, size, Mm(x), Mm(y), self.face(weight).0);
    }

    fn text_right(&self, text: &str, size: f32, x_right: f32, y: f32, weight: Weight, color: Color) {
        let w = self.width(text, size, weight);
        self.text(text, size, (x_right - w).max(0.0), y, weight, color);
    }

    fn text_center(&self, text: &str, size: f32, x_left: f32, width: f32, y: f32, weight: Weight, color: Color) {
        let w = self.width(text, size, weight);
        self.text(text, size, x_left + ((width - w) / 2.0).max(0.0), y, weight, color);
    }

    fn rect(&self, x: f32, y_top: f32, w: f32, h: f32, fill: Option<Color>, stroke: Option<(Color, f32)>) {
        let mode = match (&fill, &stroke) {
            (Some(_), Some(_)) => PaintMode::FillStroke,
            (Some(_), None) => PaintMode::Fill,
            (None, Some(_)) => PaintMode::Stroke,
            (None, None) => return,
        };
        if let Some(c) = fill {
            self.layer.set_fill_color(c);
        }
        if let Some((c, thickness)) = stroke {
            self.layer.set_outline_color(c);
            self.layer.set_outline_thickness(thickness);
        }
        let rect = Rect::new(Mm(x), Mm(y_top - h), Mm(x + w), Mm(y_top)).with_mode(mode);
        self.layer.add_rect(rect);
    }

    fn line(&self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color, thickness: f32) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y1)), false),
                (Point::new(Mm(x2), Mm(y2)), false),
            ],
            is_closed: false,
        });
    }

    fn rule(&self, y: f32, color: Color, thickness: f32) {
        self.line(MARGIN_X, y, CONTENT_RIGHT, y, color, thickness);
    }

    fn finish(self) -> Result<RenderedPdf, AppError> {
        let Painter { doc, pages, layer, .. } = self;
        let page_count = pages.len();
        drop(layer);
        drop(pages);

        let mut writer = BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer).map_err(|e| AppError::Pdf(e.to_string()))?;
        let bytes = writer.into_inner().map_err(|e| AppError::Pdf(e.to_string()))?;
        Ok(RenderedPdf {
            bytes,
            pages: page_count,
        })
    }
}

/// Loads the company logo for embedding. A missing or unreadable file only
/// drops the logo from the header.
pub fn load_logo(path: &str) -> Option<DynamicImage> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    if !Path::new(path).exists() {
        tracing::warn!(path, "logo file not found; rendering without logo");
        return None;
    }
    match printpdf::image_crate::open(path) {
        Ok(img) => Some(img),
        Err(e) => {
            tracing::warn!(path, error = %e, "unreadable logo; rendering without logo");
            None
        }
    }
}

/// One centered footer line.
#[derive(Debug, Clone, PartialEq)]
struct FooterText {
    text: String,
    size: f32,
    y: f32,
    gray: u8,
}

struct Template<'a> {
    quote: &'a Quote,
    settings: &'a Settings,
    logo: Option<&'a DynamicImage>,
}

impl Template<'_> {
    /// Accent bar, title, logo, company block, number/date and client block.
    /// Drawn on every page; leaves the cursor below the client block.
    fn draw_page_header(&self, p: &mut Painter) {
        let s = self.settings;
        let q = self.quote;

        p.rect(0.0, PAGE_H, PAGE_W, ACCENT_BAR_H, Some(rgb(55, 65, 81)), None);
        p.text_right("ORÇAMENTO", 28.0, CONTENT_RIGHT, PAGE_H - 20.0, Weight::Bold, rgb(220, 220, 220));

        let identity_top = PAGE_H - 28.0;
        let mut identity_x = MARGIN_X;
        let mut logo_bottom = identity_top;

        if let Some(img) = self.logo {
            let rgb_img = DynamicImage::ImageRgb8(img.to_rgb8());
            let px_w = rgb_img.width().max(1) as f32;
            let px_h = rgb_img.height().max(1) as f32;
            let natural_w_mm = px_w / LOGO_DPI * 25.4;
            let natural_h_mm = px_h / LOGO_DPI * 25.4;
            let scale = (LOGO_SIZE / natural_w_mm).min(LOGO_SIZE / natural_h_mm);

            logo_bottom = identity_top - LOGO_SIZE;
            Image::from_dynamic_image(&rgb_img).add_to_layer(
                p.layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(MARGIN_X)),
                    translate_y: Some(Mm(logo_bottom)),
                    rotate: None,
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(LOGO_DPI),
                },
            );
            identity_x = MARGIN_X + LOGO_SIZE + LOGO_GAP;
        }

        // Company identity: every line optional except the name.
        let identity_w = IDENTITY_RIGHT - identity_x;
        let mut y = identity_top - p.fonts.bold.ascent_mm(14.0);
        p.text(s.display_name(), 14.0, identity_x, y, Weight::Bold, rgb(0, 0, 0));
        y -= 6.0;

        let mut company_lines: Vec<String> = Vec::new();
        let legal = s.legal_name.trim();
        if !legal.is_empty() {
            company_lines.push(legal.to_string());
        }
        let tax_id = s.tax_id.trim();
        if !tax_id.is_empty() {
            company_lines.push(format!("CNPJ: {tax_id}"));
        }
        let address = s.address.trim();
        if !address.is_empty() {
            company_lines.extend(wrap_text_by_width_mm(&p.fonts.regular, address, 9.0, identity_w));
        }
        let phone = s.phone.trim();
        if !phone.is_empty() {
            company_lines.push(format!("Tel: {phone}"));
        }
        for line in &company_lines {
            p.text(line, 9.0, identity_x, y, Weight::Regular, rgb(80, 80, 80));
            y -= 4.5;
        }
        let identity_bottom = y;

        // Number and date, right column.
        let label_right = 140.0;
        let mut y_meta = PAGE_H - 42.0;
        for (label, value) in [("Número:", q.number_label()), ("Data:", q.date.clone())] {
            p.text_right(label, 10.0, label_right, y_meta, Weight::Bold, rgb(0, 0, 0));
            p.text_right(&value, 10.0, CONTENT_RIGHT, y_meta, Weight::Regular, rgb(0, 0, 0));
            y_meta -= 6.0;
        }

        let mut y = identity_bottom.min(logo_bottom).min(y_meta) - 4.0;
        p.rule(y, rgb(200, 200, 200), 0.3);
        y -= 6.0;

        // Client block.
        p.text("PREPARADO PARA:", 10.0, MARGIN_X, y, Weight::Bold, rgb(100, 100, 100));
        y -= 6.0;
        p.text(q.client.trim(), 12.0, MARGIN_X, y, Weight::Bold, rgb(0, 0, 0));
        y -= 5.5;

        let contact = [q.email.as_deref(), q.phone.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");
        if !contact.is_empty() {
            p.text(&contact, 10.0, MARGIN_X, y, Weight::Regular, rgb(80, 80, 80));
            y -= 5.0;
        }
        if let Some(addr) = q.address.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            for line in wrap_text_by_width_mm(&p.fonts.regular, addr, 10.0, CONTENT_W) {
                p.text(&line, 10.0, MARGIN_X, y, Weight::Regular, rgb(80, 80, 80));
                y -= 5.0;
            }
        }

        p.y = y - 6.0;
    }

    fn draw_table_header(&self, p: &mut Painter) {
        let top = p.y;
        let dark = rgb(50, 50, 50);
        p.rect(MARGIN_X, top, CONTENT_W, TABLE_HEADER_H, Some(dark.clone()), Some((dark, 0.2)));

        let baseline = top - TABLE_HEADER_H / 2.0 - 10.0 * PT_TO_MM * 0.35;
        let white = rgb(255, 255, 255);
        let x_qty = MARGIN_X + COL_DESC_W;
        let x_unit = x_qty + COL_QTY_W;
        let x_total = x_unit + COL_UNIT_W;

        p.text("DESCRIÇÃO / SERVIÇO", 10.0, MARGIN_X + CELL_PAD_X, baseline, Weight::Bold, white.clone());
        p.text_center("QTD", 10.0, x_qty, COL_QTY_W, baseline, Weight::Bold, white.clone());
        p.text_right("UNITÁRIO", 10.0, x_total - CELL_PAD_X, baseline, Weight::Bold, white.clone());
        p.text_right("TOTAL", 10.0, x_total + COL_TOTAL_W - CELL_PAD_X, baseline, Weight::Bold, white);

        p.y = top - TABLE_HEADER_H;
        p.body_top = Some(p.y);
    }

    fn start_page(&self, p: &mut Painter, with_table_header: bool) {
        p.add_page();
        self.draw_page_header(p);
        if with_table_header {
            self.draw_table_header(p);
        }
    }

    fn description_lines(face: &Typeface, item: &QuoteItem) -> Vec<String> {
        let width = COL_DESC_W - 2.0 * CELL_PAD_X;
        let mut lines = wrap_text_by_width_mm(face, &item.description, ROW_FONT, width);
        if let Some(note) = item.note_text() {
            lines.extend(wrap_text_by_width_mm(face, &format!("(Obs: {note})"), ROW_FONT, width));
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    /// One table row. Height follows the wrapped description; the other
    /// cells stretch to it. A row that does not fit moves to the next page;
    /// one taller than a whole page continues over as many pages as needed.
    fn draw_row(&self, p: &mut Painter, idx: usize, item: &QuoteItem) {
        let lines = Self::description_lines(&p.fonts.regular, item);

        if p.y - row_height(lines.len()) < ROWS_BOTTOM_LIMIT && !p.at_body_top() {
            self.start_page(p, true);
        }

        let mut rest = lines.as_slice();
        let mut first = true;
        loop {
            let take = lines_fitting_below(p.y).max(1).min(rest.len());
            let (chunk, tail) = rest.split_at(take);
            self.draw_row_segment(p, idx, chunk, first.then_some(item));
            rest = tail;
            first = false;

            if rest.is_empty() {
                break;
            }
            self.start_page(p, true);
        }
    }

    /// Draws `lines` as one bordered cell band; the numeric cells only on
    /// the first segment of a row.
    fn draw_row_segment(&self, p: &mut Painter, idx: usize, lines: &[String], numbers: Option<&QuoteItem>) {
        let row_h = row_height(lines.len());
        let top = p.y;
        let bottom = top - row_h;
        if idx % 2 == 1 {
            p.rect(MARGIN_X, top, CONTENT_W, row_h, Some(rgb(248, 248, 248)), None);
        }

        let black = rgb(0, 0, 0);
        let mut baseline = top - CELL_PAD_Y - p.fonts.regular.ascent_mm(ROW_FONT);
        for line in lines {
            p.text(line, ROW_FONT, MARGIN_X + CELL_PAD_X, baseline, Weight::Regular, black.clone());
            baseline -= ROW_LINE_H;
        }

        if let Some(item) = numbers {
            let mid = top - row_h / 2.0 - ROW_FONT * PT_TO_MM * 0.35;
            let x_qty = MARGIN_X + COL_DESC_W;
            let x_unit = x_qty + COL_QTY_W;
            let x_total = x_unit + COL_UNIT_W;
            p.text_center(&format_qty(item.quantity), ROW_FONT, x_qty, COL_QTY_W, mid, Weight::Regular, black.clone());
            p.text_right(
                &format_currency(item.unit_price),
                ROW_FONT,
                x_total - CELL_PAD_X,
                mid,
                Weight::Regular,
                black.clone(),
            );
            p.text_right(
                &format_currency(item.line_total),
                ROW_FONT,
                x_total + COL_TOTAL_W - CELL_PAD_X,
                mid,
                Weight::Regular,
                black,
            );
        }

        let border = rgb(220, 220, 220);
        p.line(MARGIN_X, top, MARGIN_X, bottom, border.clone(), 0.2);
        p.line(CONTENT_RIGHT, top, CONTENT_RIGHT, bottom, border.clone(), 0.2);
        p.rule(bottom, border, 0.2);

        p.y = bottom;
    }

    fn draw_total_box(&self, p: &mut Painter) {
        p.y -= TOTAL_GAP;
        if p.y < TOTAL_BREAK_Y {
            self.start_page(p, false);
        }

        let top = p.y;
        let w = CONTENT_RIGHT - TOTAL_BOX_X;
        p.rect(
            TOTAL_BOX_X,
            top,
            w,
            TOTAL_BOX_H,
            Some(rgb(235, 235, 235)),
            Some((rgb(0, 0, 0), 0.3)),
        );

        let baseline = top - TOTAL_BOX_H / 2.0 - 12.0 * PT_TO_MM * 0.35;
        p.text("TOTAL GERAL", 12.0, TOTAL_BOX_X + 2.0, baseline, Weight::Bold, rgb(0, 0, 0));
        let value_left = TOTAL_BOX_X + TOTAL_LABEL_W;
        p.text_right(
            &format_currency(self.quote.total),
            12.0,
            value_left + (w - TOTAL_LABEL_W) - 2.0,
            baseline,
            Weight::Bold,
            rgb(0, 0, 0),
        );

        p.y = top - TOTAL_BOX_H;
    }

    /// Terms block, last page only.
    fn draw_terms(&self, p: &Painter) {
        let text = self.settings.footer_text.trim();
        if text.is_empty() {
            return;
        }

        p.rule(FOOTER_TEXT_TOP_Y + 2.0, rgb(200, 200, 200), 0.2);
        let mut y = FOOTER_TEXT_TOP_Y - 3.5;
        for line in wrap_text_by_width_mm(&p.fonts.regular, text, 9.0, CONTENT_W) {
            if y < FOOTER_TEXT_MIN_Y {
                break;
            }
            p.text_center(&line, 9.0, MARGIN_X, CONTENT_W, y, Weight::Regular, rgb(60, 60, 60));
            y -= 4.5;
        }
    }

    /// Lines stamped at the bottom of page `page_no` (1-based) of `page_count`.
    fn footer_texts(&self, page_no: usize, page_count: usize) -> Vec<FooterText> {
        let mut out = Vec::with_capacity(2);
        let labels = self.settings.payment_labels();
        if !labels.is_empty() {
            out.push(FooterText {
                text: format!("Formas de pagamento: {}", labels.join(", ")),
                size: 9.0,
                y: PAYMENT_LINE_Y,
                gray: 60,
            });
        }
        out.push(FooterText {
            text: format!("Página {page_no}/{page_count}"),
            size: 8.0,
            y: PAGE_STAMP_Y,
            gray: 150,
        });
        out
    }

    /// Runs after layout, once the page count is known.
    fn stamp_footers(&self, p: &Painter) {
        let total = p.pages.len();
        for (idx, layer) in p.pages.iter().enumerate() {
            for line in self.footer_texts(idx + 1, total) {
                let w = p.fonts.regular.width_mm(&line.text, line.size);
                layer.set_fill_color(rgb(line.gray, line.gray, line.gray));
                layer.use_text(
                    line.text.as_str(),
                    line.size,
                    Mm(MARGIN_X + ((CONTENT_W - w) / 2.0).max(0.0)),
                    Mm(line.y),
                    &p.regular,
                );
            }
        }
    }
}

/// Lays out the quote on the fixed template and returns the PDF bytes.
pub fn render_quote_pdf(
    quote: &Quote,
    settings: &Settings,
    logo: Option<&DynamicImage>,
) -> Result<RenderedPdf, AppError> {
    let title = format!("Orçamento {}", quote.number_label());
    let mut painter = Painter::new(&title, Fonts::load()?)?;
    let tpl = Template {
        quote,
        settings,
        logo,
    };

    tpl.draw_page_header(&mut painter);
    painter.y -= 3.0;
    tpl.draw_table_header(&mut painter);
    for (idx, item) in quote.items.iter().enumerate() {
        tpl.draw_row(&mut painter, idx, item);
    }
    tpl.draw_total_box(&mut painter);
    tpl.draw_terms(&painter);
    tpl.stamp_footers(&painter);

    painter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteStatus;
    use printpdf::image_crate::{Rgb as PixelRgb, RgbImage};

    fn item(description: String, note: Option<&str>) -> QuoteItem {
        QuoteItem {
            description,
            quantity: 2.0,
            unit_price: 150.0,
            line_total: 300.0,
            note: note.map(str::to_string),
        }
    }

    fn quote_with_items(n: usize) -> Quote {
        let items = (0..n)
            .map(|i| {
                item(
                    format!("Serviço de manutenção preventiva número {i} com troca de peças"),
                    (i % 3 == 0).then_some("inclui mão de obra"),
                )
            })
            .collect::<Vec<_>>();
        Quote {
            id: 7,
            client: "João da Silva".to_string(),
            email: Some("joao@example.com".to_string()),
            phone: Some("(11) 98888-7777".to_string()),
            address: Some("Av. Paulista, 1000 - São Paulo".to_string()),
            total: 300.0 * n as f64,
            items,
            date: "10/03/2025".to_string(),
            status: QuoteStatus::Pending,
        }
    }

    fn settings() -> Settings {
        Settings {
            company_name: "Oficina Central".to_string(),
            legal_name: "Oficina Central Ltda".to_string(),
            tax_id: "12.345.678/0001-90".to_string(),
            phone: "(11) 3333-4444".to_string(),
            footer_text: "Orçamento válido por 15 dias.".to_string(),
            payment_pix: true,
            payment_debit: true,
            ..Settings::default()
        }
    }

    /// A painter positioned right under the first table header.
    fn painter_at_table(tpl: &Template<'_>) -> Painter {
        let mut p = Painter::new("teste", Fonts::load().unwrap()).unwrap();
        tpl.draw_page_header(&mut p);
        tpl.draw_table_header(&mut p);
        p
    }

    #[test]
    fn short_quote_fits_one_page() {
        let out = render_quote_pdf(&quote_with_items(3), &settings(), None).unwrap();
        assert_eq!(out.pages, 1);
        assert!(out.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_quote_paginates() {
        let out = render_quote_pdf(&quote_with_items(60), &settings(), None).unwrap();
        assert!(out.pages >= 3, "expected several pages, got {}", out.pages);
    }

    #[test]
    fn empty_quote_and_empty_settings_still_render() {
        let mut q = quote_with_items(0);
        q.email = None;
        q.phone = None;
        q.address = None;
        let out = render_quote_pdf(&q, &Settings::default(), None).unwrap();
        assert_eq!(out.pages, 1);
    }

    #[test]
    fn logo_is_embedded_when_present() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, PixelRgb([200, 10, 10])));
        let with_logo = render_quote_pdf(&quote_with_items(2), &settings(), Some(&img)).unwrap();
        let without = render_quote_pdf(&quote_with_items(2), &settings(), None).unwrap();
        assert!(with_logo.bytes.len() > without.bytes.len());
    }

    #[test]
    fn load_logo_ignores_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_logo("").is_none());
        assert!(load_logo(dir.path().join("nope.png").to_str().unwrap()).is_none());

        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"not an image").unwrap();
        assert!(load_logo(corrupt.to_str().unwrap()).is_none());
    }

    #[test]
    fn description_lines_append_note() {
        let fonts = Fonts::load().unwrap();
        let it = item("Troca de óleo".to_string(), Some("sintético"));
        let lines = Template::description_lines(&fonts.regular, &it);
        assert_eq!(lines, vec!["Troca de óleo".to_string(), "(Obs: sintético)".to_string()]);
    }

    #[test]
    fn row_taller_than_a_page_flows_over_pages() {
        let q = quote_with_items(0);
        let s = settings();
        let tpl = Template { quote: &q, settings: &s, logo: None };
        let mut p = painter_at_table(&tpl);
        let first_body_top = p.y;

        let text = (1..=60).map(|i| format!("linha {i}")).collect::<Vec<_>>().join("\n");
        let tall = item(text, None);
        tpl.draw_row(&mut p, 0, &tall);

        // The first page took as many lines as fit instead of being skipped.
        let first_page_lines = lines_fitting_below(first_body_top);
        assert!(first_page_lines > 0 && first_page_lines < 60);
        let pages_needed = 1 + (60 - first_page_lines).div_ceil(lines_fitting_below(p.body_top.unwrap()));
        assert_eq!(p.pages.len(), pages_needed);
        assert!(p.y >= ROWS_BOTTOM_LIMIT, "row ended at {} mm, below the footer area", p.y);
    }

    #[test]
    fn row_that_does_not_fit_moves_whole_to_next_page() {
        let q = quote_with_items(0);
        let s = settings();
        let tpl = Template { quote: &q, settings: &s, logo: None };
        let mut p = painter_at_table(&tpl);
        p.y = ROWS_BOTTOM_LIMIT + 10.0;

        let three_lines = item("um\ndois\ntrês".to_string(), None);
        tpl.draw_row(&mut p, 0, &three_lines);

        assert_eq!(p.pages.len(), 2);
        let top = p.body_top.unwrap();
        assert!((top - p.y - row_height(3)).abs() < 1e-3);
    }

    #[test]
    fn total_box_breaks_to_a_new_page_near_the_bottom() {
        let q = quote_with_items(1);
        let s = settings();
        let tpl = Template { quote: &q, settings: &s, logo: None };

        let mut p = painter_at_table(&tpl);
        p.y = TOTAL_BREAK_Y + TOTAL_GAP - 0.5;
        tpl.draw_total_box(&mut p);
        assert_eq!(p.pages.len(), 2);
        assert!(p.y > TOTAL_BREAK_Y, "box on the new page sits under the header");

        let mut p = painter_at_table(&tpl);
        p.y = TOTAL_BREAK_Y + TOTAL_GAP + 0.5;
        tpl.draw_total_box(&mut p);
        assert_eq!(p.pages.len(), 1);
        assert!(p.y > FOOTER_TEXT_TOP_Y + 2.0, "box overlaps the terms block");
    }

    #[test]
    fn every_page_is_stamped_and_payments_follow_flags() {
        let q = quote_with_items(1);
        let with_payments = settings();
        let tpl = Template { quote: &q, settings: &with_payments, logo: None };
        for page in 1..=3 {
            let texts = tpl.footer_texts(page, 3);
            assert_eq!(texts.len(), 2);
            assert_eq!(texts[0].text, "Formas de pagamento: PIX, Cartão de Débito");
            assert_eq!(texts[1].text, format!("Página {page}/3"));
        }

        let no_payments = Settings {
            payment_pix: false,
            payment_debit: false,
            ..settings()
        };
        let tpl = Template { quote: &q, settings: &no_payments, logo: None };
        let texts = tpl.footer_texts(1, 1);
        assert_eq!(texts, vec![FooterText {
            text: "Página 1/1".to_string(),
            size: 8.0,
            y: PAGE_STAMP_Y,
            gray: 150,
        }]);
    }
}
