use crate::error::AppError;

// PDF font sizes are in points; layout coordinates are in millimeters.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

// Embedded so accented Portuguese text renders and measures the same everywhere.
static REGULAR_TTF: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static BOLD_TTF: &[u8] = include_bytes!("../../assets/DejaVuSans-Bold.ttf");

/// Brazilian style: thousands '.', decimals ',' (e.g., 1.234,56).
pub fn format_money_br(v: f64) -> String {
    let cents = (v.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut out = String::with_capacity(digits.len() * 4 / 3 + 4);
    if v < 0.0 && cents > 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    format!("{},{:02}", out, cents % 100)
}

pub fn format_currency(v: f64) -> String {
    format!("R$ {}", format_money_br(v))
}

/// Whole quantities print without decimals; fractional ones with a comma.
pub fn format_qty(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.3}", v);
        let s = s.trim_end_matches('0').trim_end_matches('.');
        s.replace('.', ",")
    }
}

/// An embedded TrueType face: the bytes handed to the PDF and the parsed
/// tables used to measure the very same glyphs.
pub struct Typeface {
    bytes: &'static [u8],
    face: ttf_parser::Face<'static>,
}

impl Typeface {
    fn parse(name: &str, bytes: &'static [u8]) -> Result<Self, AppError> {
        let face = ttf_parser::Face::parse(bytes, 0)
            .map_err(|e| AppError::Pdf(format!("failed to parse embedded font {name}: {e}")))?;
        Ok(Self { bytes, face })
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.bytes
    }

    fn units_per_em(&self) -> f32 {
        self.face.units_per_em() as f32
    }

    /// Advance width of `text` at `font_size_pt`, in mm. Characters the face
    /// lacks render as `.notdef` and are measured as such.
    pub fn width_mm(&self, text: &str, font_size_pt: f32) -> f32 {
        let upem = self.units_per_em();
        if upem <= 0.0 {
            return 0.0;
        }

        let notdef = ttf_parser::GlyphId(0);
        let units: u32 = text
            .chars()
            .map(|ch| {
                let gid = self.face.glyph_index(ch).unwrap_or(notdef);
                self.face.glyph_hor_advance(gid).unwrap_or(0) as u32
            })
            .sum();

        (units as f32 / upem) * font_size_pt * PT_TO_MM
    }

    pub fn ascent_mm(&self, font_size_pt: f32) -> f32 {
        let upem = self.units_per_em();
        if upem <= 0.0 {
            return font_size_pt * PT_TO_MM * 0.8;
        }
        (self.face.ascender() as f32 / upem) * font_size_pt * PT_TO_MM
    }
}

pub struct Fonts {
    pub regular: Typeface,
    pub bold: Typeface,
}

impl Fonts {
    pub fn load() -> Result<Self, AppError> {
        Ok(Self {
            regular: Typeface::parse("DejaVuSans", REGULAR_TTF)?,
            bold: Typeface::parse("DejaVuSans-Bold", BOLD_TTF)?,
        })
    }
}

fn split_long_word(
    face: &Typeface,
    word: &str,
    font_size: f32,
    max_width_mm: f32,
    out: &mut Vec<String>,
) -> String {
    let mut chunk = String::new();
    for ch in word.chars() {
        chunk.push(ch);
        if face.width_mm(&chunk, font_size) > max_width_mm && chunk.chars().count() > 1 {
            chunk.pop();
            out.push(std::mem::replace(&mut chunk, ch.to_string()));
        }
    }
    chunk
}

/// Greedy word wrap by measured width. Explicit newlines start a new line;
/// a single word wider than the column is split by characters.
pub fn wrap_text_by_width_mm(face: &Typeface, input: &str, font_size: f32, max_width_mm: f32) -> Vec<String> {
    let fits = |s: &str| face.width_mm(s, font_size) <= max_width_mm;
    let mut out: Vec<String> = Vec::new();

    for raw in input.lines() {
        let mut current = String::new();
        for word in raw.split_whitespace() {
            if !current.is_empty() {
                let candidate = format!("{} {}", current, word);
                if fits(&candidate) {
                    current = candidate;
                    continue;
                }
                out.push(std::mem::take(&mut current));
            }

            current = if fits(word) {
                word.to_string()
            } else {
                split_long_word(face, word, font_size, max_width_mm, &mut out)
            };
        }

        if !current.is_empty() {
            out.push(current);
        }
    }

    out
}
