//! Cell cleaners shared by every import

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

/// Leading parenthesised degree tag such as "(S2) "
static DEGREE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([^)]+\)\s*").expect("degree prefix pattern compiles"));

pub const MIN_TAHUN_LULUS: i64 = 2000;
pub const MAX_TAHUN_LULUS: i64 = 2030;

fn strip_quotes(value: &str) -> String {
    value.trim().replace(['"', '\''], "")
}

/// Free text with quotes and unusual punctuation removed
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let stripped = strip_quotes(value?);
    let cleaned: String = stripped
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || "_-.,()/".contains(*c))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Student number: word characters only, at least five of them
pub fn clean_nim(value: Option<&str>) -> Option<String> {
    let nim: String = strip_quotes(value?)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    (nim.chars().count() >= 5).then_some(nim)
}

/// Lowercased address when it looks like an email
pub fn validate_email(value: Option<&str>) -> Option<String> {
    let email = strip_quotes(value?).to_lowercase();
    EMAIL_PATTERN.is_match(&email).then_some(email)
}

/// Graduation year within the accepted range; tolerates "2021.0"
pub fn validate_tahun(value: Option<&str>) -> Option<i64> {
    let raw = strip_quotes(value?);
    let year = raw
        .parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))?;

    (MIN_TAHUN_LULUS..=MAX_TAHUN_LULUS).contains(&year).then_some(year)
}

/// Collapse whitespace and drop a leading "(S2)"-style tag, for matching
/// prodi names
pub fn normalize_name(value: &str) -> Option<String> {
    let without_prefix = DEGREE_PREFIX.replace(value.trim(), "");
    let collapsed = without_prefix.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// 8 to 12 ASCII digits, the usual NIM shape
pub fn looks_like_nim(value: &str) -> bool {
    let value = strip_quotes(value);
    (8..=12).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

/// Short text that is not a number
pub fn looks_like_name(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let len = value.chars().count();
    !compact.is_empty() && !compact.chars().all(|c| c.is_ascii_digit()) && len > 3 && len < 50
}
