//! Stateless helper utilities used by the projection engine and the writer.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::SheetMapError;

////////////////////////////////////////////////////////////////////////////////
// #region NameValidation

/// Return the first name that occurs more than once.
pub fn find_duplicate_name<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut set_seen = BTreeSet::new();
    names.into_iter().find(|c_name| !set_seen.insert(*c_name))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NumberPattern

/// Parsed number pattern (`0`/`#` placeholders, `.`, `,`, `%`, literal affixes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecNumberPattern {
    /// Literal text before the digits.
    pub prefix: String,
    /// Literal text after the digits.
    pub suffix: String,
    /// Minimum integer digits (count of `0` before the decimal point).
    pub n_int_digits_min: usize,
    /// Minimum fraction digits (count of `0` after the decimal point).
    pub n_frac_digits_min: usize,
    /// Maximum fraction digits (all placeholders after the decimal point).
    pub n_frac_digits_max: usize,
    /// Thousands grouping.
    pub if_grouping: bool,
    /// Scale by 100.
    pub if_percent: bool,
    /// Equivalent Excel number format code.
    pub num_format: String,
}

enum EnumPatternToken {
    Literal(char),
    Core(char),
    Percent,
}

impl SpecNumberPattern {
    /// Parse a custom pattern (`0.0`, `#,##0.00`, `0%`, `"$"0.00`) or a standard
    /// shorthand (`F2`, `N0`). Returns `None` for anything else.
    pub fn parse(pattern: &str) -> Option<Self> {
        if let Some(c_core) = derive_standard_pattern_core(pattern) {
            return Self::parse_custom(&c_core);
        }
        Self::parse_custom(pattern)
    }

    fn parse_custom(pattern: &str) -> Option<Self> {
        let l_tokens = tokenize_number_pattern(pattern)?;

        let n_idx_core_first = l_tokens
            .iter()
            .position(|token| matches!(token, EnumPatternToken::Core(_)))?;
        let n_idx_core_last = l_tokens
            .iter()
            .rposition(|token| matches!(token, EnumPatternToken::Core(_)))?;

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut c_core = String::new();
        let mut if_percent = false;
        for (n_idx, token) in l_tokens.iter().enumerate() {
            let chr = match token {
                EnumPatternToken::Core(chr) => {
                    c_core.push(*chr);
                    continue;
                }
                EnumPatternToken::Literal(chr) => *chr,
                EnumPatternToken::Percent => {
                    if_percent = true;
                    '%'
                }
            };
            if n_idx < n_idx_core_first {
                prefix.push(chr);
            } else if n_idx > n_idx_core_last {
                suffix.push(chr);
            } else {
                return None;
            }
        }

        let (c_int, c_frac) = match c_core.split_once('.') {
            Some((c_int, c_frac)) => (c_int, c_frac),
            None => (c_core.as_str(), ""),
        };
        if c_frac.contains(['.', ',']) {
            return None;
        }
        if !c_int.contains(['0', '#']) && !c_frac.contains(['0', '#']) {
            return None;
        }

        Some(Self {
            prefix,
            suffix,
            n_int_digits_min: c_int.chars().filter(|chr| *chr == '0').count(),
            n_frac_digits_min: c_frac.chars().filter(|chr| *chr == '0').count(),
            n_frac_digits_max: c_frac.len(),
            if_grouping: c_int.contains(','),
            if_percent,
            num_format: pattern.to_string(),
        })
    }

    /// Render `value`; returns the value rounded to the pattern's precision and its text.
    pub fn render(&self, value: f64) -> (f64, String) {
        let n_scaled = if self.if_percent { value * 100.0 } else { value };
        let c_fixed = format_fixed_half_away(n_scaled.abs(), self.n_frac_digits_max);
        let (c_int_raw, c_frac_raw) = c_fixed.split_once('.').unwrap_or((&c_fixed, ""));

        let mut c_frac = c_frac_raw.to_string();
        while c_frac.len() > self.n_frac_digits_min && c_frac.ends_with('0') {
            c_frac.pop();
        }

        let c_int_trimmed = c_int_raw.trim_start_matches('0');
        let n_pad = self.n_int_digits_min.saturating_sub(c_int_trimmed.len());
        let mut c_int = "0".repeat(n_pad);
        c_int.push_str(c_int_trimmed);
        if self.if_grouping {
            c_int = group_thousands(&c_int);
        }

        let if_zero = c_fixed.chars().all(|chr| chr == '0' || chr == '.');
        let c_sign = if n_scaled < 0.0 && !if_zero { "-" } else { "" };

        let mut c_text = format!("{c_sign}{}{c_int}", self.prefix);
        if !c_frac.is_empty() {
            c_text.push('.');
            c_text.push_str(&c_frac);
        }
        c_text.push_str(&self.suffix);

        let n_rounded = format!("{c_sign}{c_fixed}").parse::<f64>().unwrap_or(n_scaled);
        let n_value = if self.if_percent {
            n_rounded / 100.0
        } else {
            n_rounded
        };
        (n_value, c_text)
    }
}

fn derive_standard_pattern_core(pattern: &str) -> Option<String> {
    let mut chars = pattern.chars();
    let chr_kind = chars.next()?.to_ascii_uppercase();
    if chr_kind != 'F' && chr_kind != 'N' {
        return None;
    }
    let c_digits = chars.as_str();
    let n_decimals = if c_digits.is_empty() {
        2
    } else if c_digits.chars().all(|chr| chr.is_ascii_digit()) {
        c_digits.parse::<usize>().ok()?
    } else {
        return None;
    };

    let mut c_core = if chr_kind == 'N' {
        "#,##0".to_string()
    } else {
        "0".to_string()
    };
    if n_decimals > 0 {
        c_core.push('.');
        c_core.push_str(&"0".repeat(n_decimals));
    }
    Some(c_core)
}

fn tokenize_number_pattern(pattern: &str) -> Option<Vec<EnumPatternToken>> {
    let mut l_tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(chr) = chars.next() {
        match chr {
            '0' | '#' | '.' | ',' => l_tokens.push(EnumPatternToken::Core(chr)),
            '"' | '\'' => {
                let mut if_closed = false;
                for chr_quoted in chars.by_ref() {
                    if chr_quoted == chr {
                        if_closed = true;
                        break;
                    }
                    l_tokens.push(EnumPatternToken::Literal(chr_quoted));
                }
                if !if_closed {
                    return None;
                }
            }
            '\\' => l_tokens.push(EnumPatternToken::Literal(chars.next()?)),
            '%' => l_tokens.push(EnumPatternToken::Percent),
            ';' | 'E' | 'e' => return None,
            _ => l_tokens.push(EnumPatternToken::Literal(chr)),
        }
    }
    Some(l_tokens)
}

/// Fixed-point text of a non-negative `value` with midpoints rounded away from zero.
///
/// Rounds the shortest round-trip decimal form, so `0.25` becomes `0.3` at one decimal.
fn format_fixed_half_away(value: f64, n_decimals: usize) -> String {
    if !value.is_finite() {
        return format!("{value:.n_decimals$}");
    }

    let c_repr = format!("{value}");
    let (c_int, c_frac) = c_repr.split_once('.').unwrap_or((&c_repr, ""));
    let mut l_digits: Vec<u8> = c_int
        .bytes()
        .chain(c_frac.bytes().chain(std::iter::repeat(b'0')).take(n_decimals))
        .map(|chr| chr - b'0')
        .collect();

    if c_frac.as_bytes().get(n_decimals).is_some_and(|chr| *chr >= b'5') {
        let mut n_idx = l_digits.len();
        loop {
            if n_idx == 0 {
                l_digits.insert(0, 1);
                break;
            }
            n_idx -= 1;
            if l_digits[n_idx] == 9 {
                l_digits[n_idx] = 0;
            } else {
                l_digits[n_idx] += 1;
                break;
            }
        }
    }

    let n_len_int = l_digits.len() - n_decimals;
    let mut c_fixed = String::with_capacity(l_digits.len() + 1);
    for (n_idx, n_digit) in l_digits.iter().enumerate() {
        if n_idx == n_len_int {
            c_fixed.push('.');
        }
        c_fixed.push(char::from(b'0' + n_digit));
    }
    c_fixed
}

fn group_thousands(digits: &str) -> String {
    let n_len = digits.len();
    let mut c_grouped = String::with_capacity(n_len + n_len / 3);
    for (n_idx, chr) in digits.chars().enumerate() {
        if n_idx > 0 && (n_len - n_idx) % 3 == 0 {
            c_grouped.push(',');
        }
        c_grouped.push(chr);
    }
    c_grouped
}

/// Make table column headers unique, ignoring case, by appending `2`, `3`, ...
///
/// Empty headers become `Column{n}` with `n` the 1-based column position.
pub fn derive_unique_table_headers<'a>(
    headers: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut set_existing: BTreeSet<String> = BTreeSet::new();
    let mut l_unique = Vec::new();

    for (n_idx, c_header) in headers.into_iter().enumerate() {
        let c_base = if c_header.is_empty() {
            format!("Column{}", n_idx + 1)
        } else {
            c_header.to_string()
        };

        let mut c_candidate = c_base.clone();
        let mut n_suffix = 2usize;
        while !set_existing.insert(c_candidate.to_lowercase()) {
            c_candidate = format!("{c_base}{n_suffix}");
            n_suffix += 1;
        }
        l_unique.push(c_candidate);
    }
    l_unique
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DateFormatting

/// Format `value` with a chrono strftime `pattern`; `None` when the pattern is invalid.
pub fn format_date_time(value: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut c_text = String::new();
    write!(c_text, "{}", value.format(pattern)).ok()?;
    Some(c_text)
}

/// Whether `value` is the minimum date sentinel treated as absent.
pub fn is_date_time_sentinel(value: &NaiveDateTime) -> bool {
    *value == NaiveDateTime::MIN
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Return `name` or a `name__N` variant absent from `set_existing`, and register it.
///
/// Excel compares sheet names case-insensitively, so `set_existing` holds lowercase keys.
pub fn derive_unique_sheet_name(name: &str, set_existing: &mut BTreeSet<String>) -> String {
    if set_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
        .collect();

    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if set_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region IndexCasting

/// Convert a 1-based row index into the writer's 0-based row number.
pub fn cast_row_num(row: usize) -> Result<u32, SheetMapError> {
    row.checked_sub(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(SheetMapError::IndexOverflow {
            axis: "row",
            value: row,
        })
}

/// Convert a 1-based column index into the writer's 0-based column number.
pub fn cast_col_num(col: usize) -> Result<u16, SheetMapError> {
    col.checked_sub(1)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or(SheetMapError::IndexOverflow {
            axis: "column",
            value: col,
        })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
