//! Value normalizers applied by `NormalizeBrand[...]` and `CleanVersion[...]`.

/// Canonical capitalisation for brand names.
///
/// Values of three characters or fewer are treated as acronyms and upper
/// cased. Longer values have the first letter of every alphanumeric word
/// upper cased and the rest lower cased; separators are kept as they are.
///
/// ```
/// use agentwalk::normalize_brand;
///
/// assert_eq!(normalize_brand("htc"), "HTC");
/// assert_eq!(normalize_brand("SAMSUNG"), "Samsung");
/// assert_eq!(normalize_brand("sony-ericsson"), "Sony-Ericsson");
/// ```
#[must_use]
pub fn normalize_brand(value: &str) -> String {
    let value = value.trim();
    if value.chars().count() <= 3 {
        return value.to_uppercase();
    }

    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Canonical form of a version string: trimmed, `_` read as `.`, no empty
/// dot-separated components.
///
/// ```
/// use agentwalk::clean_version;
///
/// assert_eq!(clean_version(" 10_15_7 "), "10.15.7");
/// assert_eq!(clean_version("5..0."), "5.0");
/// ```
#[must_use]
pub fn clean_version(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        let c = if c == '_' { '.' } else { c };
        if c == '.' && (out.is_empty() || out.ends_with('.')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('.') {
        out.pop();
    }
    out
}
