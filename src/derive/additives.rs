use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref E_NUMBER: Regex = Regex::new(r"^[eE](\d+)([a-zA-Z]*)$").unwrap();
}

/// Strips a taxonomy prefix such as `en:` (everything up to the last colon).
pub fn additive_code(tag: &str) -> &str {
    match tag.rfind(':') {
        Some(i) => &tag[i + 1..],
        None => tag,
    }
}

/// `en:e500ii` → `E500ii`, `en:colour-caramel` → `Colour Caramel`.
pub fn normalize_additive(tag: &str) -> String {
    let code = additive_code(tag).trim();
    if code.is_empty() {
        return String::new();
    }

    if let Some(caps) = E_NUMBER.captures(code) {
        return format!("E{}{}", &caps[1], caps[2].to_lowercase());
    }

    code.split('-')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
