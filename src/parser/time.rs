use std::sync::LazyLock;

use regex::Regex;

static NON_TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d:\-]").unwrap());

/// Repair a raw time cell into `HH:MM-HH:MM`.
///
/// Returns an empty string when nothing usable is left; callers treat that as
/// "no class in this row".
pub fn normalize_time(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut t = raw.replace("::", ":");

    if t.matches('-').count() == 1 {
        if let Some((start, end)) = t.split_once('-') {
            t = format!("{}-{}", insert_colon(start.trim()), insert_colon(end.trim()));
        }
    }

    NON_TIME_RE.replace_all(&t, "").into_owned()
}

/// "1900" -> "19:00"; anything else is returned unchanged.
fn insert_colon(half: &str) -> String {
    if half.len() == 4 && half.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}:{}", &half[..2], &half[2..])
    } else {
        half.to_string()
    }
}
