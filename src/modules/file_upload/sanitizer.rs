/// Longest display name kept, in characters.
pub const MAX_NAME_LEN: usize = 255;
/// Extensions longer than this are not worth preserving on truncation.
const MAX_EXTENSION_LEN: usize = 16;
pub const PLACEHOLDER_NAME: &str = "unnamed";

/// Derives a display-safe filename from untrusted input.
///
/// Only the last path segment survives, control characters and `:` are
/// dropped, and surrounding dots/whitespace are trimmed, so the result never
/// contains a separator or a `..` segment. Never fails: input that strips to
/// nothing becomes [`PLACEHOLDER_NAME`].
pub fn sanitize(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base.chars().filter(|c| !c.is_control() && *c != ':').collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());

    if cleaned.is_empty() {
        return PLACEHOLDER_NAME.to_string();
    }

    truncate_keeping_extension(cleaned)
}

fn truncate_keeping_extension(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_LEN {
        return name.to_string();
    }

    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().count() <= MAX_EXTENSION_LEN => {
            Some(ext)
        }
        _ => None,
    };

    match extension {
        Some(ext) => {
            let keep = MAX_NAME_LEN - ext.chars().count() - 1;
            let stem: String = name.chars().take(keep).collect();
            format!("{}.{}", stem.trim_end_matches('.'), ext)
        }
        None => name.chars().take(MAX_NAME_LEN).collect(),
    }
}
