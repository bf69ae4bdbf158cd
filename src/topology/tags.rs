//! Equipment and line tag detection.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Uppercase letters/digits, a hyphen, then uppercase letters/digits/hyphens, as a whole word.
/// An optional inch-size prefix such as `10"-` is kept as part of line designations.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\b\d+(?:\.\d+)?"-)?\b[A-Z0-9]+-[A-Z0-9-]+\b"#).expect("valid tag pattern")
});

/// Return the first tag-like identifier in `text`, if any.
///
/// Only the first match counts; a line naming several identifiers yields a single tag.
pub fn detect_tag(text: &str) -> Option<&str> {
    TAG_PATTERN.find(text).map(|found| found.as_str())
}

/// Like [`detect_tag`], but ignores matches overlapping `excluded`.
///
/// Used to keep the drawing number of a cross-sheet reference from being read as a tag. This
/// narrows "first match anywhere in the line" on purpose: `SEE DWG. P-002` yields a connector and
/// no tag, while `V-7 TO DWG P-100` still yields tag `V-7`.
pub fn detect_tag_outside<'t>(text: &'t str, excluded: &Range<usize>) -> Option<&'t str> {
    TAG_PATTERN
        .find_iter(text)
        .find(|found| found.end() <= excluded.start || found.start() >= excluded.end)
        .map(|found| found.as_str())
}
