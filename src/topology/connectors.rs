//! Cross-sheet reference detection (`SEE DWG`, `FROM DWG`, `TO DWG`).

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use super::types::ConnectorKind;

static CONNECTOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SEE|FROM|TO)\s+DWG\.?\s+([A-Z0-9-]+)").expect("valid connector pattern")
});

/// A connector phrase located in a line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorMatch<'t> {
    /// Phrase kind.
    pub kind: ConnectorKind,
    /// Referenced drawing token.
    pub reference: &'t str,
    /// Byte range of the whole phrase, reference included.
    pub span: Range<usize>,
}

/// First connector phrase in `text`.
pub fn detect_connector(text: &str) -> Option<ConnectorMatch<'_>> {
    let captures = CONNECTOR_PATTERN.captures(text)?;
    let kind = match captures.get(1)?.as_str().to_ascii_uppercase().as_str() {
        "SEE" => ConnectorKind::SeeDwg,
        "FROM" => ConnectorKind::FromDwg,
        "TO" => ConnectorKind::ToDwg,
        _ => return None,
    };
    Some(ConnectorMatch {
        kind,
        reference: captures.get(2)?.as_str(),
        span: captures.get(0)?.range(),
    })
}
