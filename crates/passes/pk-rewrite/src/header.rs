//! Header boilerplate stripping

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Opening tag, one leading doc comment and a strict-types pragma, in that order
#[allow(clippy::unwrap_used, reason = "constant pattern")]
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A(<\?php)?\s*(/\*\*?.*?\*/)?\s*(declare\s*\(\s*strict_types\s*=\s*1\s*\);)?").unwrap()
});

/// Removes per-module header boilerplate from the start of a printed body
pub fn strip_header(text: &str) -> Cow<'_, str> {
    HEADER.replace(text, "")
}
