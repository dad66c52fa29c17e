//! Human-friendly language aliases resolved before anything reaches a provider.

use tracing::trace;

/// Canonical tag for simplified Chinese, the default destination.
pub const SIMPLIFIED_CHINESE: &str = "zh-CN";

/// Canonical tag for traditional Chinese.
pub const TRADITIONAL_CHINESE: &str = "zh-TW";

const ALIASES: &[(&str, &str)] = &[
    ("zh", SIMPLIFIED_CHINESE),
    ("cn", SIMPLIFIED_CHINESE),
    ("chinese", SIMPLIFIED_CHINESE),
    ("simplified", SIMPLIFIED_CHINESE),
    ("traditional", TRADITIONAL_CHINESE),
];

/// Map an alias such as `chinese` to its canonical tag.
/// Matching ignores case; unknown tags are returned unchanged.
pub fn resolve_language(tag: &str) -> String {
    let key = tag.trim().to_lowercase();
    let resolved = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| tag.trim().to_string());
    trace!("resolve_language {tag} -> {resolved}");
    resolved
}
