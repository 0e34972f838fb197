//! Decorative emoji prefixes for changelog section titles.

/// Keyword table, checked in order. The first entry with a keyword contained
/// in the lowercased title wins.
const KEYWORD_EMOJI: &[(&str, &[&str])] = &[
    ("\u{2744}\u{fe0f}", &["snow"]),
    ("\u{26f0}\u{fe0f}", &["cliff", "mountain"]),
    ("\u{1f410}", &["goat"]),
    ("\u{1f52e}", &["crystal", "amethyst", "geode"]),
    ("\u{1f52d}", &["telescope", "spyglass", "lens"]),
    ("\u{1f56f}\u{fe0f}", &["candle"]),
    ("\u{1f4b0}", &["bundle"]),
    ("\u{1f991}", &["squid"]),
    ("\u{1f465}", &["ui", "ux"]),
    ("\u{26a1}", &["lightning"]),
    ("\u{1f32b}\u{fe0f}", &["textures"]),
    ("\u{1f41b}", &["bug"]),
    ("\u{2699}\u{fe0f}", &["technical"]),
    ("\u{1f503}", &["change", "revert"]),
];

/// Returns the emoji matching a section title, if any keyword applies.
///
/// Matching is a case-insensitive substring test, so `"Fixed bugs"` picks up
/// the bug emoji through `"bug"`.
///
/// ## Examples
///
/// ```
/// use mcnotify_lib::emoji_for;
///
/// assert_eq!(emoji_for("Powder Snow"), Some("\u{2744}\u{fe0f}"));
/// assert_eq!(emoji_for("Villagers"), None);
/// ```
pub fn emoji_for(title: &str) -> Option<&'static str> {
    let lowered = title.to_lowercase();
    KEYWORD_EMOJI
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(emoji, _)| *emoji)
}

/// Prefixes `rendered` with the emoji chosen for `title`.
///
/// `title` is the plain section name used for matching, while `rendered` is
/// what ends up in the message (usually the name wrapped in markup).
pub fn annotate(title: &str, rendered: &str) -> String {
    match emoji_for(title) {
        Some(emoji) => format!("{emoji} {rendered}"),
        None => rendered.to_string(),
    }
}
