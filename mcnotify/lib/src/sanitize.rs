//! Text normalisation for scraped changelog content.
//!
//! Everything extracted from the changelog page ends up inside a Telegram
//! message sent with the HTML parse mode, so markup characters must be
//! escaped before the formatter adds its own tags.

use std::borrow::Cow;

/// Normalises a scraped text fragment.
///
/// - `&`, `<` and `>` are escaped as HTML entities
/// - typographic quotes are replaced by their ASCII counterparts
/// - runs of whitespace (including newlines) collapse to a single space
/// - leading and trailing whitespace is removed
///
/// ## Examples
///
/// ```
/// use mcnotify_lib::sanitize;
///
/// assert_eq!(sanitize("  Don\u{2019}t  <panic>\n now "), "Don't &lt;panic&gt; now");
/// ```
pub fn sanitize(text: &str) -> String {
    let escaped: Cow<'_, str> = html_escape::encode_text(text);

    let normalized: String = escaped
        .chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            other => other,
        })
        .collect();

    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}
