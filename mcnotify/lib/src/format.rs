//! Rendering a [`Changelog`](crate::Changelog) into a size-bounded Telegram message.
//!
//! Messages are built line by line. Long sections are shortened by capping
//! how many entries each section shows; the hidden remainder is replaced by
//! a single [`MARKER`] line whenever that marker is the shorter option.
//! Lengths are counted in characters.

use crate::emoji::annotate;
use crate::types::{Entry, Feature};

/// Line standing in for entries hidden by the per-section cap.
pub const MARKER: &str = "... and more!";

/// Cap the shrinking loop starts from. It is decremented before the first
/// capped render, so the first capped attempt shows three entries.
pub const DEFAULT_START_CAP: usize = 4;

/// Top-level sections whose name starts with this are download blurbs and
/// are never rendered.
const SKIPPED_PREFIX: &str = "Get the";

/// Renders every visible section, showing at most `max` entries per section.
///
/// Each section starts with a blank line followed by its emoji-annotated
/// name in bold. Items render as `- item`; nested sections recurse with the
/// same cap. Lines are joined with `\n`.
///
/// Entries past `max` are replaced by a single [`MARKER`] line, except when
/// the hidden entries render shorter than the marker itself: then they are
/// kept as-is. Rendered length therefore never grows as `max` shrinks.
///
/// ## Examples
///
/// ```
/// use mcnotify_lib::{render_changelog, Feature};
///
/// let changelog = vec![Feature::with_items("Villagers", ["Trade more", "Sleep less"])];
/// assert_eq!(
///     render_changelog(&changelog, None),
///     "\n<b>Villagers</b>\n- Trade more\n- Sleep less"
/// );
/// ```
pub fn render_changelog(changelog: &[Feature], max: Option<usize>) -> String {
    let mut lines = Vec::new();
    for feature in changelog
        .iter()
        .filter(|feature| !feature.name.starts_with(SKIPPED_PREFIX))
    {
        render_feature(feature, max, &mut lines);
    }
    lines.join("\n")
}

fn render_feature(feature: &Feature, max: Option<usize>, lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push(annotate(&feature.name, &format!("<b>{}</b>", feature.name)));

    let shown = max.map_or(feature.content.len(), |max| max.min(feature.content.len()));
    let (visible, hidden) = feature.content.split_at(shown);

    for entry in visible {
        render_entry(entry, max, lines);
    }

    if hidden.is_empty() {
        return;
    }

    let mut tail = Vec::new();
    for entry in hidden {
        render_entry(entry, max, &mut tail);
    }

    // Never let the marker make a section longer than the entries it hides.
    if line_cost(&[MARKER][..]) <= line_cost(tail.as_slice()) {
        lines.push(MARKER.to_string());
    } else {
        lines.extend(tail);
    }
}

fn render_entry(entry: &Entry, max: Option<usize>, lines: &mut Vec<String>) {
    match entry {
        Entry::Item(text) => lines.push(format!("- {text}")),
        Entry::Feature(feature) => render_feature(feature, max, lines),
    }
}

/// Characters a run of lines adds to the joined message, counting one
/// separator per line.
fn line_cost<S: AsRef<str>>(lines: &[S]) -> usize {
    lines.iter().map(|line| char_len(line.as_ref()) + 1).sum()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Renders `changelog` so that the result is at most `limit` characters.
///
/// The uncapped rendering is tried first, then the per-section cap shrinks
/// from `DEFAULT_START_CAP - 1` down to zero. If even the zero-cap rendering
/// is too long, whole trailing lines are dropped until it fits.
pub fn format_changelog(changelog: &[Feature], limit: usize) -> String {
    let mut message = render_changelog(changelog, None);
    let mut cap = DEFAULT_START_CAP;

    while char_len(&message) > limit && cap > 0 {
        cap -= 1;
        message = render_changelog(changelog, Some(cap));
    }

    if char_len(&message) > limit {
        message = truncate_lines(&message, limit);
    }

    message
}

fn truncate_lines(message: &str, limit: usize) -> String {
    let mut lines: Vec<&str> = message.split('\n').collect();
    while !lines.is_empty() && line_cost(lines.as_slice()).saturating_sub(1) > limit {
        lines.pop();
    }
    lines.join("\n")
}

/// Builds the full notification: a globe link to the article followed by
/// the changelog body.
pub fn compose_message(changelog_url: &str, body: &str) -> String {
    format!("{}{}", message_header(changelog_url), body.trim())
}

/// Formats `changelog` and composes the message so the whole thing stays
/// within `limit` characters.
///
/// The link header is dropped when `limit` cannot hold it, leaving the whole
/// budget to the changelog body.
///
/// ## Examples
///
/// ```
/// use mcnotify_lib::{build_message, Feature};
///
/// let changelog = vec![Feature::with_items("Fixed bugs in 20w46a", ["MC-2490"])];
/// let message = build_message("https://example.com/a", &changelog, 4096);
/// assert!(message.starts_with("<a href=\"https://example.com/a\">"));
/// assert!(message.ends_with("- MC-2490"));
/// ```
pub fn build_message(changelog_url: &str, changelog: &[Feature], limit: usize) -> String {
    let header_len = char_len(&message_header(changelog_url));
    if header_len > limit {
        return format_changelog(changelog, limit).trim().to_string();
    }
    compose_message(changelog_url, &format_changelog(changelog, limit - header_len))
}

fn message_header(changelog_url: &str) -> String {
    format!("<a href=\"{changelog_url}\">\u{1f30d}</a>")
}
