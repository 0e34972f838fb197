//! Changelog extraction from the published article HTML.
//!
//! Articles are flat: every section header, sub-header and bullet list is a
//! sibling inside an `.article-paragraph` container. A top-level `h1` owns
//! the `h2`/`h3` run that follows it; each header owns the first `ul` after
//! it, up to the next header.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use crate::fetch::{Document, HttpFetcher};
use crate::sanitize::sanitize;
use crate::types::{Changelog, Entry, Feature, VersionDescriptor};

/// Something that can produce the changelog for a version.
///
/// An empty [`Changelog`] means "not published yet"; implementations never
/// fail, they log and return nothing instead.
pub trait ChangelogSource {
    /// Returns the changelog for `version`, or an empty one when unavailable.
    fn fetch_changelog(
        &self,
        version: &VersionDescriptor,
    ) -> impl std::future::Future<Output = Changelog> + Send;
}

/// Parses a changelog article into its feature sections.
///
/// ## Examples
///
/// ```
/// use mcnotify_lib::{extract_changelog, Feature};
///
/// let html = r#"<div class="article-paragraph">
///     <h1>Fixed bugs in 20w46a</h1>
///     <ul><li>MC-2490 - TNT animation ends at 80 ticks</li></ul>
/// </div>"#;
///
/// assert_eq!(
///     extract_changelog(html),
///     vec![Feature::with_items(
///         "Fixed bugs in 20w46a",
///         ["MC-2490 - TNT animation ends at 80 ticks"],
///     )]
/// );
/// ```
pub fn extract_changelog(html: &str) -> Changelog {
    let document = Html::parse_document(html);
    let headers = Selector::parse(".article-paragraph h1").expect("h1 selector is valid");

    let mut changelog = Changelog::new();

    for header in document.select(&headers) {
        let name = text_of(header);
        if name.is_empty() {
            continue;
        }

        let header_run: Vec<ElementRef<'_>> = siblings_until(header, &["h1"])
            .filter(|el| matches!(el.value().name(), "h2" | "h3"))
            .collect();

        let content = if header_run.is_empty() {
            first_list(header).map(list_items).unwrap_or_default()
        } else {
            header_run
                .into_iter()
                .filter_map(|sub_header| {
                    let sub_name = text_of(sub_header);
                    if sub_name.is_empty() {
                        return None;
                    }
                    let list = first_list(sub_header)?;
                    Some(Entry::Feature(Feature::new(sub_name, list_items(list))))
                })
                .collect()
        };

        changelog.push(Feature::new(name, content));
    }

    changelog
}

/// Following element siblings of `start`, stopping before any element whose
/// tag is in `stop`.
fn siblings_until<'a>(
    start: ElementRef<'a>,
    stop: &'a [&'a str],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    start
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(move |el| !stop.contains(&el.value().name()))
}

/// The first `ul` after a header, before the next header of any level.
fn first_list(header: ElementRef<'_>) -> Option<ElementRef<'_>> {
    siblings_until(header, &["h1", "h2", "h3"]).find(|el| el.value().name() == "ul")
}

/// Sanitized, non-empty `li` children of a list.
fn list_items(list: ElementRef<'_>) -> Vec<Entry> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
        .map(text_of)
        .filter(|text| !text.is_empty())
        .map(Entry::Item)
        .collect()
}

fn text_of(element: ElementRef<'_>) -> String {
    sanitize(&element.text().collect::<String>())
}

/// [`ChangelogSource`] that scrapes the article at the version's changelog URL.
#[derive(Debug, Clone)]
pub struct ArticleChangelog {
    fetcher: HttpFetcher,
}

impl ArticleChangelog {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetches and extracts the article at `url`.
    ///
    /// Fetch failures and non-HTML bodies yield an empty changelog.
    #[instrument(skip(self))]
    pub async fn fetch_from(&self, url: &str) -> Changelog {
        match self.fetcher.get(url).await {
            Ok(Document::Html(html)) => {
                let changelog = extract_changelog(&html);
                debug!(sections = changelog.len(), "Extracted changelog");
                changelog
            }
            Ok(Document::Json(_)) => {
                warn!("Changelog at {} is not an HTML document", url);
                Changelog::new()
            }
            Err(e) => {
                warn!(error = %e, "Changelog not available");
                Changelog::new()
            }
        }
    }
}

impl ChangelogSource for ArticleChangelog {
    async fn fetch_changelog(&self, version: &VersionDescriptor) -> Changelog {
        self.fetch_from(&version.changelog_url).await
    }
}
