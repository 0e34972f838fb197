//! Core data types for the version watcher.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The release channel a version was published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    /// A stable release such as `1.16.4`.
    Release,
    /// A weekly snapshot such as `20w46a`.
    Snapshot,
}

impl VersionKind {
    /// Returns the article slug used for this kind of version on the
    /// changelog site.
    pub fn article_slug(self) -> &'static str {
        match self {
            VersionKind::Release => "java-edition",
            VersionKind::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionKind::Release => f.write_str("release"),
            VersionKind::Snapshot => f.write_str("snapshot"),
        }
    }
}

impl std::str::FromStr for VersionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "release" => Ok(VersionKind::Release),
            "snapshot" => Ok(VersionKind::Snapshot),
            other => Err(format!("unknown version kind '{other}' (expected release or snapshot)")),
        }
    }
}

/// Identifying record for a published version.
///
/// Two descriptors refer to the same version when their `id` matches; the
/// other fields are informational. The serialized form is also the on-disk
/// format of the version file, and accepts the `time` / `changelogURL` keys
/// written by older deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    /// Release channel.
    #[serde(rename = "type")]
    pub kind: VersionKind,
    /// Version identifier, e.g. `1.16.4` or `20w46a`.
    pub id: String,
    /// When the version was published.
    #[serde(rename = "releaseTime", alias = "time")]
    pub release_time: DateTime<Utc>,
    /// Where the changelog article for this version is expected to live.
    #[serde(rename = "changelogUrl", alias = "changelogURL")]
    pub changelog_url: String,
}

impl VersionDescriptor {
    /// Returns true when `other` describes the same version.
    pub fn same_version(&self, other: &VersionDescriptor) -> bool {
        self.id == other.id
    }
}

/// One entry inside a [`Feature`]: either a bullet line or a nested section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    /// A single sanitized bullet item.
    Item(String),
    /// A nested, named section.
    Feature(Feature),
}

impl From<&str> for Entry {
    fn from(value: &str) -> Self {
        Entry::Item(value.to_string())
    }
}

impl From<String> for Entry {
    fn from(value: String) -> Self {
        Entry::Item(value)
    }
}

impl From<Feature> for Entry {
    fn from(value: Feature) -> Self {
        Entry::Feature(value)
    }
}

/// A named changelog section and its entries, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Sanitized section title.
    pub name: String,
    /// Bullet items and/or nested sections.
    pub content: Vec<Entry>,
}

impl Feature {
    /// Creates a feature from a name and any mix of entries.
    ///
    /// ## Examples
    ///
    /// ```
    /// use mcnotify_lib::{Entry, Feature};
    ///
    /// let feature = Feature::new(
    ///     "Fixed bugs in 20w46a",
    ///     vec![Entry::from("MC-2490 - TNT animation ends at 80 ticks")],
    /// );
    /// assert_eq!(feature.content.len(), 1);
    /// ```
    pub fn new(name: impl Into<String>, content: Vec<Entry>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Creates a feature whose content is only bullet items.
    pub fn with_items<I, S>(name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            items.into_iter().map(|item| Entry::Item(item.into())).collect(),
        )
    }
}

/// Ordered list of top-level changelog sections.
pub type Changelog = Vec<Feature>;
