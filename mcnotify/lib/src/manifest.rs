//! Version manifest polling.
//!
//! The launcher publishes a JSON manifest listing every version, newest
//! first. The poller only cares about the first entry and turns it into a
//! [`VersionDescriptor`]; comparing it with the last-seen version is the
//! caller's job.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::WatchError;
use crate::fetch::{Document, HttpFetcher};
use crate::types::{VersionDescriptor, VersionKind};

/// Something that can report the latest published version.
pub trait VersionSource {
    /// Returns the newest version currently published.
    ///
    /// ## Errors
    ///
    /// Returns `WatchError` when the manifest is unavailable or malformed.
    fn latest_version(
        &self,
    ) -> impl std::future::Future<Output = Result<VersionDescriptor, WatchError>> + Send;
}

/// Launcher manifest document.
#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<ManifestEntry>,
}

/// A single entry of the manifest's `versions` list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    id: String,
    #[serde(rename = "type")]
    kind: VersionKind,
    release_time: DateTime<Utc>,
}

/// Builds the changelog article URL for a version.
///
/// Releases live under the `java-edition` slug, snapshots under `snapshot`,
/// and dots in the id become dashes.
///
/// ## Examples
///
/// ```
/// use mcnotify_lib::{changelog_url, VersionKind};
///
/// let base = "https://www.minecraft.net/en-us/article/minecraft";
/// assert_eq!(
///     changelog_url(base, VersionKind::Release, "1.16.4"),
///     "https://www.minecraft.net/en-us/article/minecraft-java-edition-1-16-4"
/// );
/// assert_eq!(
///     changelog_url(base, VersionKind::Snapshot, "20w46a"),
///     "https://www.minecraft.net/en-us/article/minecraft-snapshot-20w46a"
/// );
/// ```
pub fn changelog_url(base: &str, kind: VersionKind, id: &str) -> String {
    format!("{}-{}-{}", base, kind.article_slug(), id.replace('.', "-"))
}

/// [`VersionSource`] backed by the launcher's version manifest.
#[derive(Debug, Clone)]
pub struct LauncherManifest {
    fetcher: HttpFetcher,
    manifest_url: String,
    changelog_base: String,
}

impl LauncherManifest {
    /// Creates a poller for `manifest_url` that derives changelog URLs from
    /// `changelog_base`.
    pub fn new(
        fetcher: HttpFetcher,
        manifest_url: impl Into<String>,
        changelog_base: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            manifest_url: manifest_url.into(),
            changelog_base: changelog_base.into(),
        }
    }

    /// Maps a raw manifest document to the descriptor of its newest entry.
    fn descriptor_from(&self, manifest: serde_json::Value) -> Result<VersionDescriptor, WatchError> {
        let manifest: VersionManifest = serde_json::from_value(manifest)?;
        let latest = manifest
            .versions
            .into_iter()
            .next()
            .ok_or(WatchError::EmptyManifest)?;

        Ok(VersionDescriptor {
            changelog_url: changelog_url(&self.changelog_base, latest.kind, &latest.id),
            kind: latest.kind,
            id: latest.id,
            release_time: latest.release_time,
        })
    }
}

impl VersionSource for LauncherManifest {
    #[instrument(skip(self), fields(url = %self.manifest_url))]
    async fn latest_version(&self) -> Result<VersionDescriptor, WatchError> {
        match self.fetcher.get(&self.manifest_url).await? {
            Document::Json(manifest) => {
                let descriptor = self.descriptor_from(manifest)?;
                debug!(id = %descriptor.id, kind = %descriptor.kind, "Latest version");
                Ok(descriptor)
            }
            Document::Html(_) => Err(WatchError::NotJson {
                url: self.manifest_url.clone(),
            }),
        }
    }
}
