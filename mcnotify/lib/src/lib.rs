//! Minecraft version watcher library.
//!
//! Polls the launcher's version manifest, scrapes the changelog article of
//! every new version, formats it into a size-bounded HTML message and sends
//! it to a Telegram chat. The last notified version is persisted so restarts
//! do not repeat notifications.
//!
//! ## Core Types
//!
//! - [`VersionDescriptor`] - Identifying record of a published version
//! - [`Feature`] / [`Entry`] - Nested changelog sections and bullet items
//! - [`WatchConfig`] - Endpoints, credentials and timings
//!
//! ## Pipeline
//!
//! - [`LauncherManifest`] - [`VersionSource`] reading the launcher manifest
//! - [`ArticleChangelog`] - [`ChangelogSource`] scraping changelog articles
//! - [`format_changelog`] / [`build_message`] - Size-bounded rendering
//! - [`TelegramNotifier`] - [`Notifier`] using the Bot API
//! - [`JsonFileStore`] - [`VersionStore`] backed by a JSON file
//! - [`Watcher`] - The polling loop tying everything together
//!
//! ## Utilities
//!
//! - [`sanitize`] - Escape and normalise scraped text
//! - [`emoji_for`] - Pick a decorative emoji for a section title
//! - [`changelog_url`] - Derive a version's changelog URL
//! - [`parse_interval`] - Parse durations like "10m" or "1h"

mod config;
mod emoji;
mod error;
mod extract;
mod fetch;
mod format;
mod manifest;
mod notify;
mod sanitize;
mod store;
mod types;
mod watcher;

pub use config::{
    DEFAULT_CHANGELOG_BASE, DEFAULT_MANIFEST_URL, DEFAULT_MAX_MESSAGE_LEN, DEFAULT_TELEGRAM_API,
    DEFAULT_VERSION_FILE, MIN_MESSAGE_LEN, TelegramConfig, WatchConfig, parse_interval,
};
pub use emoji::{annotate, emoji_for};
pub use error::{ConfigError, FetchError, NotifyError, StoreError, WatchError};
pub use extract::{ArticleChangelog, ChangelogSource, extract_changelog};
pub use fetch::{Document, HttpFetcher};
pub use format::{
    DEFAULT_START_CAP, MARKER, build_message, compose_message, format_changelog, render_changelog,
};
pub use manifest::{LauncherManifest, VersionSource, changelog_url};
pub use notify::{Notifier, TelegramNotifier};
pub use sanitize::sanitize;
pub use store::{JsonFileStore, VersionStore};
pub use types::{Changelog, Entry, Feature, VersionDescriptor, VersionKind};
pub use watcher::{PollOutcome, Schedule, WatchState, Watcher};
