//! End-to-end tests of the watcher against mocked HTTP services.
//!
//! The manifest, the changelog article and the Telegram API are all served
//! by one wiremock server; the version file lives in a temporary directory.

use std::time::Duration;

use mcnotify_lib::{
    ArticleChangelog, HttpFetcher, JsonFileStore, LauncherManifest, PollOutcome, Schedule,
    TelegramConfig, TelegramNotifier, VersionStore, WatchConfig, Watcher,
};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE: &str = include_str!("fixtures/changelog.html");

fn manifest(id: &str, kind: &str) -> serde_json::Value {
    serde_json::json!({
        "latest": { "release": "1.16.4", "snapshot": id },
        "versions": [{
            "id": id,
            "type": kind,
            "url": format!("https://launchermeta.mojang.com/v1/packages/{id}.json"),
            "time": "2020-11-11T15:42:34+00:00",
            "releaseTime": "2020-11-11T15:30:32+00:00"
        }]
    })
}

struct Harness {
    server: MockServer,
    _temp_dir: TempDir,
    store: JsonFileStore,
}

impl Harness {
    async fn start() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("version.json"));
        Self {
            server: MockServer::start().await,
            _temp_dir: temp_dir,
            store,
        }
    }

    fn watcher(
        &self,
    ) -> Watcher<LauncherManifest, ArticleChangelog, TelegramNotifier, JsonFileStore> {
        let fetcher = HttpFetcher::new(1, Duration::ZERO).unwrap();
        let config = WatchConfig::default();

        Watcher::new(
            LauncherManifest::new(
                fetcher.clone(),
                format!("{}/mc/game/version_manifest.json", self.server.uri()),
                format!("{}/article/minecraft", self.server.uri()),
            ),
            ArticleChangelog::new(fetcher.clone()),
            TelegramNotifier::new(
                fetcher.client().clone(),
                TelegramConfig {
                    token: "123:abc".to_string(),
                    chat_id: "-100200".to_string(),
                    api_base: self.server.uri(),
                },
            ),
            self.store.clone(),
            Schedule::from(&config),
        )
    }

    async fn serve_manifest(&self, id: &str, kind: &str) {
        Mock::given(method("GET"))
            .and(path("/mc/game/version_manifest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(manifest(id, kind)))
            .mount(&self.server)
            .await;
    }
}

#[tokio::test]
async fn new_snapshot_is_announced_and_recorded() {
    let harness = Harness::start().await;
    harness.serve_manifest("20w46a", "snapshot").await;

    Mock::given(method("GET"))
        .and(path("/article/minecraft-snapshot-20w46a"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html; charset=utf-8"))
        .expect(1)
        .mount(&harness.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_string_contains("\"parse_mode\":\"HTML\""))
        .and(body_string_contains("minecraft-snapshot-20w46a"))
        .and(body_string_contains("Powder Snow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&harness.server)
        .await;

    let mut watcher = harness.watcher();
    assert_eq!(watcher.poll_once().await, PollOutcome::Delivered);
    assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);

    assert_eq!(harness.store.load().map(|v| v.id), Some("20w46a".to_string()));
}

#[tokio::test]
async fn unpublished_article_is_retried_later() {
    let harness = Harness::start().await;
    harness.serve_manifest("1.16.5", "release").await;

    Mock::given(method("GET"))
        .and(path("/article/minecraft-java-edition-1-16-5"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&harness.server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.server)
        .await;

    let mut watcher = harness.watcher();
    assert_eq!(watcher.poll_once().await, PollOutcome::PendingChangelog);
    assert_eq!(watcher.state().wait, Duration::from_secs(10 * 60));
    assert_eq!(harness.store.load(), None);
}

#[tokio::test]
async fn restart_does_not_repeat_notification() {
    let harness = Harness::start().await;
    harness.serve_manifest("20w46a", "snapshot").await;

    Mock::given(method("GET"))
        .and(path("/article/minecraft-snapshot-20w46a"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html"))
        .mount(&harness.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.server)
        .await;

    assert_eq!(harness.watcher().poll_once().await, PollOutcome::Delivered);

    // A fresh watcher picks the record up from disk.
    let mut restarted = harness.watcher();
    assert_eq!(restarted.poll_once().await, PollOutcome::Unchanged);
}

#[tokio::test]
async fn manifest_outage_is_survivable() {
    let harness = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/mc/game/version_manifest.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&harness.server)
        .await;

    let mut watcher = harness.watcher();
    assert_eq!(watcher.poll_once().await, PollOutcome::Unavailable);
    assert_eq!(watcher.poll_once().await, PollOutcome::Unavailable);
    assert_eq!(watcher.state().iterations, 2);
}
