use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use media_tools::TrimBounds;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use broller::cache::{ArtifactStore, CacheKey, DiskCache, Stage};
use broller::credits::CreditsLedger;
use broller::fetcher::Fetcher;
use broller::platforms::{Catalog, Mode, Platform, PlatformKind, PlatformRegistry, Unsplash};
use broller::processor::MediaTool;
use broller::resolver::ContentReference;
use broller::selector::{SelectionPolicy, StreamDescriptor, StreamKind};
use broller::{Pipeline, Request};

const VIDEO_ID: &str = "e7e9rVKCZyI";

/// Video platform whose streams live on a mock server.
struct FakeVideoPlatform {
    media_base: String
}

#[async_trait]
impl Platform for FakeVideoPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::YouTube
    }

    async fn catalog(&self, reference: &ContentReference) -> broller::Result<Catalog> {
        Ok(Catalog {
            id: reference.id.clone(),
            title: "Test Clip".to_string(),
            attribution_url: format!("https://www.youtube.com/watch?v={}", reference.id),
            base_name: format!("test-clip__{}", reference.id),
            streams: vec![
                StreamDescriptor::new("160", StreamKind::Video, "video/mp4", format!("{}/low", self.media_base))
                    .with_dimensions(256, 144),
                StreamDescriptor::new("137", StreamKind::Video, "video/mp4", format!("{}/video", self.media_base))
                    .with_dimensions(1920, 1080),
                StreamDescriptor::new("140", StreamKind::Audio, "audio/mp4", format!("{}/audio", self.media_base))
                    .with_quality(128)
            ]
        })
    }

    fn policy(&self, kind: StreamKind) -> SelectionPolicy {
        match kind {
            StreamKind::Audio => SelectionPolicy::new("audio/mp4").with_priority(["140", "139"]),
            _ => SelectionPolicy::new("video/mp4").with_priority(["137", "160"])
        }
    }

    fn wanted(&self, mode: Mode, _catalog: &Catalog) -> Vec<StreamKind> {
        match mode {
            Mode::Both => vec![StreamKind::Audio, StreamKind::Video],
            Mode::Audio => vec![StreamKind::Audio],
            Mode::Video => vec![StreamKind::Video]
        }
    }

    fn watermark_text(&self, catalog: &Catalog) -> Option<String> {
        Some(format!("youtu.be/{} - {}", catalog.id, catalog.title))
    }
}

/// Stands in for ffmpeg: writes a marker file per call.
#[derive(Default)]
struct FakeTool {
    calls: Mutex<Vec<&'static str>>,
    missing: bool,
    broken_watermark: bool
}

impl FakeTool {
    fn run(&self, name: &'static str, output: &Path) -> media_tools::Result<()> {
        if self.missing {
            return Err(media_tools::Error::BinaryNotFound(PathBuf::from("ffmpeg")));
        }
        self.calls.lock().unwrap().push(name);
        std::fs::write(output, name)?;
        Ok(())
    }
}

#[async_trait]
impl MediaTool for FakeTool {
    async fn merge(&self, _audio: &Path, _video: &Path, output: &Path) -> media_tools::Result<()> {
        self.run("merge", output)
    }

    async fn trim(
        &self,
        _input: &Path,
        output: &Path,
        bounds: &TrimBounds,
        _has_video: bool
    ) -> media_tools::Result<()> {
        assert_eq!(bounds.start.as_deref(), Some("00:00:10"));
        assert_eq!(bounds.end.as_deref(), Some("00:01:30"));
        self.run("trim", output)
    }

    async fn repackage(&self, _input: &Path, output: &Path) -> media_tools::Result<()> {
        self.run("repackage", output)
    }

    async fn watermark(&self, _input: &Path, output: &Path, text: &str) -> media_tools::Result<()> {
        assert_eq!(text, format!("youtu.be/{VIDEO_ID} - Test Clip"));
        if self.broken_watermark {
            return Err(media_tools::Error::CommandFailed {
                tool: "ffmpeg".to_string(),
                code: 1,
                stderr: "No such filter: 'drawtext'".to_string()
            });
        }
        self.run("watermark", output)
    }
}

/// Disk cache that remembers the order entries were committed in.
struct RecordingStore {
    inner: DiskCache,
    committed: Mutex<Vec<Stage>>
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.inner.path_for(key)
    }

    fn has(&self, key: &CacheKey) -> bool {
        self.inner.has(key)
    }

    fn staging_path(&self, key: &CacheKey) -> PathBuf {
        self.inner.staging_path(key)
    }

    async fn commit(&self, key: &CacheKey) -> broller::Result<PathBuf> {
        let path = self.inner.commit(key).await?;
        self.committed.lock().unwrap().push(key.stage());
        Ok(path)
    }

    async fn discard(&self, key: &CacheKey) {
        self.inner.discard(key).await;
    }

    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> broller::Result<PathBuf> {
        self.inner.write(key, bytes).await
    }

    async fn read(&self, key: &CacheKey) -> broller::Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn clear(&self) -> broller::Result<usize> {
        self.inner.clear().await
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    root: PathBuf,
    server: MockServer,
    store: Arc<RecordingStore>,
    tool: Arc<FakeTool>,
    pipeline: Pipeline
}

async fn harness(tool: FakeTool) -> Harness {
    watermarked_harness(tool, false).await
}

async fn watermarked_harness(tool: FakeTool, watermark: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio".to_vec()))
        .expect(0..=1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/video"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
        .expect(0..=1)
        .mount(&server)
        .await;

    let mut registry = PlatformRegistry::new();
    registry.register(Box::new(FakeVideoPlatform {
        media_base: server.uri()
    }));

    let store = Arc::new(RecordingStore {
        inner: DiskCache::new(root.join("cache")),
        committed: Mutex::new(Vec::new())
    });
    let tool = Arc::new(tool);
    let pipeline = Pipeline::new(
        registry,
        store.clone(),
        Fetcher::new().unwrap(),
        tool.clone(),
        CreditsLedger::new(root.join("credits.tsv")),
        root.join("out")
    )
    .with_watermark(watermark);

    Harness {
        _dir: dir,
        root,
        server,
        store,
        tool,
        pipeline
    }
}

fn trimmed_request() -> Request {
    Request {
        mode: Mode::Both,
        start: Some("10".to_string()),
        end: Some("1:30".to_string()),
        name: Some("intro".to_string()),
        ..Request::new(format!("https://www.youtube.com/watch?v={VIDEO_ID}&t=1"))
    }
}

#[tokio::test]
async fn test_both_streams_are_fetched_merged_and_trimmed() {
    let h = harness(FakeTool::default()).await;

    let outcome = h.pipeline.run(&trimmed_request()).await.unwrap();

    assert_eq!(
        *h.store.committed.lock().unwrap(),
        vec![Stage::AudioRaw, Stage::VideoRaw, Stage::Merged, Stage::Trimmed]
    );
    assert_eq!(outcome.output, h.root.join("out").join("intro.mp4"));
    assert_eq!(std::fs::read(&outcome.output).unwrap(), b"trim");
    assert!(!outcome.degraded);
    assert!(outcome.credited);

    let ledger = std::fs::read_to_string(h.root.join("credits.tsv")).unwrap();
    assert_eq!(ledger, format!("Test Clip\thttps://www.youtube.com/watch?v={VIDEO_ID}\n"));
}

#[tokio::test]
async fn test_second_run_reuses_every_entry() {
    let h = harness(FakeTool::default()).await;

    h.pipeline.run(&trimmed_request()).await.unwrap();
    let again = h.pipeline.run(&trimmed_request()).await.unwrap();

    assert_eq!(h.store.committed.lock().unwrap().len(), 4);
    assert_eq!(*h.tool.calls.lock().unwrap(), vec!["merge", "trim"]);
    assert!(!again.credited);

    let ledger = std::fs::read_to_string(h.root.join("credits.tsv")).unwrap();
    assert_eq!(ledger.lines().count(), 1);
    h.server.verify().await;
}

#[tokio::test]
async fn test_missing_tool_publishes_the_raw_video() {
    let h = harness(FakeTool {
        missing: true,
        ..FakeTool::default()
    })
    .await;

    let outcome = h.pipeline.run(&trimmed_request()).await.unwrap();

    assert!(outcome.degraded);
    assert_eq!(std::fs::read(&outcome.output).unwrap(), b"video");
    assert_eq!(
        *h.store.committed.lock().unwrap(),
        vec![Stage::AudioRaw, Stage::VideoRaw]
    );
}

#[tokio::test]
async fn test_audio_only_is_repackaged() {
    let h = harness(FakeTool::default()).await;
    let request = Request {
        mode: Mode::Audio,
        output_dir: Some(h.root.join("music")),
        ..Request::new(format!("https://youtu.be/{VIDEO_ID}"))
    };

    let outcome = h.pipeline.run(&request).await.unwrap();

    assert_eq!(
        outcome.output,
        h.root.join("music").join(format!("test-clip__{VIDEO_ID}.m4a"))
    );
    assert_eq!(
        *h.store.committed.lock().unwrap(),
        vec![Stage::AudioRaw, Stage::Repackaged]
    );
}

fn video_requests(received: &[wiremock::Request]) -> usize {
    received.iter().filter(|r| r.url.path() == "/video").count()
}

#[tokio::test]
async fn test_merge_uses_the_watermarked_video() {
    let h = watermarked_harness(FakeTool::default(), true).await;

    let outcome = h.pipeline.run(&trimmed_request()).await.unwrap();

    assert!(!outcome.degraded);
    assert_eq!(
        *h.store.committed.lock().unwrap(),
        vec![
            Stage::AudioRaw,
            Stage::VideoRaw,
            Stage::VideoWatermarked,
            Stage::Merged,
            Stage::Trimmed
        ]
    );
    assert_eq!(*h.tool.calls.lock().unwrap(), vec!["watermark", "merge", "trim"]);
    let merged = CacheKey::new(&format!("test-clip__{VIDEO_ID}"), Stage::VideoWatermarked, "mp4")
        .derive(Stage::Merged, None, "mp4");
    assert!(h.store.has(&merged));
}

#[tokio::test]
async fn test_cached_watermark_skips_the_raw_video() {
    let h = watermarked_harness(FakeTool::default(), true).await;
    let watermarked = CacheKey::new(&format!("test-clip__{VIDEO_ID}"), Stage::VideoWatermarked, "mp4");
    h.store.inner.write(&watermarked, b"watermarked").await.unwrap();

    let outcome = h.pipeline.run(&trimmed_request()).await.unwrap();

    assert!(!outcome.degraded);
    let received = h.server.received_requests().await.unwrap();
    assert_eq!(video_requests(&received), 0);
    assert_eq!(
        *h.store.committed.lock().unwrap(),
        vec![Stage::AudioRaw, Stage::Merged, Stage::Trimmed]
    );
    assert_eq!(*h.tool.calls.lock().unwrap(), vec!["merge", "trim"]);
}

#[tokio::test]
async fn test_failed_watermark_publishes_the_raw_video() {
    let h = watermarked_harness(
        FakeTool {
            broken_watermark: true,
            ..FakeTool::default()
        },
        true
    )
    .await;
    let request = Request {
        mode: Mode::Video,
        ..Request::new(format!("https://youtu.be/{VIDEO_ID}"))
    };

    let outcome = h.pipeline.run(&request).await.unwrap();

    assert!(outcome.degraded);
    assert_eq!(std::fs::read(&outcome.output).unwrap(), b"video");
    assert_eq!(*h.store.committed.lock().unwrap(), vec![Stage::VideoRaw]);
    assert!(!h
        .store
        .has(&CacheKey::new(&format!("test-clip__{VIDEO_ID}"), Stage::VideoWatermarked, "mp4")));
}

#[tokio::test]
async fn test_remote_tags_cannot_leave_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "urls": {"full": format!("{}/full.jpg", server.uri())},
            "tags": [{"title": "24/7"}, {"title": "../../escape"}],
            "user": {"name": "Ann"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/full.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut registry = PlatformRegistry::new();
    registry.register(Box::new(Unsplash::with_base_url(
        reqwest::Client::new(),
        "secret".to_string(),
        server.uri()
    )));
    let cache = root.join("cache").join("entries");
    let pipeline = Pipeline::new(
        registry,
        Arc::new(DiskCache::new(&cache)),
        Fetcher::new().unwrap(),
        Arc::new(FakeTool::default()),
        CreditsLedger::new(root.join("credits.tsv")),
        root.join("out")
    );

    let outcome = pipeline.run(&Request::new("https://unsplash.com/photos/abc123")).await.unwrap();

    assert_eq!(outcome.output, root.join("out").join("abc123-24-7-escape.jpg"));
    assert_eq!(std::fs::read(&outcome.output).unwrap(), b"jpeg");
    let entries: Vec<String> = std::fs::read_dir(&cache)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["abc123-24-7-escape_asset.jpg".to_string()]);
    assert_eq!(std::fs::read_dir(root.join("cache")).unwrap().count(), 1);
}
