use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::oneshot;

use fansly_grabber::config::{Settings, SettingsHandle};
use fansly_grabber::dom::{DefaultMarkup, Document, NodeId};
use fansly_grabber::download::{
    DownloadQueue, DownloadRequest, RecordingNotifier, RecordingService, DEFAULT_COOL_DOWN,
};
use fansly_grabber::media::{ContentLabel, QualityTier};
use fansly_grabber::page::{PageController, PageEvent, PageRuntime};
use fansly_grabber::store::{CorrelationStore, SharedStore, DEFAULT_CAPACITY};

const POST_URL: &str = "https://apiv3.fansly.com/api/v1/post?ids=42";

fn seeded_store() -> SharedStore {
    let store = CorrelationStore::shared(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap(), None);
    let payload = json!({
        "id": "42",
        "media": [{
            "type": "video",
            "preview": "https://x/p.jpg?z=1",
            "source": {"source": "https://x/full.mp4"},
            "videoSources": {"720": "https://x/720.mp4"}
        }]
    });
    let summary = store.write().record_response(POST_URL, &payload);
    assert_eq!(summary.posts, 1);
    store
}

fn queue_for(service: &RecordingService, settings: &SettingsHandle) -> DownloadQueue {
    DownloadQueue::new(
        Arc::new(service.clone()),
        Arc::new(RecordingNotifier::default()),
        settings.subscribe(),
        DEFAULT_COOL_DOWN,
    )
}

#[test]
fn recorded_video_resolves_by_preferred_quality() {
    let store = seeded_store();
    let store = store.read();

    assert_eq!(
        store.resolve_fingerprint("https://x/p.jpg", QualityTier::P720).as_deref(),
        Some("https://x/720.mp4")
    );
    assert_eq!(
        store.resolve_fingerprint("https://x/p.jpg", QualityTier::Full).as_deref(),
        Some("https://x/full.mp4")
    );
    // 240 was never recorded, so full is the fallback
    assert_eq!(
        store.resolve_fingerprint("https://x/p.jpg?other=2", QualityTier::P240).as_deref(),
        Some("https://x/full.mp4")
    );
}

#[tokio::test(start_paused = true)]
async fn queued_requests_run_in_order_with_cool_down() {
    let service = RecordingService::new(Duration::from_millis(30));
    let settings = SettingsHandle::new(Settings::default());
    let queue = queue_for(&service, &settings);

    let requests = [
        ("u1.jpg", ContentLabel::Download),
        ("u2.jpg", ContentLabel::Download),
        // no extension in the URL: the label decides it
        ("u3", ContentLabel::DownloadVideo),
    ];
    for (name, label) in requests {
        let url = format!("https://cdn.fansly.com/{}?token=abc", name);
        queue.enqueue(DownloadRequest::new(url, "Bob", label)).unwrap();
    }
    queue.wait_idle().await;

    let calls = service.calls();
    let names: Vec<&str> = calls.iter().map(|(_, o)| o.filename.as_str()).collect();
    assert_eq!(names, vec!["Bob/u1.jpg", "Bob/u2.jpg", "Bob/u3.mp4"]);
    for pair in calls.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= Duration::from_millis(100));
    }
    assert_eq!(queue.stats().done, 3);
}

fn find_control(doc: &Document) -> Option<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .find(|n| doc.has_class(*n, "fgrab-control"))
}

#[tokio::test(start_paused = true)]
async fn clicking_a_control_queues_the_resolved_video() {
    let store = seeded_store();
    let settings = SettingsHandle::new(Settings {
        quality: QualityTier::P720,
        auto_create_folder: true,
    });
    let service = RecordingService::new(Duration::ZERO);
    let queue = queue_for(&service, &settings);

    let mut doc = Document::new("https://fansly.com/Bob/posts");
    let root = doc.root();
    let post = doc.element("div", &[("data-post-id", "42")]);
    let video = doc.element("video", &[("poster", "https://x/p.jpg?z=9")]);
    doc.append_child(root, post);
    doc.append_child(post, video);

    let controller = PageController::new(Arc::new(DefaultMarkup), store, settings.subscribe());
    let (runtime, handle) = PageRuntime::new(doc, controller, queue.clone(), settings.subscribe());
    let task = tokio::spawn(runtime.run());

    let (tx, rx) = oneshot::channel();
    handle
        .mutate(move |doc| {
            let _ = tx.send(find_control(doc));
        })
        .unwrap();
    let control = rx.await.unwrap().expect("control injected on start");

    handle.send(PageEvent::ControlClicked(control)).unwrap();
    let (tx, rx) = oneshot::channel();
    handle
        .mutate(move |doc| {
            let _ = tx.send(doc.attr(control, "data-state").map(str::to_string));
        })
        .unwrap();
    assert_eq!(rx.await.unwrap().as_deref(), Some("queued"));

    queue.wait_idle().await;
    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.url, "https://x/720.mp4");
    assert_eq!(calls[0].1.filename, "Bob/720.mp4");

    handle.shutdown().unwrap();
    let doc = task.await.unwrap();
    assert!(find_control(&doc).is_none());
}
