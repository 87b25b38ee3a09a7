use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Locale, Utc};
use chat_timestamps::{
    activate, parse_next_token, ContentBlob, ContentId, ElementId, ElementRegistry, Engine, Formatter, Host,
    RefreshConfig, RegionId, RenderedContent, ViewportObserver, VisibilitySender,
};
use tokio::sync::mpsc;

enum Body {
    Raw(String),
    Rendered(RenderedContent),
}

struct FakeHost {
    now: DateTime<Utc>,
    loading: bool,
    region: Option<RegionId>,
    blobs: BTreeMap<ContentId, Body>,
    events: Option<VisibilitySender>,
    observed: Vec<ElementId>,
    disconnects: Vec<RegionId>,
    texts: HashMap<ElementId, String>,
    updates: usize,
    content_queries: Cell<usize>,
}

impl FakeHost {
    fn new(messages: &[&str]) -> Self {
        let blobs = messages
            .iter()
            .enumerate()
            .map(|(i, text)| (ContentId(i as u64), Body::Raw(text.to_string())))
            .collect();
        Self {
            now: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            loading: false,
            region: Some(RegionId(1)),
            blobs,
            events: None,
            observed: Vec::new(),
            disconnects: Vec::new(),
            texts: HashMap::new(),
            updates: 0,
            content_queries: Cell::new(0),
        }
    }

    fn rendered(&self, id: u64) -> &RenderedContent {
        match self.blobs.get(&ContentId(id)) {
            Some(Body::Rendered(content)) => content,
            _ => panic!("blob {id} not rendered"),
        }
    }
}

impl ViewportObserver for FakeHost {
    fn connect(&mut self, _region: RegionId, events: VisibilitySender) {
        self.events = Some(events);
    }

    fn observe(&mut self, element: ElementId) {
        self.observed.push(element);
    }

    fn disconnect(&mut self, region: RegionId) {
        self.disconnects.push(region);
        self.events = None;
        self.observed.clear();
    }
}

impl Host for FakeHost {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn locale(&self) -> Option<String> {
        Some("en-US".to_string())
    }

    fn is_loading(&self) -> bool {
        self.loading
    }

    fn active_region(&self) -> Option<RegionId> {
        self.region
    }

    fn unformatted_content(&self) -> Vec<ContentBlob> {
        self.content_queries.set(self.content_queries.get() + 1);
        self.blobs
            .iter()
            .filter_map(|(id, body)| match body {
                Body::Raw(text) => Some(ContentBlob {
                    id: *id,
                    text: text.clone(),
                }),
                Body::Rendered(_) => None,
            })
            .collect()
    }

    fn replace_content(&mut self, id: ContentId, content: RenderedContent, registry: &ElementRegistry) {
        for element in content.element_ids() {
            if let Some(el) = registry.get(element) {
                self.texts.insert(element, el.text.clone());
            }
        }
        self.blobs.insert(id, Body::Rendered(content));
    }

    fn update_text(&mut self, element: ElementId, text: &str) {
        self.updates += 1;
        self.texts.insert(element, text.to_string());
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.blobs.values().any(|body| match body {
            Body::Rendered(content) => content.element_ids().any(|id| id == element),
            Body::Raw(_) => false,
        })
    }
}

fn engine(messages: &[&str]) -> Engine<FakeHost, Utc> {
    Engine::with_formatter(FakeHost::new(messages), Formatter::new(Utc, Locale::en_US))
}

fn run_pass(engine: &mut Engine<FakeHost, Utc>) -> chat_timestamps::PassReport {
    assert!(engine.tick());
    engine.on_frame().expect("pass should run")
}

#[test]
fn test_message_tokens_fully_resolved() {
    let mut engine = engine(&["Event at <t:1700000000:F> see you <t:1700003600:R>"]);
    let report = run_pass(&mut engine);

    assert!(report.rebound);
    assert_eq!(report.materialized, 2);
    assert!(report.failures.is_empty());

    let content = engine.host().rendered(0);
    let text = content.plain_text(engine.registry());
    assert_eq!(parse_next_token(&text).unwrap(), None);

    let ids: Vec<_> = content.element_ids().collect();
    assert!(!engine.registry().get(ids[0]).unwrap().relative);
    assert!(engine.registry().get(ids[1]).unwrap().relative);
    assert_eq!(engine.host().observed, vec![ids[1]]);
    assert!(engine.tracker().is_observing(ids[1]));
}

#[test]
fn test_visible_relative_elements_refresh_once() {
    let mut engine = engine(&["<t:1700000000:R>", "<t:1699999000:R>"]);
    run_pass(&mut engine);
    let shown = engine.host().rendered(0).element_ids().next().unwrap();
    let hidden = engine.host().rendered(1).element_ids().next().unwrap();

    engine.host().events.as_ref().unwrap().send(shown, true);
    engine.host_mut().now += chrono::Duration::minutes(5);

    let report = run_pass(&mut engine);
    assert_eq!(report.visibility_changes, 1);
    assert_eq!(report.refreshed, vec![shown]);
    assert_eq!(engine.host().texts[&shown], "5 minutes ago (@ 10:13 PM UTC)");
    assert!(engine.host().texts[&hidden].starts_with("16 minutes ago"));

    // Same instant again: nothing changes, so the host hears nothing.
    let report = run_pass(&mut engine);
    assert!(report.refreshed.is_empty());
    assert_eq!(engine.host().updates, 1);
}

#[test]
fn test_loading_content_is_left_alone() {
    let mut engine = engine(&["at <t:1700000000:t>"]);
    engine.host_mut().loading = true;

    let report = run_pass(&mut engine);
    assert!(report.skipped_loading);
    assert_eq!(report.materialized, 0);
    assert_eq!(engine.host().content_queries.get(), 0);

    engine.host_mut().loading = false;
    let report = run_pass(&mut engine);
    assert_eq!(report.materialized, 1);
    assert_eq!(
        engine.host().rendered(0).plain_text(engine.registry()),
        "at 10:13 PM"
    );
}

#[test]
fn test_failed_token_stays_raw_and_pass_continues() {
    let mut engine = engine(&["bad <t:99999999999999999999:R>", "good <t:1700000000:d>"]);
    let report = run_pass(&mut engine);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.materialized, 1);
    assert_eq!(
        engine.host().rendered(0).plain_text(engine.registry()),
        "bad <t:99999999999999999999:R>"
    );
    assert_eq!(
        engine.host().rendered(1).plain_text(engine.registry()),
        "good 11/14/2023"
    );
}

#[test]
fn test_ticks_before_a_frame_coalesce() {
    let mut engine = engine(&["<t:1700000000:R>"]);
    assert!(engine.tick());
    assert!(engine.tick());

    let report = engine.on_frame().unwrap();
    assert_eq!(report.tick, 2);
    assert!(engine.on_frame().is_none());
    assert_eq!(engine.host().content_queries.get(), 1);
    assert_eq!(engine.scheduler().coalesced(), 1);
}

#[test]
fn test_no_passes_after_deactivation() {
    let mut engine = engine(&["<t:1700000000:R>"]);
    engine.tick();
    engine.deactivate();
    engine.deactivate();

    assert!(!engine.tick());
    assert!(engine.on_frame().is_none());
    assert_eq!(engine.host().content_queries.get(), 0);
}

#[test]
fn test_region_swap_rebinds_tracker() {
    let mut engine = engine(&["<t:1700000000:R> <t:1700000000:T>"]);
    run_pass(&mut engine);
    let relative = engine.host().rendered(0).element_ids().next().unwrap();
    engine.host().events.as_ref().unwrap().send(relative, true);
    run_pass(&mut engine);
    assert!(engine.registry().get(relative).unwrap().visible);

    engine.host_mut().region = Some(RegionId(2));
    let report = run_pass(&mut engine);
    assert!(report.rebound);
    assert_eq!(engine.host().disconnects, vec![RegionId(1)]);
    assert_eq!(engine.tracker().bound_region(), Some(RegionId(2)));
    assert_eq!(engine.host().observed, vec![relative]);
    assert!(!engine.registry().get(relative).unwrap().visible);

    engine.host_mut().region = None;
    let report = run_pass(&mut engine);
    assert!(report.rebound);
    assert_eq!(engine.tracker().bound_region(), None);
}

#[tokio::test(start_paused = true)]
async fn test_activated_loop_runs_until_deactivated() {
    let engine = engine(&["<t:1700000000:R>", "<t:1700000000:D>"]);
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let (deactivate, task) = activate(engine, RefreshConfig::with_period_ms(Some(1000)), frame_rx);

    tokio::time::sleep(Duration::from_millis(10)).await;
    frame_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    deactivate.deactivate();
    deactivate.deactivate();
    assert!(deactivate.is_deactivated());
    let _ = frame_tx.send(());

    let engine = task.await.unwrap();
    assert!(!engine.is_active());
    assert_eq!(engine.host().content_queries.get(), 1);
    assert_eq!(engine.registry().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pass_waits_for_a_frame_after_the_tick() {
    let engine = engine(&["<t:1700000000:R>"]);
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let start = tokio::time::Instant::now();
    let (deactivate, task) = activate(engine, RefreshConfig::with_period_ms(Some(1000)), frame_rx);

    // A busy host draws every 50 ms for three ticks (at 0, 1000 and 2000 ms).
    tokio::time::sleep(Duration::from_millis(25)).await;
    for _ in 0..60 {
        frame_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // Then goes quiet across five more ticks; they pile into one pending request.
    tokio::time::sleep_until(start + Duration::from_millis(7500)).await;

    // One new frame runs exactly one pass.
    frame_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    deactivate.deactivate();
    let engine = task.await.unwrap();
    assert_eq!(engine.host().content_queries.get(), 4);
    assert_eq!(engine.scheduler().coalesced(), 4);
}
