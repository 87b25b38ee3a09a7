//! The owning context that ties parsing, rendering, visibility and scheduling together.
//!
//! Everything mutable (the id counter, the bound region, the observer channel)
//! lives in one [`Engine`], and only the rendering pass touches it. Hosts with
//! their own loop call [`Engine::tick`] and [`Engine::on_frame`]; hosts that
//! want a background timer hand the engine to [`activate`].

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RefreshConfig;
use crate::error::TimestampError;
use crate::format::Formatter;
use crate::scheduler::RefreshScheduler;
use crate::state::{ElementId, ElementRegistry, RegionId, RenderedContent, ViewportObserver, VisibilityTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(pub u64);

/// Message text that may still hold raw tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlob {
    pub id: ContentId,
    pub text: String,
}

/// What the engine needs from the view it decorates.
pub trait Host: ViewportObserver {
    fn now(&self) -> DateTime<Utc>;

    /// Locale preference such as `en-US`; read once when the engine is built.
    fn locale(&self) -> Option<String>;

    /// True while the content area shows a loading indicator.
    fn is_loading(&self) -> bool;

    fn active_region(&self) -> Option<RegionId>;

    /// Blobs that have not been rewritten yet.
    fn unformatted_content(&self) -> Vec<ContentBlob>;

    fn replace_content(&mut self, id: ContentId, content: RenderedContent, registry: &ElementRegistry);

    fn update_text(&mut self, element: ElementId, text: &str);

    /// Whether the element is still part of the host's content.
    fn is_attached(&self, element: ElementId) -> bool;
}

/// Summary of one rendering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub tick: u64,
    pub rebound: bool,
    pub visibility_changes: usize,
    pub skipped_loading: bool,
    pub materialized: usize,
    pub failures: Vec<TimestampError>,
    pub refreshed: Vec<ElementId>,
}

pub struct Engine<H, Tz: TimeZone = Local> {
    host: H,
    formatter: Formatter<Tz>,
    registry: ElementRegistry,
    tracker: VisibilityTracker,
    scheduler: RefreshScheduler,
}

impl<H: Host> Engine<H, Local> {
    pub fn new(host: H) -> Self {
        let formatter = Formatter::local(host.locale().as_deref());
        Self::with_formatter(host, formatter)
    }
}

impl<H, Tz> Engine<H, Tz>
where
    H: Host,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    pub fn with_formatter(host: H, formatter: Formatter<Tz>) -> Self {
        Self {
            host,
            formatter,
            registry: ElementRegistry::new(),
            tracker: VisibilityTracker::new(),
            scheduler: RefreshScheduler::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &VisibilityTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn has_pending_pass(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Timer tick: request a pass for the next frame, replacing any older request.
    pub fn tick(&mut self) -> bool {
        self.scheduler.on_tick()
    }

    /// Frame opportunity: run the pending pass, if any.
    pub fn on_frame(&mut self) -> Option<PassReport> {
        let tick = self.scheduler.begin_pass()?;
        let report = self.render_pass(tick);
        self.scheduler.finish_pass();
        Some(report)
    }

    /// Stops future passes. Elements already materialized stay as they are.
    pub fn deactivate(&mut self) {
        self.scheduler.deactivate();
    }

    fn render_pass(&mut self, tick: u64) -> PassReport {
        let mut report = PassReport {
            tick,
            ..PassReport::default()
        };

        report.rebound = self.rebind();
        report.visibility_changes = self.tracker.drain(&mut self.registry);

        let now = self.host.now();
        if self.host.is_loading() {
            debug!("Content still loading; skipping token materialization");
            report.skipped_loading = true;
        } else {
            for blob in self.host.unformatted_content() {
                let rewrite = self.registry.rewrite_content(&blob.text, now, &self.formatter);
                for id in &rewrite.created {
                    if let Some(element) = self.registry.get(*id) {
                        self.tracker.observe(element, &mut self.host);
                    }
                }
                report.materialized += rewrite.created.len();
                report.failures.extend(rewrite.failures);
                self.host.replace_content(blob.id, rewrite.content, &self.registry);
            }
        }

        for (id, text) in self.registry.update_visible(now, &self.formatter) {
            self.host.update_text(id, &text);
            report.refreshed.push(id);
        }

        if report.rebound || report.materialized > 0 || !report.refreshed.is_empty() {
            debug!(
                "Pass {}: rebound={} materialized={} refreshed={}",
                tick,
                report.rebound,
                report.materialized,
                report.refreshed.len()
            );
        }
        report
    }

    /// Follows the host's active region. Returns whether the binding changed.
    fn rebind(&mut self) -> bool {
        let region = self.host.active_region();
        if region == self.tracker.bound_region() {
            return false;
        }

        self.registry.hide_all();
        let Some(region) = region else {
            self.tracker.unbind(&mut self.host);
            return true;
        };

        self.tracker.bind(region, &mut self.host);
        let host = &self.host;
        self.registry.prune(|id| host.is_attached(id));
        for id in self.registry.relative_ids() {
            if let Some(element) = self.registry.get(id) {
                self.tracker.observe(element, &mut self.host);
            }
        }
        true
    }
}

/// Stops an activated refresh loop. Cloneable; calling it more than once is harmless.
#[derive(Debug, Clone)]
pub struct Deactivate {
    token: CancellationToken,
}

impl Deactivate {
    pub fn deactivate(&self) {
        self.token.cancel();
    }

    pub fn is_deactivated(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Runs the engine on a tokio task that owns it. Ticks come from a timer with
/// the configured period; a pass runs on the first frame the host signals on
/// `frames` after a tick.
/// The task hands the engine back when it stops.
pub fn activate<H, Tz>(
    mut engine: Engine<H, Tz>,
    config: RefreshConfig,
    mut frames: mpsc::UnboundedReceiver<()>,
) -> (Deactivate, JoinHandle<Engine<H, Tz>>)
where
    H: Host + Send + 'static,
    Tz: TimeZone + Send + 'static,
    Tz::Offset: fmt::Display + Send,
{
    let token = CancellationToken::new();
    let handle = Deactivate {
        token: token.clone(),
    };

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    engine.tick();
                }
                frame = frames.recv() => {
                    if frame.is_none() {
                        break;
                    }
                    // Frames with no pending request are consumed and dropped.
                    engine.on_frame();
                }
            }
        }

        engine.deactivate();
        debug!("Timestamp refresh loop stopped");
        engine
    });

    (handle, task)
}
