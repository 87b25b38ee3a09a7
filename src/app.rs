// src/app.rs
// Terminal chat view that hosts the timestamp engine.

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chat_timestamps::{
    ContentBlob, ContentId, ElementId, ElementRegistry, Host, RegionId, RenderedContent, ViewportObserver,
    VisibilitySender,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// How long a freshly opened channel shows its loading indicator.
const CHANNEL_LOAD_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug)]
pub struct ChatMessage {
    pub id: ContentId,
    pub author: String,
    pub raw: String,
    pub rendered: Option<RenderedContent>,
}

#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub region: RegionId,
    pub messages: Vec<ChatMessage>,
}

impl Channel {
    fn new(name: &str, region: u64, lines: Vec<(String, String)>, next_id: &mut u64) -> Self {
        let messages = lines
            .into_iter()
            .map(|(author, raw)| {
                *next_id += 1;
                ChatMessage {
                    id: ContentId(*next_id),
                    author,
                    raw,
                    rendered: None,
                }
            })
            .collect();
        Self {
            name: name.to_string(),
            region: RegionId(region),
            messages,
        }
    }
}

/// Parses `author: text` lines; lines without an author are attributed to `anon`.
fn parse_transcript(data: &str) -> Vec<(String, String)> {
    data.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once(": ") {
            Some((author, text)) if !author.contains(' ') => (author.to_string(), text.to_string()),
            _ => ("anon".to_string(), line.to_string()),
        })
        .collect()
}

/// Demo conversations with tokens placed around `now`.
fn sample_lines(now: DateTime<Utc>) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let t = now.timestamp();
    let say = |author: &str, text: String| (author.to_string(), text);

    let mut general = vec![
        say("DataWitch", format!("ICE sweep finished <t:{}:R>, logs at <t:{}:T>", t - 42, t - 42)),
        say("jack_h.k", format!("maintenance window opens <t:{}:F> (<t:{}:R>)", t + 5400, t + 5400)),
        say("n0de_r-unner", format!("last outage was <t:{}:R>, on <t:{}:D>", t - 3 * 86_400, t - 3 * 86_400)),
        say("fixer_x", format!("market closes <t:{}:t> today", t + 2 * 3600)),
        say("audiophile", format!("album dropped <t:{}:R> (<t:{}:d>)", t - 40 * 86_400, t - 40 * 86_400)),
        say("Cyph3r", format!("we met <t:{}:R>", t - 400 * 86_400)),
    ];
    for i in 0..24 {
        let offset = (i as i64 + 1) * 1_777;
        general.push(say(
            "relay",
            format!("heartbeat #{} sent <t:{}:R> at <t:{}:f>", i + 1, t - offset, t - offset),
        ));
    }
    general.push(say("DataWitch", format!("you joined <t:{}:R>", t)));

    let random = vec![
        say("audiophile", format!("synth night starts <t:{}:R>", t + 26 * 3600)),
        say("jack_h.k", format!("posted <t:{}:R>", t - 9 * 86_400)),
        say("fixer_x", "broken token stays raw: <t:99999999999999999999:R>".to_string()),
        say("Cyph3r", format!("next week: <t:{}:R>", t + 8 * 86_400)),
    ];

    (general, random)
}

pub struct App {
    pub channels: Vec<Channel>,
    pub current: usize,
    pub scroll_offset: usize,
    pub should_quit: bool,
    pub locale: Option<String>,
    pub element_text: HashMap<ElementId, String>,
    pub element_tooltip: HashMap<ElementId, String>,
    loading_until: Option<Instant>,
    observer: Option<VisibilitySender>,
    observed: HashSet<ElementId>,
    visible: HashSet<ElementId>,
}

impl App {
    pub fn new(channels: Vec<Channel>, locale: Option<String>) -> Self {
        Self {
            channels,
            current: 0,
            scroll_offset: 0,
            should_quit: false,
            locale,
            element_text: HashMap::new(),
            element_tooltip: HashMap::new(),
            loading_until: Some(Instant::now() + CHANNEL_LOAD_DELAY),
            observer: None,
            observed: HashSet::new(),
            visible: HashSet::new(),
        }
    }

    /// Sample channels, plus a channel with the transcript at `path` if given.
    pub fn load_channels(path: Option<&Path>, now: DateTime<Utc>) -> Result<Vec<Channel>, Box<dyn Error>> {
        let mut next_id = 0;
        let mut channels = Vec::new();
        if let Some(path) = path {
            let data = fs::read_to_string(path)?;
            channels.push(Channel::new("transcript", 1, parse_transcript(&data), &mut next_id));
        }
        let (general, random) = sample_lines(now);
        let region = channels.len() as u64 + 1;
        channels.push(Channel::new("general", region, general, &mut next_id));
        channels.push(Channel::new("random", region + 1, random, &mut next_id));
        Ok(channels)
    }

    pub fn current_channel(&self) -> &Channel {
        &self.channels[self.current]
    }

    pub fn is_loading(&self) -> bool {
        self.loading_until.map_or(false, |until| Instant::now() < until)
    }

    /// Opens the next channel. Its messages are re-rendered from their raw text.
    pub fn next_channel(&mut self) {
        self.current = (self.current + 1) % self.channels.len();
        self.scroll_offset = 0;
        self.loading_until = Some(Instant::now() + CHANNEL_LOAD_DELAY);
        for message in &mut self.channels[self.current].messages {
            message.rendered = None;
        }
        self.element_text.clear();
        self.element_tooltip.clear();
        debug!("Switched to #{}", self.current_channel().name);
    }

    pub fn scroll_up(&mut self, lines: usize, visible_rows: usize) {
        let max = self.current_channel().messages.len().saturating_sub(visible_rows);
        self.scroll_offset = (self.scroll_offset + lines).min(max);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Called after each draw with the messages that made it on screen.
    pub fn report_visible(&mut self, shown: &[ContentId]) {
        let now_visible: HashSet<ElementId> = self
            .current_channel()
            .messages
            .iter()
            .filter(|m| shown.contains(&m.id))
            .filter_map(|m| m.rendered.as_ref())
            .flat_map(|content| content.element_ids())
            .filter(|id| self.observed.contains(id))
            .collect();

        if let Some(events) = &self.observer {
            for id in now_visible.difference(&self.visible) {
                events.send(*id, true);
            }
            for id in self.visible.difference(&now_visible) {
                events.send(*id, false);
            }
        }
        self.visible = now_visible;
    }
}

/// Shares the view with the engine's task.
#[derive(Clone)]
pub struct ChatHost {
    app: Arc<Mutex<App>>,
}

impl ChatHost {
    pub fn new(app: Arc<Mutex<App>>) -> Self {
        Self { app }
    }

    fn app(&self) -> MutexGuard<'_, App> {
        lock(&self.app)
    }
}

pub fn lock(app: &Mutex<App>) -> MutexGuard<'_, App> {
    app.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ViewportObserver for ChatHost {
    fn connect(&mut self, _region: RegionId, events: VisibilitySender) {
        let mut app = self.app();
        app.observer = Some(events);
        app.observed.clear();
        app.visible.clear();
    }

    fn observe(&mut self, element: ElementId) {
        self.app().observed.insert(element);
    }

    fn disconnect(&mut self, _region: RegionId) {
        let mut app = self.app();
        app.observer = None;
        app.observed.clear();
        app.visible.clear();
    }
}

impl Host for ChatHost {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn locale(&self) -> Option<String> {
        self.app().locale.clone()
    }

    fn is_loading(&self) -> bool {
        self.app().is_loading()
    }

    fn active_region(&self) -> Option<RegionId> {
        Some(self.app().current_channel().region)
    }

    fn unformatted_content(&self) -> Vec<ContentBlob> {
        let app = self.app();
        // Re-checked under this lock; a channel switch may land after `is_loading`.
        if app.is_loading() {
            return Vec::new();
        }
        app.current_channel()
            .messages
            .iter()
            .filter(|m| m.rendered.is_none())
            .map(|m| ContentBlob {
                id: m.id,
                text: m.raw.clone(),
            })
            .collect()
    }

    fn replace_content(&mut self, id: ContentId, content: RenderedContent, registry: &ElementRegistry) {
        let mut app = self.app();
        for element in content.element_ids().filter_map(|e| registry.get(e)) {
            app.element_text.insert(element.id, element.text.clone());
            app.element_tooltip.insert(element.id, element.tooltip.clone());
        }
        let current = app.current;
        if let Some(message) = app.channels[current].messages.iter_mut().find(|m| m.id == id) {
            message.rendered = Some(content);
        }
    }

    fn update_text(&mut self, element: ElementId, text: &str) {
        self.app().element_text.insert(element, text.to_string());
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.app()
            .current_channel()
            .messages
            .iter()
            .filter_map(|m| m.rendered.as_ref())
            .any(|content| content.element_ids().any(|id| id == element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_authors() {
        let lines = parse_transcript("alice: hi <t:1:R>\n\njust text: with colon\n");
        assert_eq!(lines[0], ("alice".to_string(), "hi <t:1:R>".to_string()));
        assert_eq!(lines[1], ("anon".to_string(), "just text: with colon".to_string()));
    }

    #[test]
    fn test_sample_channels_have_distinct_regions() {
        let channels = App::load_channels(None, Utc::now()).unwrap();
        assert_eq!(channels.len(), 2);
        assert_ne!(channels[0].region, channels[1].region);
        assert!(channels[0].messages.len() > 20);
    }

    #[test]
    fn test_no_content_offered_while_channel_loads() {
        let channels = App::load_channels(None, Utc::now()).unwrap();
        let app = Arc::new(Mutex::new(App::new(channels, None)));
        let host = ChatHost::new(Arc::clone(&app));
        lock(&app).loading_until = None;
        assert!(!host.unformatted_content().is_empty());

        // Switch lands after the engine already saw "not loading".
        assert!(!host.is_loading());
        lock(&app).next_channel();
        assert!(host.unformatted_content().is_empty());
    }

    #[test]
    fn test_switching_channel_resets_rendering() {
        let channels = App::load_channels(None, Utc::now()).unwrap();
        let mut app = App::new(channels, None);
        app.channels[1].messages[0].rendered = Some(RenderedContent::default());
        app.next_channel();
        assert_eq!(app.current, 1);
        assert!(app.is_loading());
        assert!(app.channels[1].messages.iter().all(|m| m.rendered.is_none()));
    }
}
