use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::error::{TimestampError, TimestampResult};
use crate::format::Formatter;
use crate::token::{scan_tokens, TimestampToken};

/// Identifier of a rendered timestamp. Never reused within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u64);

impl ElementId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timestamp-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayElement {
    pub id: ElementId,
    pub token: TimestampToken,
    pub target_millis: i64,
    pub relative: bool,
    /// Only tracked for relative elements.
    pub visible: bool,
    pub text: String,
    pub tooltip: String,
}

/// A piece of rewritten message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Timestamp(ElementId),
}

/// Message content after its tokens have been swapped for element references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedContent {
    pub segments: Vec<Segment>,
}

impl RenderedContent {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Text(last)) => last.push_str(text),
            _ => self.segments.push(Segment::Text(text.to_string())),
        }
    }

    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Timestamp(id) => Some(*id),
            Segment::Text(_) => None,
        })
    }

    /// Serializes the content with each element's current text.
    pub fn plain_text(&self, registry: &ElementRegistry) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.as_str(),
                Segment::Timestamp(id) => registry.get(*id).map(|el| el.text.as_str()).unwrap_or(""),
            })
            .collect()
    }
}

/// Result of rewriting one content blob.
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    pub content: RenderedContent,
    pub created: Vec<ElementId>,
    pub failures: Vec<TimestampError>,
}

/// Owns every materialized element and hands out their ids.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    next_id: u64,
    elements: BTreeMap<ElementId, DisplayElement>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&DisplayElement> {
        self.elements.get(&id)
    }

    pub fn relative_ids(&self) -> Vec<ElementId> {
        self.elements
            .values()
            .filter(|el| el.relative)
            .map(|el| el.id)
            .collect()
    }

    pub fn materialize<Tz>(
        &mut self,
        token: TimestampToken,
        now: DateTime<Utc>,
        formatter: &Formatter<Tz>,
    ) -> TimestampResult<&DisplayElement>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let text = formatter.render(now, &token)?;
        let tooltip = formatter.render_tooltip(token.epoch_millis())?;

        self.next_id += 1;
        let id = ElementId(self.next_id);
        let element = DisplayElement {
            id,
            token,
            target_millis: token.epoch_millis(),
            relative: token.style.is_relative(),
            visible: false,
            text,
            tooltip,
        };
        Ok(self.elements.entry(id).or_insert(element))
    }

    /// Materializes every token in `text` in one forward pass. Tokens that fail
    /// stay in the output as their raw text.
    pub fn rewrite_content<Tz>(
        &mut self,
        text: &str,
        now: DateTime<Utc>,
        formatter: &Formatter<Tz>,
    ) -> Rewrite
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut rewrite = Rewrite::default();
        let mut cursor = 0;

        for found in scan_tokens(text) {
            rewrite.content.push_text(&text[cursor..found.span.start]);
            let raw = &text[found.span.clone()];
            cursor = found.span.end;

            match found.token.and_then(|token| self.materialize(token, now, formatter).map(|el| el.id)) {
                Ok(id) => {
                    rewrite.content.segments.push(Segment::Timestamp(id));
                    rewrite.created.push(id);
                }
                Err(e) => {
                    warn!("Leaving timestamp token {} unformatted: {}", raw, e);
                    rewrite.content.push_text(raw);
                    rewrite.failures.push(e);
                }
            }
        }
        rewrite.content.push_text(&text[cursor..]);
        rewrite
    }

    /// Returns whether the element exists and is relative.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> bool {
        match self.elements.get_mut(&id) {
            Some(el) if el.relative => {
                el.visible = visible;
                true
            }
            _ => false,
        }
    }

    pub fn hide_all(&mut self) {
        for el in self.elements.values_mut() {
            el.visible = false;
        }
    }

    /// Re-renders visible relative elements, returning only those whose text changed.
    pub fn update_visible<Tz>(&mut self, now: DateTime<Utc>, formatter: &Formatter<Tz>) -> Vec<(ElementId, String)>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut changed = Vec::new();
        for el in self.elements.values_mut().filter(|el| el.relative && el.visible) {
            match formatter.render_relative(now, el.target_millis) {
                Ok(text) if text != el.text => {
                    el.text = text.clone();
                    changed.push((el.id, text));
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to refresh {}: {}", el.id, e),
            }
        }
        changed
    }

    /// Drops elements the host no longer shows. Ids are not recycled.
    pub fn prune(&mut self, mut is_attached: impl FnMut(ElementId) -> bool) -> usize {
        let before = self.elements.len();
        self.elements.retain(|id, _| is_attached(*id));
        let removed = before - self.elements.len();
        if removed > 0 {
            debug!("Pruned {} detached timestamp elements", removed);
        }
        removed
    }
}
