//! Tracks which relative timestamps are inside the active scroll region.
//!
//! The host reports intersection changes through a [`VisibilitySender`]; the
//! events are queued and only applied when [`VisibilityTracker::drain`] runs
//! at the start of a rendering pass, so a pass always sees one consistent
//! snapshot.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::debug;

use super::registry::{DisplayElement, ElementId, ElementRegistry};

/// Identifies a scrollable viewport in the host (one per channel view).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEvent {
    pub element: ElementId,
    pub entering: bool,
}

/// Handed to the host when a region is bound. Sends fail once that binding is torn down.
#[derive(Debug, Clone)]
pub struct VisibilitySender {
    region: RegionId,
    tx: mpsc::UnboundedSender<VisibilityEvent>,
}

impl VisibilitySender {
    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn send(&self, element: ElementId, entering: bool) -> bool {
        self.tx.send(VisibilityEvent { element, entering }).is_ok()
    }
}

/// The host side of viewport observation.
pub trait ViewportObserver {
    fn connect(&mut self, region: RegionId, events: VisibilitySender);
    fn observe(&mut self, element: ElementId);
    fn disconnect(&mut self, region: RegionId);
}

enum Binding {
    Unbound,
    Bound {
        region: RegionId,
        observed: HashSet<ElementId>,
        events: mpsc::UnboundedReceiver<VisibilityEvent>,
    },
}

pub struct VisibilityTracker {
    binding: Binding,
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self {
            binding: Binding::Unbound,
        }
    }
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound_region(&self) -> Option<RegionId> {
        match &self.binding {
            Binding::Bound { region, .. } => Some(*region),
            Binding::Unbound => None,
        }
    }

    pub fn is_observing(&self, element: ElementId) -> bool {
        match &self.binding {
            Binding::Bound { observed, .. } => observed.contains(&element),
            Binding::Unbound => false,
        }
    }

    /// Binds to `region`, tearing down any binding to another region first.
    /// Returns `false` when already bound to it.
    pub fn bind(&mut self, region: RegionId, observer: &mut impl ViewportObserver) -> bool {
        if self.bound_region() == Some(region) {
            return false;
        }
        self.unbind(observer);

        let (tx, rx) = mpsc::unbounded_channel();
        observer.connect(region, VisibilitySender { region, tx });
        self.binding = Binding::Bound {
            region,
            observed: HashSet::new(),
            events: rx,
        };
        debug!("Bound visibility tracker to region {:?}", region);
        true
    }

    pub fn unbind(&mut self, observer: &mut impl ViewportObserver) {
        if let Binding::Bound { region, .. } = std::mem::replace(&mut self.binding, Binding::Unbound) {
            observer.disconnect(region);
            debug!("Unbound visibility tracker from region {:?}", region);
        }
    }

    /// Starts observing a relative element. Absolute elements never change and are skipped.
    pub fn observe(&mut self, element: &DisplayElement, observer: &mut impl ViewportObserver) -> bool {
        if !element.relative {
            return false;
        }
        match &mut self.binding {
            Binding::Bound { observed, .. } => {
                if observed.insert(element.id) {
                    observer.observe(element.id);
                }
                true
            }
            Binding::Unbound => false,
        }
    }

    /// Applies queued visibility changes to the registry.
    pub fn drain(&mut self, registry: &mut ElementRegistry) -> usize {
        let Binding::Bound { observed, events, .. } = &mut self.binding else {
            return 0;
        };

        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            if observed.contains(&event.element) && registry.set_visible(event.element, event.entering) {
                applied += 1;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Formatter;
    use chrono::{DateTime, Locale, Utc};

    #[derive(Default)]
    struct FakeViewport {
        connected: Option<VisibilitySender>,
        observed: Vec<ElementId>,
        disconnects: Vec<RegionId>,
    }

    impl ViewportObserver for FakeViewport {
        fn connect(&mut self, _region: RegionId, events: VisibilitySender) {
            self.connected = Some(events);
        }

        fn observe(&mut self, element: ElementId) {
            self.observed.push(element);
        }

        fn disconnect(&mut self, region: RegionId) {
            self.disconnects.push(region);
            self.connected = None;
        }
    }

    fn registry_with(text: &str) -> (ElementRegistry, Vec<ElementId>) {
        let mut registry = ElementRegistry::new();
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let rewrite = registry.rewrite_content(text, now, &Formatter::new(Utc, Locale::en_US));
        (registry, rewrite.created)
    }

    #[test]
    fn test_rebinding_disconnects_previous_region() {
        let mut viewport = FakeViewport::default();
        let mut tracker = VisibilityTracker::new();

        assert!(tracker.bind(RegionId(1), &mut viewport));
        assert!(!tracker.bind(RegionId(1), &mut viewport));
        assert!(viewport.disconnects.is_empty());

        let stale = viewport.connected.clone().unwrap();
        assert!(tracker.bind(RegionId(2), &mut viewport));
        assert_eq!(viewport.disconnects, vec![RegionId(1)]);
        assert_eq!(tracker.bound_region(), Some(RegionId(2)));
        assert!(!stale.send(ElementId(1), true));
    }

    #[test]
    fn test_only_relative_elements_are_observed() {
        let (registry, ids) = registry_with("<t:1:R> <t:1:T>");
        let mut viewport = FakeViewport::default();
        let mut tracker = VisibilityTracker::new();

        assert!(!tracker.observe(registry.get(ids[0]).unwrap(), &mut viewport));

        tracker.bind(RegionId(7), &mut viewport);
        assert!(tracker.observe(registry.get(ids[0]).unwrap(), &mut viewport));
        assert!(tracker.observe(registry.get(ids[0]).unwrap(), &mut viewport));
        assert!(!tracker.observe(registry.get(ids[1]).unwrap(), &mut viewport));
        assert_eq!(viewport.observed, vec![ids[0]]);
    }

    #[test]
    fn test_events_apply_only_on_drain() {
        let (mut registry, ids) = registry_with("<t:1:R> <t:2:R>");
        let mut viewport = FakeViewport::default();
        let mut tracker = VisibilityTracker::new();
        tracker.bind(RegionId(1), &mut viewport);
        tracker.observe(registry.get(ids[0]).unwrap(), &mut viewport);

        let events = viewport.connected.clone().unwrap();
        assert!(events.send(ids[0], true));
        assert!(events.send(ids[1], true));
        assert!(!registry.get(ids[0]).unwrap().visible);

        // The second element was never observed by this binding.
        assert_eq!(tracker.drain(&mut registry), 1);
        assert!(registry.get(ids[0]).unwrap().visible);
        assert!(!registry.get(ids[1]).unwrap().visible);

        events.send(ids[0], false);
        tracker.drain(&mut registry);
        assert!(!registry.get(ids[0]).unwrap().visible);
    }
}
