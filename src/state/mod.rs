pub mod registry;
pub mod visibility;

pub use registry::{DisplayElement, ElementId, ElementRegistry, RenderedContent, Rewrite, Segment};
pub use visibility::{RegionId, ViewportObserver, VisibilityEvent, VisibilitySender, VisibilityTracker};
