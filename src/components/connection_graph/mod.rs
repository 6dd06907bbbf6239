mod build;
mod component;
mod extract;
#[cfg(test)]
mod fixture;
mod host;
mod layout;
mod observer;
mod render;
mod schedule;
mod types;
pub mod web;

pub use build::{build_data, link_weight, truncate_title};
pub use component::ConnectionGraphView;
pub use extract::{
	DEFAULT_SCORE, Extractor, Field, FieldKind, PanelDom, SuggestionSource, parse_float,
};
pub use host::{
	ActiveDocumentProvider, Host, MutationSource, Navigator, Subscription, Surface, WatchScope,
	navigate,
};
pub use layout::{Forces, LayoutEngine, Particle, Simulation, TickListener, advance};
pub use observer::GraphView;
pub use render::{LinkGlyph, NodeGlyph, Scene, SceneContent, link_opacity, stroke_width};
pub use schedule::{CoalescedDispatch, FrameId, FrameScheduler, FrameSlots};
pub use types::{ActiveDocument, ConnectionSuggestion, GraphData, GraphLink, GraphNode, Point};
