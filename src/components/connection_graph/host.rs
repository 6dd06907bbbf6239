//! Capabilities a graph view borrows from its host.

use std::rc::Rc;

use log::debug;

use super::extract::SuggestionSource;
use super::render::Scene;
use super::schedule::FrameScheduler;
use super::types::ActiveDocument;
use crate::error::Result;

/// Where a mutation watch is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchScope {
	/// The connections panel container.
	Panel,
	/// The whole document body, used until the panel shows up.
	Document,
}

/// Live watch on structural changes. Detaches on `unsubscribe` or drop.
#[must_use = "dropping a subscription detaches the watch"]
pub struct Subscription {
	detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	pub fn new(detach: impl FnOnce() + 'static) -> Self {
		Self {
			detach: Some(Box::new(detach)),
		}
	}

	/// A subscription with nothing to detach.
	pub fn none() -> Self {
		Self { detach: None }
	}

	pub fn unsubscribe(mut self) {
		self.detach_now();
	}

	fn detach_now(&mut self) {
		if let Some(detach) = self.detach.take() {
			detach();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.detach_now();
	}
}

pub trait MutationSource {
	/// Calls `on_change` after structural changes (child list, whole subtree) in `scope`.
	fn subscribe(&self, scope: WatchScope, on_change: Rc<dyn Fn()>) -> Subscription;
}

pub trait ActiveDocumentProvider {
	/// `None` when no document is focused, which is a normal state.
	fn active_document(&self) -> Option<ActiveDocument>;
}

pub trait Navigator {
	/// Resolves `id` as a link path. `Ok(None)` means no match.
	fn resolve(&self, id: &str) -> Result<Option<String>>;
	/// Opens `text` as literal link text.
	fn open_link_text(&self, text: &str);
}

/// Opens a node: resolved path first, literal id when resolution fails or finds nothing.
pub fn navigate(navigator: &dyn Navigator, id: &str) {
	match navigator.resolve(id) {
		Ok(Some(path)) => navigator.open_link_text(&path),
		Ok(None) => navigator.open_link_text(id),
		Err(err) => {
			debug!("link resolution for {id:?} failed: {err}");
			navigator.open_link_text(id);
		}
	}
}

/// Per-view drawing host.
pub trait Surface {
	/// Live container width, if it has one.
	fn width(&self) -> Option<f64>;
	fn show_empty(&mut self, message: &str);
	/// Creates the drawing surface. `on_click` receives surface-local coordinates.
	///
	/// On error nothing is left mounted.
	fn mount(&mut self, width: f64, height: f64, on_click: Rc<dyn Fn(f64, f64)>) -> Result<()>;
	fn paint(&mut self, scene: &Scene);
	/// Removes the drawing surface and any empty-state message.
	fn clear(&mut self);
}

/// Shared host capabilities, cloned into each view.
#[derive(Clone)]
pub struct Host {
	pub suggestions: Rc<dyn SuggestionSource>,
	pub documents: Rc<dyn ActiveDocumentProvider>,
	pub mutations: Rc<dyn MutationSource>,
	pub frames: Rc<dyn FrameScheduler>,
	pub navigator: Rc<dyn Navigator>,
}
