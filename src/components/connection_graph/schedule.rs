//! Frame-boundary scheduling and change coalescing.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

/// Handle for a frame callback that can still be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// Runs callbacks at the next paint/frame boundary.
///
/// Implementations must never invoke the callback synchronously from `request_frame`.
pub trait FrameScheduler {
	fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameId;
	/// Drops a pending callback. Unknown or already-fired ids are ignored.
	fn cancel_frame(&self, id: FrameId);
}

/// Merges any number of change signals into at most one dispatch per frame window.
///
/// Bursts landing in separate windows still dispatch once each.
pub struct CoalescedDispatch {
	frames: Rc<dyn FrameScheduler>,
	pending: Rc<Cell<Option<FrameId>>>,
	action: Rc<dyn Fn()>,
}

impl CoalescedDispatch {
	pub fn new(frames: Rc<dyn FrameScheduler>, action: Rc<dyn Fn()>) -> Self {
		Self {
			frames,
			pending: Rc::new(Cell::new(None)),
			action,
		}
	}

	/// Returns `false` when the signal was folded into an already pending dispatch.
	pub fn signal(&self) -> bool {
		if self.pending.get().is_some() {
			trace!("change coalesced into pending dispatch");
			return false;
		}
		let (pending, action) = (self.pending.clone(), self.action.clone());
		let id = self.frames.request_frame(Box::new(move || {
			pending.set(None);
			action();
		}));
		self.pending.set(Some(id));
		true
	}

	pub fn is_pending(&self) -> bool {
		self.pending.get().is_some()
	}

	pub fn cancel(&self) {
		if let Some(id) = self.pending.take() {
			self.frames.cancel_frame(id);
		}
	}
}

/// Frame callbacks handed to the browser, owned here until they fire or are cancelled.
///
/// A callback that fires is parked rather than dropped, since it is still running; it is released
/// when the next callback fires or the slots are cleared.
pub struct FrameSlots<C> {
	live: HashMap<i32, C>,
	parked: Vec<C>,
}

impl<C> Default for FrameSlots<C> {
	fn default() -> Self {
		Self {
			live: HashMap::new(),
			parked: Vec::new(),
		}
	}
}

impl<C> FrameSlots<C> {
	pub fn hold(&mut self, handle: i32, callback: C) {
		self.live.insert(handle, callback);
	}

	/// Parks the callback behind `handle` and returns the ones parked before it.
	pub fn fired(&mut self, handle: i32) -> Vec<C> {
		let released = std::mem::take(&mut self.parked);
		if let Some(callback) = self.live.remove(&handle) {
			self.parked.push(callback);
		}
		released
	}

	pub fn cancel(&mut self, handle: i32) -> Option<C> {
		self.live.remove(&handle)
	}

	/// Handles still waiting for their frame.
	pub fn pending_handles(&self) -> Vec<i32> {
		self.live.keys().copied().collect()
	}

	pub fn len(&self) -> usize {
		self.live.len() + self.parked.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
