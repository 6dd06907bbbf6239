//! Open/close lifecycle of one graph view and the rebuilds it triggers.
//!
//! A view is either closed or open. While open it rebuilds the whole pipeline (extract, build,
//! lay out, draw) on three occasions: once on opening, immediately when the host reports a new
//! active document, and at the next frame after the connections panel mutates. Mutations that
//! arrive before that frame are folded into the same rebuild.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, info, trace, warn};

use super::build::build_data;
use super::host::{Host, Subscription, Surface, WatchScope, navigate};
use super::layout::{LayoutEngine, Simulation};
use super::render::Scene;
use super::schedule::CoalescedDispatch;
use super::types::Point;
use crate::config::ViewConfig;

struct OpenView {
	subscription: Subscription,
	dispatch: Rc<CoalescedDispatch>,
	engine: Option<LayoutEngine>,
}

enum Phase {
	Closed,
	Open(OpenView),
}

struct ViewState {
	host: Host,
	config: ViewConfig,
	surface: Rc<RefCell<Box<dyn Surface>>>,
	phase: Phase,
	rebuilds: usize,
}

/// One graph view. Views never share state with each other.
pub struct GraphView {
	state: Rc<RefCell<ViewState>>,
}

impl GraphView {
	pub fn new(host: Host, surface: Box<dyn Surface>, config: ViewConfig) -> Self {
		Self {
			state: Rc::new(RefCell::new(ViewState {
				host,
				config,
				surface: Rc::new(RefCell::new(surface)),
				phase: Phase::Closed,
				rebuilds: 0,
			})),
		}
	}

	pub fn is_open(&self) -> bool {
		matches!(self.state.borrow().phase, Phase::Open(_))
	}

	/// Rebuilds performed since the view was created.
	pub fn rebuild_count(&self) -> usize {
		self.state.borrow().rebuilds
	}

	/// Whether the layout is still ticking.
	pub fn is_animating(&self) -> bool {
		match &self.state.borrow().phase {
			Phase::Open(open) => open.engine.as_ref().is_some_and(LayoutEngine::is_running),
			Phase::Closed => false,
		}
	}

	/// Draws the graph once and starts watching the panel.
	pub fn open(&self) {
		if self.is_open() {
			trace!("graph view already open");
			return;
		}

		let weak = Rc::downgrade(&self.state);
		let frames = self.state.borrow().host.frames.clone();
		let dispatch = Rc::new(CoalescedDispatch::new(
			frames,
			Rc::new(move || {
				if let Some(state) = weak.upgrade() {
					rebuild(&state);
				}
			}),
		));

		self.state.borrow_mut().phase = Phase::Open(OpenView {
			subscription: Subscription::none(),
			dispatch: dispatch.clone(),
			engine: None,
		});
		rebuild(&self.state);

		let (suggestions, mutations) = {
			let state = self.state.borrow();
			(state.host.suggestions.clone(), state.host.mutations.clone())
		};
		let scope = if suggestions.panel_present() {
			WatchScope::Panel
		} else {
			WatchScope::Document
		};
		let weak_dispatch: Weak<CoalescedDispatch> = Rc::downgrade(&dispatch);
		let subscription = mutations.subscribe(
			scope,
			Rc::new(move || {
				if let Some(dispatch) = weak_dispatch.upgrade() {
					dispatch.signal();
				}
			}),
		);
		if let Phase::Open(open) = &mut self.state.borrow_mut().phase {
			open.subscription = subscription;
		}
		info!("graph view opened, watching {scope:?}");
	}

	/// Host signal that the focused document changed. Rebuilds right away.
	pub fn active_document_changed(&self) {
		rebuild(&self.state);
	}

	pub fn refresh(&self) {
		rebuild(&self.state);
	}

	/// Detaches the watch, stops the layout and removes the drawing, in that order.
	pub fn close(&self) {
		let phase = std::mem::replace(&mut self.state.borrow_mut().phase, Phase::Closed);
		let Phase::Open(open) = phase else {
			return;
		};
		open.subscription.unsubscribe();
		open.dispatch.cancel();
		if let Some(engine) = open.engine {
			engine.stop();
		}
		let surface = self.state.borrow().surface.clone();
		surface.borrow_mut().clear();
		info!("graph view closed");
	}
}

impl Drop for GraphView {
	fn drop(&mut self) {
		self.close();
	}
}

fn rebuild(state: &Rc<RefCell<ViewState>>) {
	let mut guard = state.borrow_mut();
	let ViewState {
		host,
		config,
		surface,
		phase,
		rebuilds,
	} = &mut *guard;
	let Phase::Open(open) = phase else {
		trace!("rebuild skipped: view is closed");
		return;
	};
	if let Some(engine) = open.engine.take() {
		engine.stop();
	}

	let suggestions = host.suggestions.extract();
	let active = host.documents.active_document();
	let data = build_data(active.as_ref(), &suggestions);
	*rebuilds += 1;
	debug!(
		"rebuild #{}: {} nodes, {} links",
		rebuilds,
		data.nodes.len(),
		data.links.len()
	);

	let mut drawing = surface.borrow_mut();
	drawing.clear();
	let width = drawing
		.width()
		.filter(|w| *w > 0.0)
		.unwrap_or(config.default_width);
	let scene = Scene::compose(&data, width, config);
	if scene.is_empty() {
		drawing.show_empty(&config.empty_message);
		return;
	}

	let scene = Rc::new(RefCell::new(scene));
	let navigator = host.navigator.clone();
	let clicked = Rc::downgrade(&scene);
	let mounted = drawing.mount(
		width,
		config.height,
		Rc::new(move |x: f64, y: f64| {
			let Some(scene) = clicked.upgrade() else {
				return;
			};
			let id = scene.borrow().node_at(x, y).map(str::to_owned);
			if let Some(id) = id {
				navigate(navigator.as_ref(), &id);
			}
		}),
	);
	if let Err(err) = mounted {
		warn!("could not create drawing surface: {err}");
		drawing.show_empty(&config.empty_message);
		return;
	}

	let sim = Simulation::new(&data, width, config.height, &config.layout);
	let (projected, painted) = (scene.clone(), Rc::downgrade(surface));
	let engine = LayoutEngine::new(
		sim,
		host.frames.clone(),
		Box::new(move |positions: &[Point]| {
			projected.borrow_mut().project(positions);
			if let Some(surface) = painted.upgrade() {
				surface.borrow_mut().paint(&projected.borrow());
			}
		}),
	);

	scene.borrow_mut().project(&engine.positions());
	drawing.paint(&scene.borrow());
	engine.start();
	open.engine = Some(engine);
}
