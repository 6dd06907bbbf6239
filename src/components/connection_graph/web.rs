//! Browser bindings for the host capabilities.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use log::{debug, trace, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement, MouseEvent,
	MutationObserver, MutationObserverInit, MutationRecord, Node, Window,
};

use super::extract::{Extractor, PanelDom};
use super::host::{
	ActiveDocumentProvider, Host, MutationSource, Navigator, Subscription, Surface, WatchScope,
};
use super::observer::GraphView;
use super::render::{self, Scene};
use super::schedule::{FrameId, FrameScheduler, FrameSlots};
use crate::config::{Selectors, ViewConfig};
use crate::error::{Error, Result};

/// Live document read through `querySelector`.
pub struct WebDom {
	document: Document,
}

impl WebDom {
	pub fn new(document: Document) -> Self {
		Self { document }
	}
}

impl PanelDom for WebDom {
	type Element = Element;

	fn query(&self, selector: &str) -> Option<Element> {
		self.document.query_selector(selector).ok().flatten()
	}

	fn query_within(&self, scope: &Element, selector: &str) -> Option<Element> {
		scope.query_selector(selector).ok().flatten()
	}

	fn query_all_within(&self, scope: &Element, selector: &str) -> Vec<Element> {
		let Ok(list) = scope.query_selector_all(selector) else {
			trace!("selector {selector:?} rejected by the browser");
			return Vec::new();
		};
		(0..list.length())
			.filter_map(|i| list.get(i))
			.filter_map(|node| node.dyn_into::<Element>().ok())
			.collect()
	}

	fn text(&self, element: &Element) -> String {
		element.text_content().unwrap_or_default()
	}

	fn attribute(&self, element: &Element, name: &str) -> Option<String> {
		element.get_attribute(name)
	}

	fn is_link(&self, element: &Element) -> bool {
		element.tag_name().eq_ignore_ascii_case("a")
	}
}

type FrameCallback = Closure<dyn FnMut()>;

/// `requestAnimationFrame`-backed scheduler.
pub struct AnimationFrames {
	window: Window,
	slots: Rc<RefCell<FrameSlots<FrameCallback>>>,
}

impl AnimationFrames {
	pub fn new(window: Window) -> Self {
		Self {
			window,
			slots: Rc::new(RefCell::new(FrameSlots::default())),
		}
	}
}

impl FrameScheduler for AnimationFrames {
	fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameId {
		let handle = Rc::new(Cell::new(None::<i32>));
		let (slots, fired) = (Rc::downgrade(&self.slots), handle.clone());
		let mut callback = Some(callback);
		let closure = FrameCallback::new(move || {
			if let (Some(slots), Some(id)) = (slots.upgrade(), fired.get()) {
				let released = slots.borrow_mut().fired(id);
				drop(released);
			}
			if let Some(callback) = callback.take() {
				callback();
			}
		});

		match self
			.window
			.request_animation_frame(closure.as_ref().unchecked_ref())
		{
			Ok(id) => {
				handle.set(Some(id));
				self.slots.borrow_mut().hold(id, closure);
				FrameId(id as u64)
			}
			Err(err) => {
				warn!("requestAnimationFrame failed: {err:?}");
				FrameId(0)
			}
		}
	}

	fn cancel_frame(&self, id: FrameId) {
		let handle = id.0 as i32;
		let _ = self.window.cancel_animation_frame(handle);
		let cancelled = self.slots.borrow_mut().cancel(handle);
		drop(cancelled);
	}
}

impl Drop for AnimationFrames {
	fn drop(&mut self) {
		let pending = self.slots.borrow().pending_handles();
		for handle in pending {
			let _ = self.window.cancel_animation_frame(handle);
		}
	}
}

/// `MutationObserver` over the panel, or over `<body>` until the panel exists.
pub struct WebMutations {
	document: Document,
	selectors: Selectors,
	/// Changes confined to this subtree (the view's own drawing) are ignored.
	own: Option<Node>,
}

impl WebMutations {
	pub fn new(document: Document, selectors: Selectors, own: Option<Node>) -> Self {
		Self {
			document,
			selectors,
			own,
		}
	}

	fn target(&self, scope: WatchScope) -> Option<Node> {
		let panel = match scope {
			WatchScope::Panel => self
				.selectors
				.container
				.iter()
				.find_map(|s| self.document.query_selector(s).ok().flatten()),
			WatchScope::Document => None,
		};
		panel
			.map(Node::from)
			.or_else(|| self.document.body().map(Node::from))
	}

	fn observe(&self, target: &Node, on_change: Rc<dyn Fn()>) -> Result<Subscription> {
		let own = self.own.clone();
		let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
			move |records: Array, _: MutationObserver| {
				let foreign = records.iter().any(|record| {
					let target = record
						.dyn_into::<MutationRecord>()
						.ok()
						.and_then(|r| r.target());
					match (&own, target) {
						(Some(own), Some(target)) => !own.contains(Some(&target)),
						_ => true,
					}
				});
				if foreign {
					on_change();
				}
			},
		);
		let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
		let init = MutationObserverInit::new();
		init.set_child_list(true);
		init.set_subtree(true);
		observer.observe_with_options(target, &init)?;

		Ok(Subscription::new(move || {
			observer.disconnect();
			drop(callback);
		}))
	}
}

impl MutationSource for WebMutations {
	fn subscribe(&self, scope: WatchScope, on_change: Rc<dyn Fn()>) -> Subscription {
		let Some(target) = self.target(scope) else {
			warn!("nothing to observe for {scope:?}");
			return Subscription::none();
		};
		self.observe(&target, on_change).unwrap_or_else(|err| {
			warn!("could not attach mutation observer: {err}");
			Subscription::none()
		})
	}
}

struct Canvas {
	element: HtmlCanvasElement,
	ctx: CanvasRenderingContext2d,
	listener: Closure<dyn FnMut(MouseEvent)>,
}

/// Draws into a `<canvas>` appended to the view container.
pub struct CanvasSurface {
	container: HtmlElement,
	canvas: Option<Canvas>,
	empty: Option<Element>,
}

impl CanvasSurface {
	pub fn new(container: HtmlElement) -> Self {
		Self {
			container,
			canvas: None,
			empty: None,
		}
	}

	fn document(&self) -> Result<Document> {
		self.container
			.owner_document()
			.ok_or_else(|| Error::Js("container is detached".into()))
	}

	fn try_mount(&mut self, width: f64, height: f64, on_click: Rc<dyn Fn(f64, f64)>) -> Result<()> {
		let element: HtmlCanvasElement = self
			.document()?
			.create_element("canvas")?
			.dyn_into()
			.map_err(|_| Error::Js("created element is not a canvas".into()))?;
		element.set_width(width as u32);
		element.set_height(height as u32);
		element.set_class_name("connection-graph-canvas");

		let ctx: CanvasRenderingContext2d = element
			.get_context("2d")?
			.ok_or_else(|| Error::Js("2d context unavailable".into()))?
			.dyn_into()
			.map_err(|_| Error::Js("unexpected 2d context type".into()))?;

		let target = element.clone();
		let listener = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
			let rect = target.get_bounding_client_rect();
			on_click(
				ev.client_x() as f64 - rect.left(),
				ev.client_y() as f64 - rect.top(),
			);
		});
		element.add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())?;
		self.container.append_child(&element)?;

		self.canvas = Some(Canvas {
			element,
			ctx,
			listener,
		});
		Ok(())
	}

	fn try_show_empty(&mut self, message: &str) -> Result<()> {
		let div = self.document()?.create_element("div")?;
		div.set_class_name("empty-state");
		div.set_text_content(Some(message));
		self.container.append_child(&div)?;
		self.empty = Some(div);
		Ok(())
	}
}

impl Surface for CanvasSurface {
	fn width(&self) -> Option<f64> {
		Some(self.container.client_width() as f64).filter(|w| *w > 0.0)
	}

	fn show_empty(&mut self, message: &str) {
		if let Err(err) = self.try_show_empty(message) {
			warn!("could not show empty state: {err}");
		}
	}

	fn mount(&mut self, width: f64, height: f64, on_click: Rc<dyn Fn(f64, f64)>) -> Result<()> {
		self.try_mount(width, height, on_click)
	}

	fn paint(&mut self, scene: &Scene) {
		if let Some(canvas) = &self.canvas {
			render::paint(scene, &canvas.ctx);
		}
	}

	fn clear(&mut self) {
		if let Some(canvas) = self.canvas.take() {
			let _ = canvas
				.element
				.remove_event_listener_with_callback("click", canvas.listener.as_ref().unchecked_ref());
			canvas.element.remove();
		}
		if let Some(empty) = self.empty.take() {
			empty.remove();
		}
	}
}

/// Navigation through a JS host object exposing `resolveLinkpath(id)` and `openLinkText(text)`.
pub struct JsNavigator {
	host: JsValue,
}

impl JsNavigator {
	pub fn new(host: JsValue) -> Self {
		Self { host }
	}

	fn method(&self, name: &str) -> Option<Function> {
		Reflect::get(&self.host, &JsValue::from_str(name))
			.ok()
			.and_then(|f| f.dyn_into::<Function>().ok())
	}
}

impl Navigator for JsNavigator {
	fn resolve(&self, id: &str) -> Result<Option<String>> {
		let Some(resolve) = self.method("resolveLinkpath") else {
			return Ok(None);
		};
		let resolved = resolve
			.call1(&self.host, &JsValue::from_str(id))
			.map_err(|err| Error::Navigation(format!("{err:?}")))?;
		Ok(resolved.as_string().filter(|path| !path.is_empty()))
	}

	fn open_link_text(&self, text: &str) {
		let Some(open) = self.method("openLinkText") else {
			warn!("host has no openLinkText");
			return;
		};
		if let Err(err) = open.call1(&self.host, &JsValue::from_str(text)) {
			warn!("openLinkText({text:?}) threw: {err:?}");
		}
	}
}

/// Wires browser capabilities around `container` and opens a view in it.
pub fn open_in(
	container: HtmlElement,
	documents: Rc<dyn ActiveDocumentProvider>,
	navigator: Rc<dyn Navigator>,
	config: &ViewConfig,
) -> Result<GraphView> {
	let window = web_sys::window().ok_or_else(|| Error::Js("no window".into()))?;
	let document = window
		.document()
		.ok_or_else(|| Error::Js("no document".into()))?;

	let host = Host {
		suggestions: Rc::new(Extractor::new(
			WebDom::new(document.clone()),
			config.selectors.clone(),
		)),
		documents,
		mutations: Rc::new(WebMutations::new(
			document,
			config.selectors.clone(),
			Some(container.clone().into()),
		)),
		frames: Rc::new(AnimationFrames::new(window)),
		navigator,
	};
	let view = GraphView::new(host, Box::new(CanvasSurface::new(container)), config.clone());
	view.open();
	debug!("graph view mounted");
	Ok(view)
}
