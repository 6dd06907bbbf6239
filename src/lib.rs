//! Force-directed graph of the notes a connections panel suggests for the focused document.
//!
//! The panel belongs to another plugin, so its suggestions are scraped from the DOM, turned into
//! a star graph around the active document, laid out with a small force simulation and drawn on
//! a canvas. The view rebuilds itself when the panel changes or the host focuses another note.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{Level, info};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

pub mod components;
pub mod config;
pub mod error;

use crate::components::connection_graph::web::JsNavigator;
use crate::components::connection_graph::{ActiveDocument, ConnectionGraphView, Navigator};
use crate::config::ViewConfig;

/// Initialize logging and panic hooks for the WASM target.
#[wasm_bindgen(start)]
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// A mounted graph view, driven from JS.
#[wasm_bindgen]
pub struct GraphViewHandle {
	active: RwSignal<Option<ActiveDocument>>,
	mount: Box<dyn Any>,
}

#[wasm_bindgen]
impl GraphViewHandle {
	/// Reports the focused document; pass `undefined` for both when nothing is focused.
	pub fn set_active_document(&self, path: Option<String>, basename: Option<String>) {
		let document = path.map(|path| ActiveDocument {
			basename: basename.unwrap_or_else(|| default_basename(&path)),
			path,
		});
		self.active.set(document);
	}

	/// Rebuilds the graph right away.
	pub fn refresh(&self) {
		self.active.update(|_| {});
	}

	/// Unmounts the view, stopping the layout and the panel watch.
	pub fn close(self) {
		drop(self.mount);
		info!("graph view handle closed");
	}
}

/// File name without directories or a trailing `.md`.
fn default_basename(path: &str) -> String {
	let name = path.rsplit('/').next().unwrap_or(path);
	let cut = name.len().saturating_sub(3);
	match name.get(cut..) {
		Some(ext) if ext.eq_ignore_ascii_case(".md") => name[..cut].to_string(),
		_ => name.to_string(),
	}
}

/// Mounts a graph view into `container`.
///
/// `host` must expose `openLinkText(text)` and may expose `resolveLinkpath(id)`, returning a
/// path or nothing. `config` is an optional JSON settings blob.
#[wasm_bindgen]
pub fn open_connection_graph(
	container: HtmlElement,
	host: JsValue,
	config: Option<String>,
) -> Result<GraphViewHandle, JsValue> {
	let config = ViewConfig::from_json(config.as_deref().unwrap_or(""))
		.map_err(|err| JsValue::from_str(&err.to_string()))?;
	let navigator: Rc<dyn Navigator> = Rc::new(JsNavigator::new(host));

	let slot = Rc::new(Cell::new(None::<RwSignal<Option<ActiveDocument>>>));
	let mount = leptos::mount::mount_to(container, {
		let slot = slot.clone();
		move || {
			let active = RwSignal::new(None::<ActiveDocument>);
			slot.set(Some(active));
			view! { <ConnectionGraphView active=active navigator=navigator config=config /> }
		}
	});
	let active = slot
		.get()
		.ok_or_else(|| JsValue::from_str("graph view did not mount"))?;

	Ok(GraphViewHandle {
		active,
		mount: Box::new(mount),
	})
}
