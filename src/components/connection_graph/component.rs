use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use send_wrapper::SendWrapper;
use web_sys::HtmlElement;

use super::host::{ActiveDocumentProvider, Navigator};
use super::observer::GraphView;
use super::types::ActiveDocument;
use super::web;
use crate::config::ViewConfig;

/// Active document read from a reactive signal.
struct SignalDocuments(Signal<Option<ActiveDocument>>);

impl ActiveDocumentProvider for SignalDocuments {
	fn active_document(&self) -> Option<ActiveDocument> {
		self.0.get_untracked()
	}
}

/// Sidebar view drawing the connection graph for `active`.
///
/// Mounting opens the view, every change of `active` rebuilds it, and unmounting closes it.
#[component]
pub fn ConnectionGraphView(
	#[prop(into)] active: Signal<Option<ActiveDocument>>,
	navigator: Rc<dyn Navigator>,
	#[prop(optional)] config: ViewConfig,
) -> impl IntoView {
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let graph: Rc<RefCell<Option<GraphView>>> = Rc::new(RefCell::new(None));

	let graph_cleanup = SendWrapper::new(graph.clone());
	on_cleanup(move || {
		if let Some(graph) = graph_cleanup.borrow_mut().take() {
			graph.close();
		}
	});

	Effect::new(move |_| {
		active.track();
		let Some(container) = container_ref.get() else {
			return;
		};

		if let Some(graph) = graph.borrow().as_ref() {
			graph.active_document_changed();
			return;
		}
		let container: HtmlElement = container.into();
		match web::open_in(
			container,
			Rc::new(SignalDocuments(active)),
			navigator.clone(),
			&config,
		) {
			Ok(opened) => *graph.borrow_mut() = Some(opened),
			Err(err) => warn!("connection graph unavailable: {err}"),
		}
	});

	view! { <div node_ref=container_ref class="connection-graph-view" /> }
}
