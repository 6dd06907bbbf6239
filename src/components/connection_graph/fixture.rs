//! In-memory stand-ins for the browser, shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::extract::PanelDom;
use super::host::{ActiveDocumentProvider, MutationSource, Navigator, Subscription, Surface, WatchScope};
use super::render::Scene;
use super::schedule::{FrameId, FrameScheduler};
use super::types::ActiveDocument;
use crate::error::{Error, Result};

/// Element description used to build fixture trees.
#[derive(Clone, Debug, Default)]
pub struct El {
	tag: String,
	classes: Vec<String>,
	attrs: Vec<(String, String)>,
	text: String,
	children: Vec<El>,
}

pub fn el(tag: &str) -> El {
	El {
		tag: tag.into(),
		..El::default()
	}
}

impl El {
	pub fn class(mut self, class: &str) -> Self {
		self.classes.push(class.into());
		self
	}

	pub fn attr(mut self, name: &str, value: &str) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	pub fn text(mut self, text: &str) -> Self {
		self.text = text.into();
		self
	}

	pub fn child(mut self, child: El) -> Self {
		self.children.push(child);
		self
	}
}

#[derive(Debug)]
struct Node {
	tag: String,
	classes: Vec<String>,
	attrs: Vec<(String, String)>,
	text: String,
	children: Vec<usize>,
	parent: Option<usize>,
}

/// Arena-backed element tree. Clones share the same tree so tests can mutate it after handing
/// it to an extractor.
#[derive(Clone, Debug)]
pub struct FixtureDom {
	nodes: Rc<RefCell<Vec<Node>>>,
}

impl FixtureDom {
	pub fn new(root: El) -> Self {
		let mut nodes = Vec::new();
		insert(&mut nodes, None, root);
		Self {
			nodes: Rc::new(RefCell::new(nodes)),
		}
	}

	pub fn root(&self) -> usize {
		0
	}

	/// Appends `el` as the last child of `parent` and returns its index.
	pub fn append(&self, parent: usize, el: El) -> usize {
		insert(&mut self.nodes.borrow_mut(), Some(parent), el)
	}

	fn matching(&self, candidates: Vec<usize>, selector: &str) -> Vec<usize> {
		let compounds = parse_selector(selector);
		let nodes = self.nodes.borrow();
		candidates
			.into_iter()
			.filter(|&idx| matches(&nodes, idx, &compounds))
			.collect()
	}

	fn descendants(&self, scope: usize) -> Vec<usize> {
		let mut out = Vec::new();
		collect_descendants(&self.nodes.borrow(), scope, &mut out);
		out
	}
}

fn insert(nodes: &mut Vec<Node>, parent: Option<usize>, el: El) -> usize {
	let El {
		tag,
		classes,
		attrs,
		text,
		children,
	} = el;
	let idx = nodes.len();
	nodes.push(Node {
		tag,
		classes,
		attrs,
		text,
		children: Vec::new(),
		parent,
	});
	if let Some(parent) = parent {
		nodes[parent].children.push(idx);
	}
	for child in children {
		insert(nodes, Some(idx), child);
	}
	idx
}

fn collect_descendants(nodes: &[Node], scope: usize, out: &mut Vec<usize>) {
	for &child in &nodes[scope].children {
		out.push(child);
		collect_descendants(nodes, child, out);
	}
}

fn collect_text(nodes: &[Node], idx: usize, out: &mut String) {
	out.push_str(&nodes[idx].text);
	for &child in &nodes[idx].children {
		collect_text(nodes, child, out);
	}
}

/// One whitespace-separated part of a selector: `tag.class[attr="value"]`.
#[derive(Debug, Default)]
struct Compound {
	tag: Option<String>,
	classes: Vec<String>,
	attrs: Vec<(String, Option<String>)>,
}

impl Compound {
	fn matches(&self, node: &Node) -> bool {
		self.tag.as_ref().is_none_or(|tag| tag.eq_ignore_ascii_case(&node.tag))
			&& self.classes.iter().all(|c| node.classes.contains(c))
			&& self.attrs.iter().all(|(name, value)| {
				node.attrs
					.iter()
					.any(|(n, v)| n == name && value.as_ref().is_none_or(|want| want == v))
			})
	}
}

fn parse_selector(selector: &str) -> Vec<Compound> {
	selector.split_whitespace().map(parse_compound).collect()
}

fn parse_compound(raw: &str) -> Compound {
	let boundary = |c: char| c == '.' || c == '[';
	let mut compound = Compound::default();

	let end = raw.find(boundary).unwrap_or(raw.len());
	if end > 0 {
		compound.tag = Some(raw[..end].to_string());
	}
	let mut rest = &raw[end..];
	while !rest.is_empty() {
		if let Some(r) = rest.strip_prefix('.') {
			let end = r.find(boundary).unwrap_or(r.len());
			compound.classes.push(r[..end].to_string());
			rest = &r[end..];
		} else if let Some(r) = rest.strip_prefix('[') {
			let end = r.find(']').unwrap_or(r.len());
			let inner = &r[..end];
			compound.attrs.push(match inner.split_once('=') {
				Some((name, value)) => (name.into(), Some(value.trim_matches('"').into())),
				None => (inner.into(), None),
			});
			rest = r.get(end + 1..).unwrap_or("");
		} else {
			break;
		}
	}
	compound
}

/// Descendant-combinator matching: the last compound must match `idx`, the rest some chain of
/// its ancestors.
fn matches(nodes: &[Node], idx: usize, compounds: &[Compound]) -> bool {
	let Some((last, mut remaining)) = compounds.split_last() else {
		return false;
	};
	if !last.matches(&nodes[idx]) {
		return false;
	}
	let mut cursor = nodes[idx].parent;
	while let Some((want, rest)) = remaining.split_last() {
		loop {
			let Some(parent) = cursor else {
				return false;
			};
			cursor = nodes[parent].parent;
			if want.matches(&nodes[parent]) {
				break;
			}
		}
		remaining = rest;
	}
	true
}

impl PanelDom for FixtureDom {
	type Element = usize;

	fn query(&self, selector: &str) -> Option<usize> {
		let mut candidates = vec![self.root()];
		candidates.extend(self.descendants(self.root()));
		self.matching(candidates, selector).into_iter().next()
	}

	fn query_within(&self, scope: &usize, selector: &str) -> Option<usize> {
		self.query_all_within(scope, selector).into_iter().next()
	}

	fn query_all_within(&self, scope: &usize, selector: &str) -> Vec<usize> {
		self.matching(self.descendants(*scope), selector)
	}

	fn text(&self, element: &usize) -> String {
		let mut out = String::new();
		collect_text(&self.nodes.borrow(), *element, &mut out);
		out
	}

	fn attribute(&self, element: &usize, name: &str) -> Option<String> {
		self.nodes.borrow()[*element]
			.attrs
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v.clone())
	}

	fn is_link(&self, element: &usize) -> bool {
		self.nodes.borrow()[*element].tag.eq_ignore_ascii_case("a")
	}
}

/// Frame queue advanced by hand.
#[derive(Default)]
pub struct ManualFrames {
	next: Cell<u64>,
	queue: RefCell<Vec<(FrameId, Box<dyn FnOnce()>)>>,
	cancelled: RefCell<HashSet<FrameId>>,
}

impl ManualFrames {
	pub fn pending(&self) -> usize {
		self.queue.borrow().len()
	}

	/// Runs every callback queued before this call. Returns how many ran.
	pub fn run_frame(&self) -> usize {
		let batch = std::mem::take(&mut *self.queue.borrow_mut());
		let mut ran = 0;
		for (id, callback) in batch {
			if self.cancelled.borrow_mut().remove(&id) {
				continue;
			}
			callback();
			ran += 1;
		}
		ran
	}

	/// Runs frames until nothing is queued or `max_frames` is reached.
	pub fn run_until_idle(&self, max_frames: usize) -> usize {
		let mut ran = 0;
		for _ in 0..max_frames {
			if self.pending() == 0 {
				break;
			}
			ran += self.run_frame();
		}
		ran
	}
}

impl FrameScheduler for ManualFrames {
	fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameId {
		let id = FrameId(self.next.get());
		self.next.set(id.0 + 1);
		self.queue.borrow_mut().push((id, callback));
		id
	}

	fn cancel_frame(&self, id: FrameId) {
		let mut queue = self.queue.borrow_mut();
		let before = queue.len();
		queue.retain(|(queued, _)| *queued != id);
		if queue.len() == before {
			// Possibly in the batch currently being run.
			self.cancelled.borrow_mut().insert(id);
		}
	}
}

type Watchers = Rc<RefCell<Vec<(usize, Rc<dyn Fn()>)>>>;

/// Mutation source whose changes are fired by the test.
#[derive(Default)]
pub struct FixtureMutations {
	watchers: Watchers,
	history: RefCell<Vec<WatchScope>>,
	next: Cell<usize>,
}

impl FixtureMutations {
	pub fn fire(&self) {
		let callbacks: Vec<_> = self.watchers.borrow().iter().map(|(_, cb)| cb.clone()).collect();
		for callback in callbacks {
			callback();
		}
	}

	/// Watches currently attached.
	pub fn active(&self) -> usize {
		self.watchers.borrow().len()
	}

	/// Scope of every subscription ever made, oldest first.
	pub fn scopes(&self) -> Vec<WatchScope> {
		self.history.borrow().clone()
	}
}

impl MutationSource for FixtureMutations {
	fn subscribe(&self, scope: WatchScope, on_change: Rc<dyn Fn()>) -> Subscription {
		let id = self.next.get();
		self.next.set(id + 1);
		self.history.borrow_mut().push(scope);
		self.watchers.borrow_mut().push((id, on_change));
		let watchers = self.watchers.clone();
		Subscription::new(move || watchers.borrow_mut().retain(|(w, _)| *w != id))
	}
}

pub struct FixedDocuments {
	current: RefCell<Option<ActiveDocument>>,
}

impl FixedDocuments {
	pub fn new(current: Option<ActiveDocument>) -> Self {
		Self {
			current: RefCell::new(current),
		}
	}

	pub fn set(&self, current: Option<ActiveDocument>) {
		*self.current.borrow_mut() = current;
	}
}

impl ActiveDocumentProvider for FixedDocuments {
	fn active_document(&self) -> Option<ActiveDocument> {
		self.current.borrow().clone()
	}
}

#[derive(Default)]
pub struct RecordingNavigator {
	links: HashMap<String, String>,
	fail: bool,
	opened: RefCell<Vec<String>>,
}

impl RecordingNavigator {
	pub fn with_link(mut self, id: &str, path: &str) -> Self {
		self.links.insert(id.into(), path.into());
		self
	}

	/// Makes every resolution attempt error out.
	pub fn failing(mut self) -> Self {
		self.fail = true;
		self
	}

	pub fn opened(&self) -> Vec<String> {
		self.opened.borrow().clone()
	}
}

impl Navigator for RecordingNavigator {
	fn resolve(&self, id: &str) -> Result<Option<String>> {
		if self.fail {
			return Err(Error::Navigation(format!("cannot resolve {id}")));
		}
		Ok(self.links.get(id).cloned())
	}

	fn open_link_text(&self, text: &str) {
		self.opened.borrow_mut().push(text.into());
	}
}

#[derive(Default)]
pub struct SurfaceRecord {
	pub mounted: bool,
	pub mounted_size: Option<(f64, f64)>,
	pub empty_message: Option<String>,
	pub paints: usize,
	pub last_scene: Option<Scene>,
	pub on_click: Option<Rc<dyn Fn(f64, f64)>>,
}

pub type SurfaceLog = Rc<RefCell<SurfaceRecord>>;

/// Surface that records what it was asked to draw.
pub struct RecordingSurface {
	width: Option<f64>,
	log: SurfaceLog,
	broken: bool,
}

impl RecordingSurface {
	pub fn new(width: Option<f64>) -> (Self, SurfaceLog) {
		let log = SurfaceLog::default();
		(
			Self {
				width,
				log: log.clone(),
				broken: false,
			},
			log,
		)
	}

	/// Every `mount` fails, like a canvas without a 2d context.
	pub fn broken(mut self) -> Self {
		self.broken = true;
		self
	}
}

impl Surface for RecordingSurface {
	fn width(&self) -> Option<f64> {
		self.width
	}

	fn show_empty(&mut self, message: &str) {
		self.log.borrow_mut().empty_message = Some(message.into());
	}

	fn mount(&mut self, width: f64, height: f64, on_click: Rc<dyn Fn(f64, f64)>) -> Result<()> {
		if self.broken {
			return Err(Error::Js("2d context unavailable".into()));
		}
		let mut log = self.log.borrow_mut();
		log.mounted = true;
		log.mounted_size = Some((width, height));
		log.on_click = Some(on_click);
		Ok(())
	}

	fn paint(&mut self, scene: &Scene) {
		let mut log = self.log.borrow_mut();
		log.paints += 1;
		log.last_scene = Some(scene.clone());
	}

	fn clear(&mut self) {
		let mut log = self.log.borrow_mut();
		log.mounted = false;
		log.empty_message = None;
		log.on_click = None;
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn selectors_cover_class_tag_attribute_and_descendant() {
		let dom = FixtureDom::new(
			el("body").child(
				el("div").class("outer").class("wide").child(
					el("section")
						.child(el("a").attr("href", "x.md").text("X"))
						.child(el("span").attr("data-score", "1").text("1")),
				),
			),
		);
		assert_eq!(dom.query(".outer.wide"), Some(1));
		assert_eq!(dom.query(".outer.narrow"), None);
		assert_eq!(dom.query(".outer a"), Some(3));
		assert_eq!(dom.query("div [data-score]"), Some(4));
		assert_eq!(dom.query("[data-score=\"1\"]"), Some(4));
		assert_eq!(dom.query("section .outer"), None);
		assert_eq!(dom.text(&1), "X1");
		assert!(dom.is_link(&3));
	}
}
