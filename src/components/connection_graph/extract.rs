//! Best-effort scraping of the connections panel.
//!
//! The panel is owned by another plugin and its markup is not versioned, so every lookup goes
//! through a prioritised selector list and every failure degrades to "no data" or a default.

use std::collections::HashSet;

use log::{debug, trace};

use super::types::ConnectionSuggestion;
use crate::config::Selectors;

/// Score given to items whose score cannot be read.
pub const DEFAULT_SCORE: f64 = 0.5;

/// Read-only view of a DOM-like tree.
///
/// Bound to the live browser document in production and to an in-memory tree in tests.
pub trait PanelDom {
	type Element: Clone;

	/// First element in the whole document matching `selector`.
	fn query(&self, selector: &str) -> Option<Self::Element>;
	/// First descendant of `scope` matching `selector`.
	fn query_within(&self, scope: &Self::Element, selector: &str) -> Option<Self::Element>;
	/// All descendants of `scope` matching `selector`, in document order.
	fn query_all_within(&self, scope: &Self::Element, selector: &str) -> Vec<Self::Element>;
	/// Concatenated text content, untrimmed.
	fn text(&self, element: &Self::Element) -> String;
	fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;
	/// Whether the element is an anchor whose `href` is a navigable target.
	fn is_link(&self, element: &Self::Element) -> bool;
}

/// Object-safe handle on whatever produces suggestions for a view.
pub trait SuggestionSource {
	fn extract(&self) -> Vec<ConnectionSuggestion>;
	/// Whether the panel container currently exists.
	fn panel_present(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	Score,
	Title,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Field {
	Score(f64),
	Title { text: String, target_path: Option<String> },
}

pub struct Extractor<D> {
	dom: D,
	selectors: Selectors,
}

impl<D: PanelDom> Extractor<D> {
	pub fn new(dom: D, selectors: Selectors) -> Self {
		Self { dom, selectors }
	}

	pub fn find_container(&self) -> Option<D::Element> {
		self.selectors
			.container
			.iter()
			.find_map(|selector| self.dom.query(selector))
	}

	/// Union of every item selector's matches. An element hit by two selectors shows up twice;
	/// the title/path key collapses those later.
	pub fn find_items(&self, container: &D::Element) -> Vec<D::Element> {
		self.selectors
			.item
			.iter()
			.flat_map(|selector| self.dom.query_all_within(container, selector))
			.collect()
	}

	pub fn read_field(&self, item: &D::Element, kind: FieldKind) -> Option<Field> {
		match kind {
			FieldKind::Score => self.read_score(item).map(Field::Score),
			FieldKind::Title => self
				.read_title(item)
				.map(|(text, target_path)| Field::Title { text, target_path }),
		}
	}

	fn read_score(&self, item: &D::Element) -> Option<f64> {
		for selector in &self.selectors.score {
			let Some(el) = self.dom.query_within(item, selector) else {
				continue;
			};
			let parsed = match self.dom.attribute(&el, &self.selectors.score_attribute) {
				Some(raw) if raw.is_empty() => Some(DEFAULT_SCORE),
				Some(raw) => parse_float(&raw),
				None => {
					let text = self.dom.text(&el);
					if text.is_empty() {
						None
					} else {
						parse_float(text.trim())
					}
				}
			};
			if parsed.is_some() {
				return parsed;
			}
		}
		None
	}

	/// Text and optional target of the first title-bearing subelement.
	fn read_title(&self, item: &D::Element) -> Option<(String, Option<String>)> {
		let el = self
			.selectors
			.title
			.iter()
			.find_map(|selector| self.dom.query_within(item, selector))?;
		let text = self.dom.text(&el).trim().to_string();

		let mut target_path = None;
		if self.dom.is_link(&el) {
			target_path = self.dom.attribute(&el, "href").filter(|h| !h.is_empty());
		}
		if target_path.is_none() {
			target_path = self
				.dom
				.attribute(&el, &self.selectors.path_attribute)
				.filter(|p| !p.is_empty());
		}
		Some((text, target_path))
	}

	pub fn extract_connections(&self) -> Vec<ConnectionSuggestion> {
		let Some(container) = self.find_container() else {
			trace!("connections panel not found");
			return Vec::new();
		};
		let items = self.find_items(&container);

		let mut seen = HashSet::new();
		let mut results = Vec::new();
		for item in &items {
			let score = match self.read_field(item, FieldKind::Score) {
				Some(Field::Score(score)) => score,
				_ => DEFAULT_SCORE,
			};

			let (mut title, target_path) = match self.read_field(item, FieldKind::Title) {
				Some(Field::Title { text, target_path }) => (text, target_path),
				_ => (String::new(), None),
			};
			if title.is_empty() {
				title = self.dom.text(item).trim().to_string();
			}
			if title.is_empty() {
				continue;
			}

			let key = format!("{}{}", title, target_path.as_deref().unwrap_or(""));
			if !seen.insert(key) {
				continue;
			}
			results.push(ConnectionSuggestion {
				score,
				title,
				target_path,
			});
		}

		debug!(
			"extracted {} suggestions from {} candidate items",
			results.len(),
			items.len()
		);
		results
	}
}

impl<D: PanelDom> SuggestionSource for Extractor<D> {
	fn extract(&self) -> Vec<ConnectionSuggestion> {
		self.extract_connections()
	}

	fn panel_present(&self) -> bool {
		self.find_container().is_some()
	}
}

/// Parses the longest leading decimal number in `raw`, ignoring leading whitespace.
///
/// `"0.87 match"` reads as 0.87 and `"87%"` as 87; text with no numeric prefix is `None`.
/// Unlike JS `parseFloat`, `Infinity` is not accepted, so such scores fall back to the default
/// instead of pushing the layout to infinite coordinates.
pub fn parse_float(raw: &str) -> Option<f64> {
	let s = raw.trim_start();
	let bytes = s.as_bytes();
	let mut end = 0;
	if matches!(bytes.first(), Some(b'+' | b'-')) {
		end += 1;
	}
	let int_start = end;
	while end < bytes.len() && bytes[end].is_ascii_digit() {
		end += 1;
	}
	let mut digits = end - int_start;
	if end < bytes.len() && bytes[end] == b'.' {
		let frac_start = end + 1;
		let mut frac_end = frac_start;
		while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
			frac_end += 1;
		}
		digits += frac_end - frac_start;
		if digits > 0 {
			end = frac_end;
		}
	}
	if digits == 0 {
		return None;
	}
	if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
		let mut exp_end = end + 1;
		if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
			exp_end += 1;
		}
		let exp_digits_start = exp_end;
		while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
			exp_end += 1;
		}
		if exp_end > exp_digits_start {
			end = exp_end;
		}
	}
	s[..end].parse().ok()
}
