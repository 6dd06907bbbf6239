//! Turns the focused document and its suggestions into a star-shaped graph.

use log::trace;

use super::extract::DEFAULT_SCORE;
use super::types::{ActiveDocument, ConnectionSuggestion, GraphData, GraphLink, GraphNode};

/// Node id used for the centre node when nothing is focused.
pub const NO_ACTIVE_ID: &str = "active";
pub const NO_ACTIVE_LABEL: &str = "No active file";

const MAX_LABEL_CHARS: usize = 8;
const ELLIPSIS: &str = "...";

/// Drops one trailing `.md` (any case) and shortens to 8 characters plus an ellipsis.
pub fn truncate_title(title: &str) -> String {
	let stem = strip_markdown_extension(title);
	if stem.chars().count() <= MAX_LABEL_CHARS {
		return stem.to_string();
	}
	let mut short: String = stem.chars().take(MAX_LABEL_CHARS).collect();
	short.push_str(ELLIPSIS);
	short
}

fn strip_markdown_extension(title: &str) -> &str {
	let cut = title.len().saturating_sub(3);
	match title.get(cut..) {
		Some(ext) if ext.eq_ignore_ascii_case(".md") => &title[..cut],
		_ => title,
	}
}

/// Link weight for a score. Zero counts as "no score" just like a missing one.
pub fn link_weight(score: f64) -> f64 {
	if score == 0.0 || score.is_nan() {
		DEFAULT_SCORE
	} else {
		score
	}
}

pub fn build_data(
	active: Option<&ActiveDocument>,
	suggestions: &[ConnectionSuggestion],
) -> GraphData {
	let active_node = match active {
		Some(doc) => GraphNode {
			id: doc.path.clone(),
			label: truncate_title(&doc.basename),
		},
		None => GraphNode {
			id: NO_ACTIVE_ID.into(),
			label: NO_ACTIVE_LABEL.into(),
		},
	};
	let active_id = active_node.id.clone();

	let mut data = GraphData {
		nodes: vec![active_node],
		links: Vec::with_capacity(suggestions.len()),
	};

	for suggestion in suggestions {
		let node = GraphNode {
			id: suggestion
				.target_path
				.clone()
				.unwrap_or_else(|| suggestion.title.clone()),
			label: truncate_title(&suggestion.title),
		};
		data.links.push(GraphLink {
			source: active_id.clone(),
			target: node.id.clone(),
			weight: link_weight(suggestion.score),
		});

		match data.index_of(&node.id) {
			// The centre node keeps its own label even if the panel lists it.
			Some(0) => trace!("suggestion {:?} points at the active document", node.id),
			Some(idx) => data.nodes[idx] = node,
			None => data.nodes.push(node),
		}
	}
	data
}
