/// One related note reported by the connections panel.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionSuggestion {
	pub score: f64,
	pub title: String,
	pub target_path: Option<String>,
}

/// The document currently focused in the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveDocument {
	pub path: String,
	pub basename: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: String,
	pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	pub source: String,
	pub target: String,
	pub weight: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
}

impl GraphData {
	/// Index of the node with `id`, if present.
	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.nodes.iter().position(|n| n.id == id)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}
