use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::types::{GraphData, Point};
use crate::config::ViewConfig;

const LINK_COLOR: &str = "#8a8f98";
const NODE_COLOR: &str = "#7c6cf0";
const NODE_LABEL_COLOR: &str = "#dcddde";
const SCORE_LABEL_COLOR: &str = "#a0a4ab";
const SCORE_FONT_SIZE: f64 = 9.0;

/// Line width for a link of the given weight.
pub fn stroke_width(weight: f64) -> f64 {
	(3.0 * weight).max(1.0)
}

pub fn link_opacity(weight: f64) -> f64 {
	weight.clamp(0.2, 1.0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeGlyph {
	pub id: String,
	pub label: String,
	pub center: Point,
	pub label_at: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkGlyph {
	/// Node indices of the endpoints.
	pub source: usize,
	pub target: usize,
	pub weight: f64,
	pub stroke_width: f64,
	pub opacity: f64,
	pub score_text: String,
	pub from: Point,
	pub to: Point,
	pub score_at: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneContent {
	Empty { message: String },
	Graph {
		nodes: Vec<NodeGlyph>,
		links: Vec<LinkGlyph>,
	},
}

/// Styled glyphs for one graph. Styles are fixed at compose time; only coordinates move.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
	pub width: f64,
	pub height: f64,
	pub node_radius: f64,
	pub font_size: f64,
	label_offset: f64,
	score_offset: f64,
	pub content: SceneContent,
}

impl Scene {
	pub fn compose(data: &GraphData, width: f64, config: &ViewConfig) -> Self {
		let content = if data.links.is_empty() {
			SceneContent::Empty {
				message: config.empty_message.clone(),
			}
		} else {
			let nodes = data
				.nodes
				.iter()
				.map(|n| NodeGlyph {
					id: n.id.clone(),
					label: n.label.clone(),
					center: Point::default(),
					label_at: Point::default(),
				})
				.collect();
			let links = data
				.links
				.iter()
				.filter_map(|l| {
					Some(LinkGlyph {
						source: data.index_of(&l.source)?,
						target: data.index_of(&l.target)?,
						weight: l.weight,
						stroke_width: stroke_width(l.weight),
						opacity: link_opacity(l.weight),
						score_text: format!("{:.2}", l.weight),
						from: Point::default(),
						to: Point::default(),
						score_at: Point::default(),
					})
				})
				.collect();
			SceneContent::Graph { nodes, links }
		};

		Self {
			width,
			height: config.height,
			node_radius: config.node_radius,
			font_size: config.label_font_size,
			label_offset: config.label_offset,
			score_offset: config.score_label_offset,
			content,
		}
	}

	pub fn is_empty(&self) -> bool {
		matches!(self.content, SceneContent::Empty { .. })
	}

	/// Moves every glyph to `positions` (node order). Missing positions read as the origin.
	pub fn project(&mut self, positions: &[Point]) {
		let SceneContent::Graph { nodes, links } = &mut self.content else {
			return;
		};
		let at = |i: usize| positions.get(i).copied().unwrap_or_default();

		for (i, node) in nodes.iter_mut().enumerate() {
			node.center = at(i);
			node.label_at = Point {
				x: node.center.x,
				y: node.center.y + self.label_offset,
			};
		}
		for link in links.iter_mut() {
			link.from = at(link.source);
			link.to = at(link.target);
			link.score_at = Point {
				x: (link.from.x + link.to.x) / 2.0,
				y: (link.from.y + link.to.y) / 2.0 + self.score_offset,
			};
		}
	}

	/// Id of the topmost node whose circle contains the point.
	pub fn node_at(&self, x: f64, y: f64) -> Option<&str> {
		let SceneContent::Graph { nodes, .. } = &self.content else {
			return None;
		};
		nodes
			.iter()
			.rev()
			.find(|n| {
				let (dx, dy) = (n.center.x - x, n.center.y - y);
				dx * dx + dy * dy <= self.node_radius * self.node_radius
			})
			.map(|n| n.id.as_str())
	}
}

/// Repaints a projected scene: links, score labels, nodes, then node labels.
pub fn paint(scene: &Scene, ctx: &CanvasRenderingContext2d) {
	ctx.clear_rect(0.0, 0.0, scene.width, scene.height);
	let SceneContent::Graph { nodes, links } = &scene.content else {
		return;
	};
	draw_links(links, ctx);
	draw_nodes(scene, nodes, ctx);
}

fn draw_links(links: &[LinkGlyph], ctx: &CanvasRenderingContext2d) {
	ctx.set_stroke_style_str(LINK_COLOR);
	for link in links {
		ctx.set_global_alpha(link.opacity);
		ctx.set_line_width(link.stroke_width);
		ctx.begin_path();
		ctx.move_to(link.from.x, link.from.y);
		ctx.line_to(link.to.x, link.to.y);
		ctx.stroke();
	}
	ctx.set_global_alpha(1.0);

	ctx.set_fill_style_str(SCORE_LABEL_COLOR);
	ctx.set_font(&format!("{SCORE_FONT_SIZE}px sans-serif"));
	ctx.set_text_align("center");
	for link in links {
		let _ = ctx.fill_text(&link.score_text, link.score_at.x, link.score_at.y);
	}
}

fn draw_nodes(scene: &Scene, nodes: &[NodeGlyph], ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(NODE_COLOR);
	for node in nodes {
		ctx.begin_path();
		let _ = ctx.arc(node.center.x, node.center.y, scene.node_radius, 0.0, 2.0 * PI);
		ctx.fill();
	}

	ctx.set_fill_style_str(NODE_LABEL_COLOR);
	ctx.set_font(&format!("{}px sans-serif", scene.font_size));
	ctx.set_text_align("center");
	for node in nodes {
		let _ = ctx.fill_text(&node.label, node.label_at.x, node.label_at.y);
	}
}
