//! View configuration: panel selectors, force parameters and drawing constants.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prioritised selector lists used to scrape the connections panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selectors {
	/// Tried in order against the whole document; the first match is the panel.
	pub container: Vec<String>,
	/// All of these are queried inside the panel and their matches unioned.
	pub item: Vec<String>,
	/// Tried in order inside an item until one yields a number.
	pub score: Vec<String>,
	/// Tried in order inside an item; the first match names the suggestion.
	pub title: Vec<String>,
	/// Attribute holding a machine-readable score.
	pub score_attribute: String,
	/// Attribute holding a target path on non-link title elements.
	pub path_attribute: String,
}

impl Default for Selectors {
	fn default() -> Self {
		fn list(items: &[&str]) -> Vec<String> {
			items.iter().map(|s| s.to_string()).collect()
		}
		Self {
			container: list(&[
				".smart-connections-panel",
				".smart-connections",
				".suggested-connections",
				".workspace-split.mod-right-split .view-content",
			]),
			item: list(&[
				".smart-connections-list-item",
				".smart-connections__item",
				".suggested-connection",
				"[data-connection-score]",
			]),
			score: list(&[".score", ".smart-connections__score", "[data-connection-score]"]),
			title: list(&["a", ".title", ".smart-connections__title"]),
			score_attribute: "data-connection-score".into(),
			path_attribute: "data-path".into(),
		}
	}
}

/// Force simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
	pub link_distance: f64,
	/// Many-body strength; negative values repel.
	pub charge_strength: f64,
	pub min_link_strength: f64,
	/// Cooling threshold; must lie strictly between 0 and 1 or the layout never settles.
	pub alpha_min: f64,
	pub velocity_decay: f64,
}

impl LayoutConfig {
	fn validate(&self) -> Result<()> {
		if !(self.alpha_min > 0.0 && self.alpha_min < 1.0) {
			return Err(Error::InvalidConfig(format!(
				"alphaMin must be in (0, 1), got {}",
				self.alpha_min
			)));
		}
		Ok(())
	}
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			link_distance: 90.0,
			charge_strength: -160.0,
			min_link_strength: 0.2,
			alpha_min: 0.001,
			velocity_decay: 0.4,
		}
	}
}

/// Everything a graph view needs besides its host capabilities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConfig {
	pub selectors: Selectors,
	pub layout: LayoutConfig,
	/// Drawing width used when the container reports none.
	pub default_width: f64,
	pub height: f64,
	pub node_radius: f64,
	pub label_font_size: f64,
	/// Vertical distance from a node centre to its label baseline.
	pub label_offset: f64,
	/// Vertical shift applied to score labels at link midpoints.
	pub score_label_offset: f64,
	pub empty_message: String,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			selectors: Selectors::default(),
			layout: LayoutConfig::default(),
			default_width: 320.0,
			height: 340.0,
			node_radius: 12.0,
			label_font_size: 10.0,
			label_offset: 25.0,
			score_label_offset: -5.0,
			empty_message: "No Smart Connections suggestions found. Open the Smart Connections \
			                panel to see connections."
				.into(),
		}
	}
}

impl ViewConfig {
	/// Parse a host-supplied JSON settings blob. Blank input yields the defaults.
	pub fn from_json(raw: &str) -> Result<Self> {
		if raw.trim().is_empty() {
			return Ok(Self::default());
		}
		let config: Self = serde_json::from_str(raw)?;
		config.layout.validate()?;
		Ok(config)
	}
}
