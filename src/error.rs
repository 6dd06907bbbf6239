//! Errors raised at the host-binding edge.
//!
//! The graph pipeline itself never fails: missing panels, unparseable scores and broken links all
//! degrade to smaller graphs. These variants only cover configuration and browser plumbing.

use thiserror::Error;

/// Failures at the boundary with the browser and the host.
#[derive(Error, Debug)]
pub enum Error {
	/// The view configuration JSON could not be decoded.
	#[error("Configuration error: {0}")]
	Config(#[from] serde_json::Error),

	/// The configuration decoded but holds a value the view cannot run with.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// A browser API was unavailable or threw.
	#[error("JS error: {0}")]
	Js(String),

	/// The host could not resolve a navigation target.
	#[error("Navigation error: {0}")]
	Navigation(String),
}

impl From<wasm_bindgen::JsValue> for Error {
	fn from(value: wasm_bindgen::JsValue) -> Self {
		Error::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
	}
}

/// Result alias used by the host bindings.
pub type Result<T> = std::result::Result<T, Error>;
