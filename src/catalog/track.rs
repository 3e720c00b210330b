//! Catalog track model.

// self
use crate::_prelude::*;

/// A track as returned by a catalog provider.
///
/// Deduplication across providers compares `id` only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
	/// Provider-namespaced track identifier.
	pub id: String,
	/// Display title.
	pub name: String,
	/// Credited artists, in billing order.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub artists: Vec<String>,
	/// Links into provider apps or web players, keyed by label.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub external_links: BTreeMap<String, Url>,
}
impl Track {
	/// Creates a track with no artists or links.
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self { id: id.into(), name: name.into(), artists: Vec::new(), external_links: BTreeMap::new() }
	}

	/// Appends a credited artist.
	pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
		self.artists.push(artist.into());

		self
	}

	/// Adds or replaces an external link.
	pub fn with_link(mut self, label: impl Into<String>, url: Url) -> Self {
		self.external_links.insert(label.into(), url);

		self
	}
}
