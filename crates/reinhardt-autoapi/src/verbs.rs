//! Method-name prefix to HTTP verb mapping.

use crate::error::ConfigError;
use http::Method;
use std::collections::BTreeMap;

/// Verb used when no prefix of a method name is known.
pub const DEFAULT_VERB: Method = Method::POST;

/// Case-insensitive mapping from a method-name prefix to an HTTP verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbTable {
	// keyed by the lowercased prefix; the original spelling is kept for display
	entries: BTreeMap<String, (String, Method)>,
}

impl VerbTable {
	/// An empty table. Every name falls back to [`DEFAULT_VERB`].
	pub fn empty() -> Self {
		Self {
			entries: BTreeMap::new(),
		}
	}

	/// Insert or override a prefix.
	///
	/// # Examples
	///
	/// ```
	/// use http::Method;
	/// use reinhardt_autoapi::VerbTable;
	///
	/// let mut table = VerbTable::default();
	/// table.insert("List", Method::GET);
	/// assert_eq!(table.get("list"), Some(&Method::GET));
	///
	/// table.insert("query", Method::POST);
	/// assert_eq!(table.get("Query"), Some(&Method::POST));
	/// ```
	pub fn insert(&mut self, prefix: impl Into<String>, verb: Method) -> Option<Method> {
		let prefix = prefix.into();
		self.entries
			.insert(prefix.to_ascii_lowercase(), (prefix, verb))
			.map(|(_, old)| old)
	}

	/// Insert a prefix whose verb is given as text, as configuration does.
	pub fn insert_str(&mut self, prefix: &str, verb: &str) -> Result<(), ConfigError> {
		if prefix.is_empty() {
			return Err(ConfigError::EmptyPrefix);
		}
		let method = Method::from_bytes(verb.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
			ConfigError::InvalidVerb {
				prefix: prefix.to_string(),
				verb: verb.to_string(),
			}
		})?;
		self.insert(prefix, method);
		Ok(())
	}

	/// Drop a prefix. Names starting with it fall back to the default verb.
	///
	/// # Examples
	///
	/// ```
	/// use http::Method;
	/// use reinhardt_autoapi::VerbTable;
	///
	/// let mut verbs = VerbTable::default();
	/// assert_eq!(verbs.remove("query"), Some(Method::GET));
	/// assert_eq!(verbs.verb_for("Query"), Method::POST);
	/// ```
	pub fn remove(&mut self, prefix: &str) -> Option<Method> {
		self.entries
			.remove(&prefix.to_ascii_lowercase())
			.map(|(_, verb)| verb)
	}

	/// Verb registered for `prefix`, ignoring case.
	pub fn get(&self, prefix: &str) -> Option<&Method> {
		self.entries
			.get(&prefix.to_ascii_lowercase())
			.map(|(_, verb)| verb)
	}

	/// Verb for `prefix`, or [`DEFAULT_VERB`] when the prefix is unknown.
	pub fn verb_for(&self, prefix: &str) -> Method {
		self.get(prefix).cloned().unwrap_or(DEFAULT_VERB)
	}

	/// Number of prefixes.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Prefixes as originally spelled, longest first.
	pub fn prefixes(&self) -> Vec<&str> {
		let mut prefixes: Vec<&str> = self.entries.values().map(|(p, _)| p.as_str()).collect();
		prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
		prefixes
	}

	/// Prefixes and verbs in table order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Method)> {
		self.entries.values().map(|(p, verb)| (p.as_str(), verb))
	}
}

impl Default for VerbTable {
	fn default() -> Self {
		let mut table = Self::empty();
		for (prefix, verb) in [
			("Get", Method::GET),
			("Find", Method::GET),
			("Fetch", Method::GET),
			("Query", Method::GET),
			("Post", Method::POST),
			("Add", Method::POST),
			("Create", Method::POST),
			("Insert", Method::POST),
			("Put", Method::PUT),
			("Update", Method::PUT),
			("Edit", Method::PUT),
			("Modify", Method::PUT),
			("Delete", Method::DELETE),
			("Remove", Method::DELETE),
			("Patch", Method::PATCH),
		] {
			table.insert(prefix, verb);
		}
		table
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("Get", Method::GET)]
	#[case("find", Method::GET)]
	#[case("FETCH", Method::GET)]
	#[case("Query", Method::GET)]
	#[case("Add", Method::POST)]
	#[case("Insert", Method::POST)]
	#[case("Modify", Method::PUT)]
	#[case("Edit", Method::PUT)]
	#[case("Remove", Method::DELETE)]
	#[case("Patch", Method::PATCH)]
	#[case("Teach", Method::POST)]
	fn test_default_table(#[case] prefix: &str, #[case] expected: Method) {
		assert_eq!(VerbTable::default().verb_for(prefix), expected);
	}

	#[rstest]
	fn test_insert_str_rejects_invalid_verb() {
		let mut table = VerbTable::default();
		let err = table.insert_str("List", "NOT A VERB").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidVerb { .. }));
		assert!(matches!(
			table.insert_str("", "GET").unwrap_err(),
			ConfigError::EmptyPrefix
		));
	}

	#[rstest]
	fn test_insert_str_normalizes_case() {
		let mut table = VerbTable::empty();
		table.insert_str("List", "get").unwrap();
		assert_eq!(table.get("LIST"), Some(&Method::GET));
	}

	#[rstest]
	fn test_remove_falls_back_to_default() {
		let mut table = VerbTable::default();
		assert_eq!(table.remove("Patch"), Some(Method::PATCH));
		assert_eq!(table.verb_for("Patch"), DEFAULT_VERB);
	}

	#[rstest]
	fn test_prefixes_longest_first() {
		let mut table = VerbTable::empty();
		table.insert("Get", Method::GET);
		table.insert("GetAll", Method::GET);
		assert_eq!(table.prefixes(), vec!["GetAll", "Get"]);
	}
}
