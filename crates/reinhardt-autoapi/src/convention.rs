//! Naming-convention inference
//!
//! Turns a method name such as `FetchAsync` or `fetch_by_name` into an HTTP
//! verb and an action-level route template.
//!
//! ```text
//! UpdateAsync(id, model)
//!   ├─ strip suffix  → Update
//!   ├─ prefix        → Update (PUT), remainder ""
//!   ├─ tokenize      → ""
//!   └─ id promotion  → "{id}"
//! ```

use crate::verbs::VerbTable;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;

static PASCAL_SEGMENT: Lazy<Regex> = Lazy::new(|| {
	Regex::new("[A-Z]?[a-z0-9]+").expect("pascal segment pattern is valid")
});

/// Name of the parameter promoted into the route.
pub const ID_PARAMETER: &str = "id";

/// Verb and route inferred from a method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredRoute {
	pub verb: Method,
	/// The verb-table prefix that was consumed, if any.
	pub prefix: Option<String>,
	/// Tokenized remainder without the `{id}` segment.
	pub sub_route: String,
	/// Final action route.
	pub route: String,
}

/// Parses method names into verbs and route templates.
#[derive(Debug, Clone)]
pub struct NameConventionResolver {
	verbs: VerbTable,
	strip_async_suffix: bool,
}

impl NameConventionResolver {
	pub fn new(verbs: VerbTable) -> Self {
		Self {
			verbs,
			strip_async_suffix: true,
		}
	}

	pub fn with_async_suffix_stripping(mut self, strip: bool) -> Self {
		self.strip_async_suffix = strip;
		self
	}

	pub fn verbs(&self) -> &VerbTable {
		&self.verbs
	}

	/// Infer verb and route for a method.
	///
	/// `has_id` tells whether the method has a parameter literally named `id`.
	/// `explicit_route` short-circuits route derivation; the verb is still inferred.
	///
	/// # Examples
	///
	/// ```
	/// use http::Method;
	/// use reinhardt_autoapi::{NameConventionResolver, VerbTable};
	///
	/// let resolver = NameConventionResolver::new(VerbTable::default());
	///
	/// let fetch = resolver.resolve("FetchAsync", true, None);
	/// assert_eq!(fetch.verb, Method::GET);
	/// assert_eq!(fetch.route, "{id}");
	///
	/// let teach = resolver.resolve("TeachAsync", false, None);
	/// assert_eq!(teach.verb, Method::POST);
	/// assert_eq!(teach.route, "Teach");
	/// ```
	pub fn resolve(&self, method_name: &str, has_id: bool, explicit_route: Option<&str>) -> InferredRoute {
		let stripped = self.strip_suffix(method_name);
		let (prefix, remainder) = self.split_prefix(stripped);
		let verb = prefix
			.map(|p| self.verbs.verb_for(p))
			.unwrap_or(crate::verbs::DEFAULT_VERB);

		let sub_route = tokenize(remainder);
		let route = match explicit_route {
			Some(template) => template.to_string(),
			None => promote_id(&sub_route, has_id),
		};

		InferredRoute {
			verb,
			prefix: prefix.map(str::to_string),
			sub_route,
			route,
		}
	}

	/// Strip a trailing `Async` / `_async` suffix when enabled.
	pub fn strip_suffix<'a>(&self, name: &'a str) -> &'a str {
		if !self.strip_async_suffix {
			return name;
		}
		name.strip_suffix("_async")
			.or_else(|| name.strip_suffix("Async"))
			.unwrap_or(name)
	}

	/// Split off the longest known verb prefix, matched case-insensitively.
	///
	/// Any leading match counts, so `UpdatesAsync` still maps to PUT. Returns
	/// the prefix as spelled in the name and the remainder with any leading `_`
	/// removed.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::NameConventionResolver;
	///
	/// let resolver = NameConventionResolver::default();
	/// assert_eq!(resolver.split_prefix("GetByName"), (Some("Get"), "ByName"));
	/// assert_eq!(resolver.split_prefix("Updates"), (Some("Update"), "s"));
	/// assert_eq!(resolver.split_prefix("Teach"), (None, "Teach"));
	/// ```
	pub fn split_prefix<'a>(&self, name: &'a str) -> (Option<&'a str>, &'a str) {
		for candidate in self.verbs.prefixes() {
			let len = candidate.len();
			if name.len() < len || !name.is_char_boundary(len) {
				continue;
			}
			let (head, tail) = name.split_at(len);
			if head.eq_ignore_ascii_case(candidate) {
				return (Some(head), tail.trim_start_matches('_'));
			}
		}
		(None, name.trim_start_matches('_'))
	}
}

impl Default for NameConventionResolver {
	fn default() -> Self {
		Self::new(VerbTable::default())
	}
}

/// Split a name remainder into route segments joined by `_`.
///
/// PascalCase names are split on `[A-Z]?[a-z0-9]+` runs; names containing `_`
/// or no uppercase letters are split on `_`.
pub fn tokenize(remainder: &str) -> String {
	if remainder.is_empty() {
		return String::new();
	}
	let snake = remainder.contains('_') || !remainder.chars().any(|c| c.is_ascii_uppercase());
	if snake {
		remainder
			.split('_')
			.filter(|segment| !segment.is_empty())
			.collect::<Vec<_>>()
			.join("_")
	} else {
		PASCAL_SEGMENT
			.find_iter(remainder)
			.map(|m| m.as_str())
			.collect::<Vec<_>>()
			.join("_")
	}
}

fn promote_id(sub_route: &str, has_id: bool) -> String {
	match (has_id, sub_route.is_empty()) {
		(false, _) => sub_route.to_string(),
		(true, true) => format!("{{{}}}", ID_PARAMETER),
		(true, false) => format!("{{{}}}/{}", ID_PARAMETER, sub_route),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("GetAsync", false, Method::GET, "")]
	#[case("FetchAsync", true, Method::GET, "{id}")]
	#[case("UpdateAsync", true, Method::PUT, "{id}")]
	#[case("DeleteAsync", true, Method::DELETE, "{id}")]
	#[case("InsertAsync", false, Method::POST, "")]
	#[case("TeachAsync", false, Method::POST, "Teach")]
	#[case("Get", false, Method::GET, "")]
	#[case("GetByName", false, Method::GET, "By_Name")]
	#[case("FindStudentsByClass", true, Method::GET, "{id}/Students_By_Class")]
	#[case("Async", false, Method::POST, "")]
	#[case("Address", false, Method::POST, "ress")]
	#[case("Getaway", false, Method::GET, "away")]
	#[case("UpdatesAsync", false, Method::PUT, "s")]
	#[case("Editorial", false, Method::PUT, "orial")]
	#[case("PatchNameAsync", true, Method::PATCH, "{id}/Name")]
	#[case("fetch", true, Method::GET, "{id}")]
	#[case("get_by_name_async", false, Method::GET, "by_name")]
	#[case("teach", false, Method::POST, "teach")]
	fn test_resolve(
		#[case] name: &str,
		#[case] has_id: bool,
		#[case] verb: Method,
		#[case] route: &str,
	) {
		let resolved = NameConventionResolver::default().resolve(name, has_id, None);
		assert_eq!(resolved.verb, verb, "verb for {}", name);
		assert_eq!(resolved.route, route, "route for {}", name);
	}

	#[rstest]
	fn test_explicit_route_keeps_inferred_verb() {
		let resolved = NameConventionResolver::default().resolve("FetchAsync", true, Some("by-key/{id}"));
		assert_eq!(resolved.verb, Method::GET);
		assert_eq!(resolved.route, "by-key/{id}");
	}

	#[rstest]
	fn test_suffix_kept_when_stripping_disabled() {
		let resolver = NameConventionResolver::default().with_async_suffix_stripping(false);
		let resolved = resolver.resolve("GetAsync", false, None);
		assert_eq!(resolved.verb, Method::GET);
		assert_eq!(resolved.route, "Async");
	}

	#[rstest]
	fn test_longest_prefix_wins() {
		let mut verbs = VerbTable::default();
		verbs.insert("GetAll", Method::PATCH);
		let resolved = NameConventionResolver::new(verbs).resolve("GetAllAsync", false, None);
		assert_eq!(resolved.verb, Method::PATCH);
		assert_eq!(resolved.prefix.as_deref(), Some("GetAll"));
		assert_eq!(resolved.route, "");
	}

	#[rstest]
	#[case("", "")]
	#[case("Teach", "Teach")]
	#[case("ByIdAndName2", "By_Id_And_Name2")]
	#[case("by__name", "by_name")]
	fn test_tokenize(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(tokenize(input), expected);
	}
}
