//! Options and settings
//!
//! [`ApiOptions`] is what the pipeline consumes. It can be built in code or
//! from [`ApiSettings`], the serializable subset loaded from TOML:
//!
//! ```toml
//! default_route_template = "api/v1/[controller]"
//! name_suffixes = ["Service", "AppService"]
//! use_api_behavior = true
//! strip_async_suffix = true
//!
//! [verbs]
//! List = "GET"
//! Archive = "DELETE"
//! ```

use crate::convention::NameConventionResolver;
use crate::error::ConfigError;
use crate::metadata::{Attribute, BaseType};
use crate::verbs::VerbTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Placeholder replaced by the derived controller name.
pub const CONTROLLER_PLACEHOLDER: &str = "[controller]";

/// Serializable settings.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
	/// Route template applied to controllers without their own route.
	#[serde(default = "default_route_template")]
	pub default_route_template: String,

	/// Suffixes stripped from contract names.
	#[serde(default = "default_name_suffixes")]
	pub name_suffixes: Vec<String>,

	/// Mark generated controllers with API behavior.
	#[serde(default = "default_true")]
	pub use_api_behavior: bool,

	/// Strip `Async` / `_async` from method names before inference.
	#[serde(default = "default_true")]
	pub strip_async_suffix: bool,

	/// Extra or overriding prefix to verb entries.
	#[serde(default)]
	pub verbs: BTreeMap<String, String>,
}

impl Default for ApiSettings {
	fn default() -> Self {
		Self {
			default_route_template: default_route_template(),
			name_suffixes: default_name_suffixes(),
			use_api_behavior: true,
			strip_async_suffix: true,
			verbs: BTreeMap::new(),
		}
	}
}

impl ApiSettings {
	/// Parse settings from TOML text.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::settings::ApiSettings;
	///
	/// let settings = ApiSettings::from_toml_str("use_api_behavior = false").unwrap();
	/// assert!(!settings.use_api_behavior);
	/// assert_eq!(settings.default_route_template, "api/[controller]");
	/// ```
	pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(contents)?)
	}

	/// Read and parse a TOML settings file.
	pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_toml_str(&contents)
	}

	/// Convert into options, validating the verb entries.
	pub fn into_options(self) -> Result<ApiOptions, ConfigError> {
		let mut verbs = VerbTable::default();
		for (prefix, verb) in &self.verbs {
			verbs.insert_str(prefix, verb)?;
		}
		Ok(ApiOptions {
			verbs,
			default_route_template: self.default_route_template,
			name_suffixes: self.name_suffixes,
			use_api_behavior: self.use_api_behavior,
			strip_async_suffix: self.strip_async_suffix,
			controller_base_type: None,
			controller_attributes: Vec::new(),
		})
	}
}

impl TryFrom<ApiSettings> for ApiOptions {
	type Error = ConfigError;

	fn try_from(settings: ApiSettings) -> Result<Self, Self::Error> {
		settings.into_options()
	}
}

fn default_route_template() -> String {
	format!("api/{}", CONTROLLER_PLACEHOLDER)
}

fn default_name_suffixes() -> Vec<String> {
	vec!["Service".to_string(), "ApiService".to_string(), "AutoApiService".to_string()]
}

fn default_true() -> bool {
	true
}

/// Pipeline options.
#[derive(Debug, Clone)]
pub struct ApiOptions {
	pub verbs: VerbTable,
	pub default_route_template: String,
	pub name_suffixes: Vec<String>,
	pub use_api_behavior: bool,
	pub strip_async_suffix: bool,
	/// Base type for every generated controller unless a registration overrides it.
	pub controller_base_type: Option<BaseType>,
	/// Attributes added to every generated controller.
	pub controller_attributes: Vec<Attribute>,
}

impl Default for ApiOptions {
	fn default() -> Self {
		Self {
			verbs: VerbTable::default(),
			default_route_template: default_route_template(),
			name_suffixes: default_name_suffixes(),
			use_api_behavior: true,
			strip_async_suffix: true,
			controller_base_type: None,
			controller_attributes: Vec::new(),
		}
	}
}

impl ApiOptions {
	/// Template used as the controller route prefix. `[controller]` is replaced
	/// by the derived name.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::ApiOptions;
	///
	/// let options = ApiOptions::default().with_default_route_template("v1/[controller]");
	/// assert_eq!(options.default_route_template, "v1/[controller]");
	/// ```
	pub fn with_default_route_template(mut self, template: impl Into<String>) -> Self {
		self.default_route_template = template.into();
		self
	}

	/// Suffixes stripped from contract names. Replaces the defaults.
	pub fn with_name_suffixes<I, S>(mut self, suffixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.name_suffixes = suffixes.into_iter().map(Into::into).collect();
		self
	}

	/// Toggle [`Attribute::ApiBehavior`] on every adapter.
	pub fn with_api_behavior(mut self, enabled: bool) -> Self {
		self.use_api_behavior = enabled;
		self
	}

	/// Toggle removal of `Async` / `_async` before inference.
	pub fn with_async_suffix_stripping(mut self, enabled: bool) -> Self {
		self.strip_async_suffix = enabled;
		self
	}

	/// Base type for adapters without their own override.
	pub fn with_controller_base_type(mut self, base: BaseType) -> Self {
		self.controller_base_type = Some(base);
		self
	}

	/// Add an attribute to every adapter.
	pub fn with_controller_attribute(mut self, attribute: Attribute) -> Self {
		self.controller_attributes.push(attribute);
		self
	}

	/// Replace the verb table.
	pub fn with_verbs(mut self, verbs: VerbTable) -> Self {
		self.verbs = verbs;
		self
	}

	/// Resolver configured from these options.
	pub fn resolver(&self) -> NameConventionResolver {
		NameConventionResolver::new(self.verbs.clone()).with_async_suffix_stripping(self.strip_async_suffix)
	}

	/// Effective base type for a registration.
	pub fn base_type(&self, explicit: Option<&BaseType>) -> BaseType {
		explicit
			.or(self.controller_base_type.as_ref())
			.cloned()
			.unwrap_or_default()
	}
}
