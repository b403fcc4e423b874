//! Error types for automatic API registration, route building and dispatch.
//!
//! Everything raised before the surface is frozen is fail-fast: the pipeline
//! never yields a partially built routing surface. Errors raised by an
//! implementation while serving a request are not represented here; they travel
//! unchanged inside the forward future as a [`BoxError`].

use crate::metadata::{ContractId, MethodId};
use http::Method;
use thiserror::Error;

/// Boxed error produced by an implementation call.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for the whole registration/build pipeline.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised synchronously by a registration call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistrationError {
	/// The contract type is not an interface.
	#[error("contract '{0}' must be an interface based on AutomaticApi")]
	NotInterface(ContractId),

	/// The contract does not extend the capability marker.
	#[error("contract '{0}' does not extend the AutomaticApi capability marker")]
	MissingCapability(ContractId),

	/// The implementation does not forward every method of the contract.
	#[error("implementation '{implementation}' does not satisfy '{contract}': missing {missing:?}")]
	NonConforming {
		/// Contract being registered.
		contract: ContractId,
		/// Implementation type name.
		implementation: String,
		/// Methods without a forwarder.
		missing: Vec<String>,
	},

	/// The implementation does not provide a binding for a declared contract.
	#[error("implementation '{implementation}' declares '{contract}' but provides no binding for it")]
	MissingBinding {
		/// Declared contract.
		contract: ContractId,
		/// Implementation type name.
		implementation: String,
	},

	/// Two methods of the effective method set share a dispatch name.
	#[error("contract '{contract}' exposes '{name}' through both {first} and {second}")]
	AmbiguousMethod {
		/// Contract being registered.
		contract: ContractId,
		/// Shared method name.
		name: String,
		/// First declaring method.
		first: MethodId,
		/// Second declaring method.
		second: MethodId,
	},

	/// A derived controller name is already taken by another contract.
	#[error("controller name '{name}' of '{incoming}' collides with '{existing}'")]
	NameCollision {
		/// Derived controller name.
		name: String,
		/// Contract already owning the name.
		existing: ContractId,
		/// Contract being registered.
		incoming: ContractId,
	},

	/// The base type override cannot host generated handlers.
	#[error("controller base type '{base}' must be based on '{required}'")]
	InvalidBaseType {
		/// Offending base type.
		base: String,
		/// Minimal handler base required by the host.
		required: String,
	},

	/// The registry was already consumed by `build()`.
	#[error("registry is frozen; '{0}' was registered after build")]
	Frozen(ContractId),
}

/// Two actions of one contract resolved to the same verb and route.
#[derive(Debug, Error)]
#[error("{method} {route:?} is mapped by both {first} and {second}")]
pub struct RouteConflictError {
	/// Contract owning both actions.
	pub contract: ContractId,
	/// Conflicting HTTP verb.
	pub method: Method,
	/// Conflicting route template.
	pub route: String,
	/// Method registered first.
	pub first: MethodId,
	/// Method registered second.
	pub second: MethodId,
}

/// Failures while constructing an adapter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SynthesisError {
	/// The derived name is cached for a different contract.
	#[error("adapter '{name}' is already synthesized for '{existing}', cannot reuse it for '{incoming}'")]
	NameCollision {
		/// Derived adapter name.
		name: String,
		/// Contract owning the cached adapter.
		existing: ContractId,
		/// Contract requesting synthesis.
		incoming: ContractId,
	},

	/// An action has no forwarder in the binding's dispatch table.
	#[error("adapter '{adapter}' has no forwarder for action '{action}'")]
	MissingForwarder {
		/// Derived adapter name.
		adapter: String,
		/// Action name.
		action: String,
	},

	/// Metadata of a contract method could not be carried onto the adapter.
	#[error("unexpected metadata on {method}: {reason}")]
	Metadata {
		/// Method carrying the metadata.
		method: MethodId,
		/// What went wrong.
		reason: String,
	},
}

/// Invalid configuration values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// A verb table entry names an unknown HTTP method.
	#[error("invalid HTTP verb '{verb}' for prefix '{prefix}'")]
	InvalidVerb {
		/// Prefix token.
		prefix: String,
		/// Rejected verb.
		verb: String,
	},

	/// A verb table prefix is empty.
	#[error("verb prefix must not be empty")]
	EmptyPrefix,

	/// Settings file could not be read.
	#[error("failed to read settings: {0}")]
	Io(#[from] std::io::Error),

	/// Settings file is not valid TOML for [`crate::settings::ApiSettings`].
	#[error("failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Errors raised by an adapter instance before a call is forwarded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
	/// The adapter does not expose the requested action.
	#[error("adapter '{adapter}' has no action '{action}'")]
	UnknownAction {
		/// Derived adapter name.
		adapter: String,
		/// Requested action.
		action: String,
	},

	/// The instance provider failed to resolve the implementation.
	#[error("failed to resolve '{implementation}': {source}")]
	Resolve {
		/// Implementation type name.
		implementation: String,
		/// Provider error.
		#[source]
		source: BoxError,
	},

	/// The provider returned an instance of another type.
	#[error("instance provider returned a value that is not '{0}'")]
	InstanceMismatch(String),
}

/// Umbrella error for the startup pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error(transparent)]
	Registration(#[from] RegistrationError),

	#[error(transparent)]
	RouteConflict(#[from] RouteConflictError),

	#[error(transparent)]
	Synthesis(#[from] SynthesisError),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Failures binding a named argument inside a forwarder.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArgumentError {
	/// No value was supplied for the parameter.
	#[error("missing argument '{0}'")]
	Missing(String),

	/// The supplied value does not fit the parameter type.
	#[error("invalid argument '{name}': {source}")]
	Invalid {
		/// Parameter name.
		name: String,
		/// Conversion failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Failures of the reference [`crate::provider::ServiceProvider`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
	/// No factory is registered for the implementation.
	#[error("no factory registered for '{0}'")]
	NotRegistered(String),

	/// The factory produced a value of another type.
	#[error("factory for '{0}' produced a value of another type")]
	TypeMismatch(String),
}
