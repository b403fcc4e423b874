//! Automatic APIs for Reinhardt
//!
//! This crate exposes plain service traits as HTTP controllers. Verbs and
//! routes are inferred from method names (`GetAsync` is `GET`, `UpdateAsync(id)`
//! is `PUT {id}`), and every registered contract gets a synthesized adapter that
//! forwards each call to a lazily resolved implementation.
//!
//! ```rust,ignore
//! use reinhardt_autoapi::prelude::*;
//!
//! let builder = AutomaticApiBuilder::new();
//! builder.add_contract::<dyn ITeacherService, TeacherService>(Overrides::new())?;
//! builder.add_implementation::<TestService>()?;
//!
//! let surface = builder.build_surface()?;
//! surface.expose(&mut router);
//! ```

pub mod binding;
pub mod convention;
pub mod error;
pub mod host;
pub mod metadata;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod route_model;
pub mod settings;
pub mod synthesis;
pub mod verbs;

#[doc(hidden)]
pub use inventory;

pub use binding::{
	ActionFuture, ApiContract, ApiImplementation, Arguments, AutomaticApi, BoundService, DispatchTable,
	ImplementationKey, Implements, ServiceBinding,
};
pub use convention::{InferredRoute, NameConventionResolver};
pub use error::{
	ApiError, ApiResult, ArgumentError, BoxError, ConfigError, DispatchError, ProviderError, RegistrationError,
	RouteConflictError, SynthesisError,
};
pub use host::{ApiSurface, ExposedController, HostBinding, RouteEntry};
pub use pipeline::AutomaticApiBuilder;
pub use provider::{InstanceProvider, RequestScope, Scope, ServiceProvider};
pub use registry::{ContractRegistry, Descriptor, Overrides};
pub use route_model::{ActionDescriptor, ParameterBinding, RouteModel, RouteSource, Visibility};
pub use settings::{ApiOptions, ApiSettings};
pub use synthesis::{AdapterInstance, AdapterMethod, AdapterSynthesizer, AdapterType};
pub use verbs::VerbTable;

pub mod prelude {
	pub use crate::binding::{ApiContract, ApiImplementation, Arguments, AutomaticApi, DispatchTable, Implements};
	pub use crate::host::{ApiSurface, HostBinding};
	pub use crate::metadata::{Attribute, BindingSource, ContractInfo, ImplementationInfo, MethodInfo, ParamInfo, Suppression};
	pub use crate::pipeline::AutomaticApiBuilder;
	pub use crate::provider::{InstanceProvider, Scope, ServiceProvider};
	pub use crate::registry::Overrides;
	pub use crate::settings::ApiOptions;
}
