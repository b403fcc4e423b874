//! Adapter synthesis
//!
//! An [`AdapterType`] is the handler a host sees for one registered contract:
//! a name, a base type, controller attributes and one method per contract
//! method. Each request gets an [`AdapterInstance`], which resolves the
//! implementation once and forwards calls to it unchanged.

use crate::binding::{ActionFuture, Arguments, BoundService, ServiceBinding};
use crate::error::{BoxError, DispatchError, SynthesisError};
use crate::metadata::{Attribute, BaseType, ContractInfo, ImplementationInfo, MethodInfo, ParamInfo};
use crate::provider::InstanceProvider;
use crate::route_model::ControllerModel;
use crate::settings::ApiOptions;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Suffix appended to a derived name to form the controller name.
pub const CONTROLLER_SUFFIX: &str = "Controller";

/// Derive an adapter name from a contract name.
///
/// A leading `I` is dropped when it marks an interface (followed by an
/// uppercase letter), then the longest matching suffix is dropped as long as
/// something remains. Generic arguments are appended after `Of`.
///
/// # Examples
///
/// ```
/// use reinhardt_autoapi::synthesis::derive_name;
///
/// let suffixes = vec!["Service".to_string(), "ApiService".to_string()];
/// assert_eq!(derive_name("IStudentService", &suffixes), "Student");
/// assert_eq!(derive_name("IReportApiService", &suffixes), "Report");
/// assert_eq!(derive_name("Inventory", &suffixes), "Inventory");
/// assert_eq!(derive_name("IService", &suffixes), "Service");
/// assert_eq!(derive_name("IGeneralService<Teacher>", &suffixes), "GeneralOfTeacher");
/// ```
pub fn derive_name(contract_name: &str, suffixes: &[String]) -> String {
	let (base, generics) = match contract_name.split_once('<') {
		Some((base, rest)) => (base, Some(rest.trim_end_matches('>'))),
		None => (contract_name, None),
	};

	let mut name = base;
	if let Some(rest) = name.strip_prefix('I')
		&& rest.chars().next().is_some_and(|c| c.is_ascii_uppercase())
	{
		name = rest;
	}

	let mut candidates: Vec<&String> = suffixes.iter().filter(|s| !s.is_empty()).collect();
	candidates.sort_by(|a, b| b.len().cmp(&a.len()));
	if let Some(stripped) = candidates
		.into_iter()
		.find_map(|suffix| name.strip_suffix(suffix.as_str()).filter(|rest| !rest.is_empty()))
	{
		name = stripped;
	}

	match generics {
		Some(args) => {
			let args: String = args
				.split(|c: char| matches!(c, ',' | '<' | '>' | ' '))
				.filter(|segment| !segment.is_empty())
				.collect();
			format!("{}Of{}", name, args)
		}
		None => name.to_string(),
	}
}

/// A contract method carried onto an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterMethod {
	pub name: String,
	/// The contract method this one forwards to.
	pub origin: MethodInfo,
	pub params: Vec<ParamInfo>,
	pub attributes: Vec<Attribute>,
}

/// A synthesized handler type. Immutable once built.
#[derive(Debug)]
pub struct AdapterType {
	pub derived_name: String,
	pub controller_name: String,
	pub contract: Arc<ContractInfo>,
	pub implementation: Arc<ImplementationInfo>,
	pub base_type: BaseType,
	pub route_prefix: Option<String>,
	pub attributes: Vec<Attribute>,
	pub methods: Vec<AdapterMethod>,
	binding: ServiceBinding,
}

impl AdapterType {
	/// Adapter method forwarding to the contract method `name`.
	pub fn method(&self, name: &str) -> Option<&AdapterMethod> {
		self.methods.iter().find(|m| m.name == name)
	}

	pub fn has_attribute(&self, attribute: &Attribute) -> bool {
		self.attributes.contains(attribute)
	}

	/// Create a per-request instance resolving through `provider`.
	pub fn instantiate(self: &Arc<Self>, provider: Arc<dyn InstanceProvider>) -> AdapterInstance {
		AdapterInstance {
			adapter: Arc::clone(self),
			provider,
			bound: tokio::sync::OnceCell::new(),
		}
	}
}

/// A per-request adapter.
pub struct AdapterInstance {
	adapter: Arc<AdapterType>,
	provider: Arc<dyn InstanceProvider>,
	bound: tokio::sync::OnceCell<Arc<dyn BoundService>>,
}

impl AdapterInstance {
	pub fn adapter(&self) -> &Arc<AdapterType> {
		&self.adapter
	}

	/// Forward one call.
	///
	/// The implementation is resolved on the first call and reused after that.
	/// The returned future is the implementation's own; its error is not wrapped.
	pub async fn invoke(&self, action: &str, args: Arguments) -> Result<ActionFuture, DispatchError> {
		let unknown = || DispatchError::UnknownAction {
			adapter: self.adapter.derived_name.clone(),
			action: action.to_string(),
		};
		if self.adapter.method(action).is_none() {
			return Err(unknown());
		}

		let adapter = Arc::clone(&self.adapter);
		let provider = Arc::clone(&self.provider);
		let bound = self
			.bound
			.get_or_try_init(|| async move {
				let binding = &adapter.binding;
				let instance = provider
					.resolve(binding.key())
					.await
					.map_err(|source| DispatchError::Resolve {
						implementation: binding.key().name.clone(),
						source,
					})?;
				binding.bind(instance)
			})
			.await?;

		bound.forward(action, args).ok_or_else(unknown)
	}

	/// [`AdapterInstance::invoke`] and await the result.
	pub async fn call(&self, action: &str, args: Arguments) -> Result<Value, BoxError> {
		self.invoke(action, args).await?.await
	}
}

type CacheCell = Arc<OnceCell<Arc<AdapterType>>>;

/// Builds adapters, caching them by derived name.
#[derive(Debug, Default)]
pub struct AdapterSynthesizer {
	cache: Mutex<HashMap<String, CacheCell>>,
}

impl AdapterSynthesizer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adapter for `controller`, built at most once per derived name.
	///
	/// Concurrent callers for the same name wait for the first build.
	pub fn synthesize(
		&self,
		controller: &ControllerModel,
		options: &ApiOptions,
	) -> Result<Arc<AdapterType>, SynthesisError> {
		let descriptor = &controller.descriptor;
		let name = &descriptor.derived_name;
		let cell = Arc::clone(self.cache.lock().entry(name.clone()).or_default());

		let mut built = false;
		let adapter = cell
			.get_or_try_init(|| {
				built = true;
				build_adapter(controller, options).map(Arc::new)
			})?
			.clone();

		if adapter.contract.id != descriptor.contract().id {
			return Err(SynthesisError::NameCollision {
				name: name.clone(),
				existing: adapter.contract.id.clone(),
				incoming: descriptor.contract().id.clone(),
			});
		}
		if built {
			info!(adapter = %adapter.controller_name, methods = adapter.methods.len(), "synthesized adapter");
		} else {
			debug!(adapter = %adapter.controller_name, "adapter cache hit");
		}
		Ok(adapter)
	}

	/// Adapter already built for `name`, if any.
	pub fn cached(&self, name: &str) -> Option<Arc<AdapterType>> {
		self.cache.lock().get(name).and_then(|cell| cell.get().cloned())
	}

	pub fn len(&self) -> usize {
		self.cache.lock().values().filter(|cell| cell.get().is_some()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn build_adapter(controller: &ControllerModel, options: &ApiOptions) -> Result<AdapterType, SynthesisError> {
	let descriptor = &controller.descriptor;
	let contract = descriptor.contract();
	let binding = &descriptor.binding;

	let mut methods = Vec::new();
	for method in contract.effective_methods() {
		if !binding.forwarders().contains(method.name()) {
			return Err(SynthesisError::MissingForwarder {
				adapter: descriptor.derived_name.clone(),
				action: method.name().to_string(),
			});
		}
		validate_placement(method)?;
		methods.push(AdapterMethod {
			name: method.name().to_string(),
			origin: method.clone(),
			params: method.params.clone(),
			attributes: method.attributes.clone(),
		});
	}

	// ancestors first, the registered contract last
	let mut attributes: Vec<Attribute> = contract
		.hierarchy()
		.into_iter()
		.rev()
		.flat_map(|c| c.attributes.iter().cloned())
		.collect();
	if !descriptor.suppress_global_attributes {
		attributes.extend(options.controller_attributes.iter().cloned());
	}
	attributes.extend(descriptor.attributes.iter().cloned());

	if let Some(prefix) = &controller.route_prefix
		&& !attributes.iter().any(Attribute::is_route)
	{
		attributes.push(Attribute::Route(prefix.clone()));
	}
	if options.use_api_behavior
		&& !descriptor.suppress_api_behavior
		&& !attributes.contains(&Attribute::ApiBehavior)
	{
		attributes.push(Attribute::ApiBehavior);
	}

	Ok(AdapterType {
		derived_name: descriptor.derived_name.clone(),
		controller_name: format!("{}{}", descriptor.derived_name, CONTROLLER_SUFFIX),
		contract: Arc::clone(contract),
		implementation: Arc::clone(descriptor.implementation()),
		base_type: options.base_type(descriptor.controller_base_type.as_ref()),
		route_prefix: controller.route_prefix.clone(),
		attributes,
		methods,
		binding: binding.clone(),
	})
}

// Route, verb and suppression annotations only make sense on methods;
// binding hints only on parameters.
fn validate_placement(method: &MethodInfo) -> Result<(), SynthesisError> {
	if method.attributes.iter().any(|a| matches!(a, Attribute::Bind(_))) {
		return Err(SynthesisError::Metadata {
			method: method.id.clone(),
			reason: "binding hint attached to a method".to_string(),
		});
	}
	for param in &method.params {
		if param.attributes.iter().any(|a| {
			matches!(
				a,
				Attribute::Route(_) | Attribute::HttpMethod(_) | Attribute::Suppress(_) | Attribute::ApiBehavior
			)
		}) {
			return Err(SynthesisError::Metadata {
				method: method.id.clone(),
				reason: format!("method-level annotation on parameter '{}'", param.name),
			});
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn suffixes(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	#[rstest]
	#[case("IStudentService", &["Service"], "Student")]
	#[case("StudentService", &["Service"], "Student")]
	#[case("IStudentAutoApiService", &["Service", "ApiService", "AutoApiService"], "Student")]
	#[case("Inventory", &["Service"], "Inventory")]
	#[case("IService", &["Service"], "Service")]
	#[case("I", &["Service"], "I")]
	#[case("IDemoAService", &["Service"], "DemoA")]
	#[case("IStudentService", &[], "StudentService")]
	fn test_derive_name(#[case] contract: &str, #[case] list: &[&str], #[case] expected: &str) {
		assert_eq!(derive_name(contract, &suffixes(list)), expected);
	}
}
