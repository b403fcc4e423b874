//! Bootstrap pipeline
//!
//! ```text
//! AutomaticApiBuilder ──build()──▶ RouteModel ──synthesize()──▶ ApiSurface
//!      (registering)                 (built)                    (frozen)
//! ```
//!
//! Registration methods take `&self`, so several startup tasks may register
//! concurrently. `build()` consumes the builder and fails on the first error;
//! nothing is synthesized from a model that did not build.

use crate::binding::{ApiContract, ApiImplementation, Implements, ServiceBinding};
use crate::error::{ApiResult, RegistrationError, SynthesisError};
use crate::host::{ApiSurface, ExposedController};
use crate::registry::{validate_base_type, ContractRegistry, Overrides};
use crate::route_model::{RouteModel, RouteModelBuilder};
use crate::settings::ApiOptions;
use crate::synthesis::AdapterSynthesizer;
use crate::verbs::VerbTable;
use std::sync::Arc;
use tracing::info;

/// Collects registrations and builds the route model.
///
/// # Examples
///
/// ```
/// use reinhardt_autoapi::AutomaticApiBuilder;
///
/// let surface = AutomaticApiBuilder::new().build_surface().unwrap();
/// assert!(surface.is_empty());
/// ```
#[derive(Debug)]
pub struct AutomaticApiBuilder {
	options: ApiOptions,
	registry: ContractRegistry,
	synthesizer: Arc<AdapterSynthesizer>,
}

impl AutomaticApiBuilder {
	pub fn new() -> Self {
		Self::with_options(ApiOptions::default())
	}

	pub fn with_options(options: ApiOptions) -> Self {
		Self {
			registry: ContractRegistry::new(options.name_suffixes.iter().cloned()),
			options,
			synthesizer: Arc::new(AdapterSynthesizer::new()),
		}
	}

	/// Share an adapter cache with other builders.
	pub fn with_synthesizer(mut self, synthesizer: Arc<AdapterSynthesizer>) -> Self {
		self.synthesizer = synthesizer;
		self
	}

	pub fn options(&self) -> &ApiOptions {
		&self.options
	}

	/// Edit the verb table before building.
	pub fn verb_table_mut(&mut self) -> &mut VerbTable {
		&mut self.options.verbs
	}

	/// Register contract `C` implemented by `I`.
	pub fn add_contract<C, I>(&self, overrides: Overrides) -> Result<&Self, RegistrationError>
	where
		C: ?Sized + ApiContract,
		I: Implements<C>,
	{
		self.registry.register(ServiceBinding::new::<C, I>(), overrides)?;
		Ok(self)
	}

	/// Register a prepared binding.
	pub fn add_binding(&self, binding: ServiceBinding, overrides: Overrides) -> Result<&Self, RegistrationError> {
		self.registry.register(binding, overrides)?;
		Ok(self)
	}

	/// Register every contract `I` declares directly.
	pub fn add_implementation<I: ApiImplementation>(&self) -> Result<&Self, RegistrationError> {
		self.registry.register_type::<I>()?;
		Ok(self)
	}

	/// Register every `register_api!` submission under `scan_root` that `predicate` accepts.
	pub fn add_assembly<P>(&self, scan_root: &str, predicate: P) -> Result<usize, RegistrationError>
	where
		P: Fn(&ServiceBinding) -> bool,
	{
		self.registry.register_assembly(scan_root, predicate)
	}

	/// Suppress methods of `C` for every registration of it.
	pub fn suppress<C, I, S>(&self, names: I) -> &Self
	where
		C: ?Sized + ApiContract,
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.registry.suppress(&C::contract_info().id, names);
		self
	}

	pub fn registry(&self) -> &ContractRegistry {
		&self.registry
	}

	/// Freeze registrations and build the route model.
	pub fn build(self) -> ApiResult<RouteModel> {
		if let Some(base) = &self.options.controller_base_type {
			validate_base_type(base)?;
		}
		self.registry.freeze();
		let descriptors = self.registry.descriptors();
		let model = RouteModelBuilder::new(&self.options).build(descriptors)?;
		info!(
			controllers = model.controllers.len(),
			actions = model.action_count(),
			"built route model"
		);
		Ok(model)
	}

	/// [`AutomaticApiBuilder::build`] followed by synthesis.
	pub fn build_surface(self) -> ApiResult<ApiSurface> {
		let synthesizer = Arc::clone(&self.synthesizer);
		let model = self.build()?;
		Ok(model.synthesize(&synthesizer)?)
	}
}

impl Default for AutomaticApiBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl RouteModel {
	/// Synthesize one adapter per controller.
	pub fn synthesize(&self, synthesizer: &AdapterSynthesizer) -> Result<ApiSurface, SynthesisError> {
		let controllers = self
			.controllers
			.iter()
			.map(|controller| {
				Ok(ExposedController {
					adapter: synthesizer.synthesize(controller, &self.options)?,
					actions: controller.actions.clone(),
				})
			})
			.collect::<Result<Vec<_>, SynthesisError>>()?;
		info!(controllers = controllers.len(), "api surface ready");
		Ok(ApiSurface::new(controllers))
	}
}
