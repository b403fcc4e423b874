//! Host boundary
//!
//! The frozen [`ApiSurface`] is everything a host framework needs: the
//! adapters, their actions and a way back from a generated method to the
//! contract method it forwards to.

use crate::metadata::MethodInfo;
use crate::provider::InstanceProvider;
use crate::route_model::{ActionDescriptor, Visibility};
use crate::synthesis::{AdapterInstance, AdapterType};
use http::Method;
use std::sync::Arc;
use tracing::debug;

/// Implemented by the host to receive generated controllers.
pub trait HostBinding {
	fn add_controller(&mut self, adapter: &Arc<AdapterType>, actions: &[ActionDescriptor]);
}

/// An adapter with its routed actions.
#[derive(Debug, Clone)]
pub struct ExposedController {
	pub adapter: Arc<AdapterType>,
	pub actions: Vec<ActionDescriptor>,
}

/// One routed action, flattened for hosts that register routes one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
	pub verb: Method,
	pub path: String,
	pub controller: String,
	pub action: String,
	pub visibility: Visibility,
}

/// Immutable set of generated controllers.
#[derive(Debug, Clone, Default)]
pub struct ApiSurface {
	controllers: Vec<ExposedController>,
}

impl ApiSurface {
	pub(crate) fn new(controllers: Vec<ExposedController>) -> Self {
		Self { controllers }
	}

	/// Every adapter with the actions it exposes.
	pub fn controllers(&self) -> impl Iterator<Item = (&Arc<AdapterType>, &[ActionDescriptor])> {
		self.controllers
			.iter()
			.map(|c| (&c.adapter, c.actions.as_slice()))
	}

	/// Look up a controller by derived or controller name.
	pub fn controller(&self, name: &str) -> Option<&ExposedController> {
		self.controllers
			.iter()
			.find(|c| c.adapter.derived_name == name || c.adapter.controller_name == name)
	}

	pub fn len(&self) -> usize {
		self.controllers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.controllers.is_empty()
	}

	/// Hand every controller to the host.
	pub fn expose<H: HostBinding + ?Sized>(&self, host: &mut H) {
		for controller in &self.controllers {
			debug!(
				controller = %controller.adapter.controller_name,
				actions = controller.actions.len(),
				"exposing controller"
			);
			host.add_controller(&controller.adapter, &controller.actions);
		}
	}

	/// Every action with its full path.
	pub fn routes(&self) -> Vec<RouteEntry> {
		self.controllers
			.iter()
			.flat_map(|controller| {
				let prefix = controller.adapter.route_prefix.as_deref();
				controller.actions.iter().map(move |action| RouteEntry {
					verb: action.verb.clone(),
					path: action.full_route(prefix),
					controller: controller.adapter.controller_name.clone(),
					action: action.action_name.clone(),
					visibility: action.visibility,
				})
			})
			.collect()
	}

	/// The contract method behind a generated action.
	pub fn originating_method(&self, adapter: &str, action: &str) -> Option<&MethodInfo> {
		self.controller(adapter)?
			.adapter
			.method(action)
			.map(|method| &method.origin)
	}

	/// Per-request instance of a controller.
	pub fn instantiate(&self, adapter: &str, provider: Arc<dyn InstanceProvider>) -> Option<AdapterInstance> {
		self.controller(adapter).map(|c| c.adapter.instantiate(provider))
	}
}
