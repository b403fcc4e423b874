//! Route model
//!
//! Expands registered descriptors into one [`ActionDescriptor`] per exposed
//! method. Building the model is pure: it reads descriptors and options and
//! fails on the first route conflict.

use crate::convention::NameConventionResolver;
use crate::error::RouteConflictError;
use crate::metadata::{Attribute, BindingSource, ContractInfo, MethodId, MethodInfo, MethodKind, MethodVisibility};
use crate::registry::Descriptor;
use crate::settings::{ApiOptions, CONTROLLER_PLACEHOLDER};
use http::Method;
use std::collections::HashMap;
use tracing::debug;

/// Whether an action appears in API documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
	#[default]
	Visible,
	Hidden,
}

/// Where an action's verb and route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
	/// Both inferred from the method name.
	Convention,
	/// Verb annotated, route inferred.
	ExplicitVerb,
	/// Route annotated, verb inferred.
	ExplicitRoute,
	/// Both annotated.
	Explicit,
}

/// How the host binds one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
	pub name: String,
	pub ty: String,
	/// `None` leaves the choice to the host.
	pub source: Option<BindingSource>,
	/// Attributes of the contract parameter, unchanged.
	pub attributes: Vec<Attribute>,
}

/// One exposed method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
	pub method: MethodId,
	pub action_name: String,
	pub verb: Method,
	/// Action route relative to the controller prefix.
	pub route: String,
	pub parameters: Vec<ParameterBinding>,
	pub visibility: Visibility,
	pub source: RouteSource,
}

impl ActionDescriptor {
	/// Route joined with the controller prefix.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::route_model::join_route;
	///
	/// assert_eq!(join_route(Some("api/Teacher"), "{id}"), "api/Teacher/{id}");
	/// assert_eq!(join_route(Some("api/Teacher"), ""), "api/Teacher");
	/// assert_eq!(join_route(None, "Teach"), "Teach");
	/// ```
	pub fn full_route(&self, prefix: Option<&str>) -> String {
		join_route(prefix, &self.route)
	}
}

/// Join a controller prefix and an action route with a single `/`.
///
/// # Examples
///
/// ```
/// use reinhardt_autoapi::route_model::join_route;
///
/// assert_eq!(join_route(Some("api/Student"), "{id}"), "api/Student/{id}");
/// assert_eq!(join_route(Some("api/Student/"), ""), "api/Student");
/// assert_eq!(join_route(None, "{id}"), "{id}");
/// ```
pub fn join_route(prefix: Option<&str>, route: &str) -> String {
	let prefix = prefix.map(|p| p.trim_end_matches('/')).unwrap_or_default();
	let route = route.trim_start_matches('/');
	match (prefix.is_empty(), route.is_empty()) {
		(true, _) => route.to_string(),
		(false, true) => prefix.to_string(),
		(false, false) => format!("{}/{}", prefix, route),
	}
}

/// Actions of one descriptor.
#[derive(Debug, Clone)]
pub struct ControllerModel {
	pub descriptor: Descriptor,
	pub route_prefix: Option<String>,
	pub actions: Vec<ActionDescriptor>,
}

impl ControllerModel {
	/// Action generated for the method called `name`.
	pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
		self.actions.iter().find(|a| a.action_name == name)
	}
}

/// The built route model, ready for synthesis.
#[derive(Debug, Clone)]
pub struct RouteModel {
	pub controllers: Vec<ControllerModel>,
	pub options: ApiOptions,
}

impl RouteModel {
	/// Controller registered under `derived_name`.
	pub fn controller(&self, derived_name: &str) -> Option<&ControllerModel> {
		self.controllers
			.iter()
			.find(|c| c.descriptor.derived_name == derived_name)
	}

	/// Actions across every controller.
	pub fn action_count(&self) -> usize {
		self.controllers.iter().map(|c| c.actions.len()).sum()
	}
}

/// Builds action descriptors from registrations.
pub struct RouteModelBuilder<'a> {
	options: &'a ApiOptions,
	resolver: NameConventionResolver,
}

impl<'a> RouteModelBuilder<'a> {
	/// Builder inferring routes with `options`.
	pub fn new(options: &'a ApiOptions) -> Self {
		Self {
			options,
			resolver: options.resolver(),
		}
	}

	/// Build a controller per descriptor. Fails on the first route conflict.
	pub fn build(&self, descriptors: Vec<Descriptor>) -> Result<RouteModel, RouteConflictError> {
		let controllers = descriptors
			.into_iter()
			.map(|descriptor| self.build_controller(descriptor))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(RouteModel {
			controllers,
			options: self.options.clone(),
		})
	}

	/// Actions and route prefix for one descriptor.
	pub fn build_controller(&self, descriptor: Descriptor) -> Result<ControllerModel, RouteConflictError> {
		let contract = descriptor.contract();
		let mut actions = Vec::new();
		let mut seen: HashMap<(Method, String), MethodId> = HashMap::new();

		for method in contract.effective_methods() {
			if descriptor.is_suppressed(method) {
				debug!(method = %method.id, "suppressed");
				continue;
			}
			if !is_eligible(method) {
				debug!(method = %method.id, "not an action");
				continue;
			}

			let action = self.action_for(contract, method);
			let key = (action.verb.clone(), action.route.clone());
			if let Some(first) = seen.get(&key) {
				return Err(RouteConflictError {
					contract: contract.id.clone(),
					method: action.verb,
					route: action.route,
					first: first.clone(),
					second: method.id.clone(),
				});
			}
			seen.insert(key, method.id.clone());
			debug!(
				method = %method.id,
				verb = %action.verb,
				route = %action.route,
				source = ?action.source,
				"inferred action"
			);
			actions.push(action);
		}

		let route_prefix = self.route_prefix(&descriptor);
		Ok(ControllerModel {
			descriptor,
			route_prefix,
			actions,
		})
	}

	/// Action for one eligible method. Explicit annotations win over convention.
	pub fn action_for(&self, contract: &ContractInfo, method: &MethodInfo) -> ActionDescriptor {
		let explicit_verb = method.explicit_verb().or_else(|| {
			contract
				.hierarchy()
				.into_iter()
				.find(|c| c.id == method.id.contract)
				.and_then(|declaring| declaring.explicit_verb())
		});
		let explicit_route = method.explicit_route();

		let inferred = self.resolver.resolve(
			method.name(),
			method.has_param(crate::convention::ID_PARAMETER),
			explicit_route,
		);
		let verb = explicit_verb.cloned().unwrap_or(inferred.verb);
		let source = match (explicit_verb.is_some(), explicit_route.is_some()) {
			(false, false) => RouteSource::Convention,
			(true, false) => RouteSource::ExplicitVerb,
			(false, true) => RouteSource::ExplicitRoute,
			(true, true) => RouteSource::Explicit,
		};

		let route_params = template_parameters(&inferred.route);
		let parameters = method
			.params
			.iter()
			.map(|param| ParameterBinding {
				name: param.name.clone(),
				ty: param.ty.clone(),
				source: param.binding().cloned().or_else(|| {
					route_params
						.iter()
						.any(|p| *p == param.name)
						.then_some(BindingSource::Path)
				}),
				attributes: param.attributes.clone(),
			})
			.collect();

		let visibility = if method.attributes.contains(&Attribute::HideFromDocs) {
			Visibility::Hidden
		} else {
			Visibility::Visible
		};

		ActionDescriptor {
			method: method.id.clone(),
			action_name: method.name().to_string(),
			verb,
			route: inferred.route,
			parameters,
			visibility,
			source,
		}
	}

	/// Controller route: contract annotation, then registration or global
	/// attributes, then the default template.
	pub fn route_prefix(&self, descriptor: &Descriptor) -> Option<String> {
		let globals: &[Attribute] = if descriptor.suppress_global_attributes {
			&[]
		} else {
			&self.options.controller_attributes
		};
		let annotated = descriptor.contract().route_template().map(str::to_string).or_else(|| {
			descriptor
				.attributes
				.iter()
				.chain(globals)
				.find_map(|attr| match attr {
					Attribute::Route(template) => Some(template.clone()),
					_ => None,
				})
		});

		let template = match annotated {
			Some(template) => template,
			None if descriptor.suppress_default_route_template => return None,
			None if self.options.default_route_template.trim().is_empty() => return None,
			None => self.options.default_route_template.clone(),
		};
		Some(template.replace(CONTROLLER_PLACEHOLDER, &descriptor.derived_name))
	}
}

fn is_eligible(method: &MethodInfo) -> bool {
	method.kind == MethodKind::Instance && !method.generic && method.visibility == MethodVisibility::Public
}

/// Parameter names in a route template, constraints and catch-all markers removed.
///
/// # Examples
///
/// ```
/// use reinhardt_autoapi::route_model::template_parameters;
///
/// assert_eq!(template_parameters("{id}/Students/{name:alpha}/{*rest}"), vec!["id", "name", "rest"]);
/// ```
pub fn template_parameters(template: &str) -> Vec<String> {
	let mut names = Vec::new();
	let mut rest = template;
	while let Some(start) = rest.find('{') {
		let Some(len) = rest[start..].find('}') else {
			break;
		};
		let inner = &rest[start + 1..start + len];
		let name = inner
			.trim_start_matches('*')
			.split([':', '='])
			.next()
			.unwrap_or_default()
			.trim_end_matches('?');
		if !name.is_empty() {
			names.push(name.to_string());
		}
		rest = &rest[start + len + 1..];
	}
	names
}
