//! Contract registry
//!
//! Collects [`Descriptor`]s during startup. Every registration is validated
//! immediately: a contract that cannot be exposed is rejected at the call that
//! registered it, not later when routes are built.

use crate::binding::{ApiImplementation, ServiceBinding};
use crate::error::RegistrationError;
use crate::metadata::{
	Attribute, BaseType, ContractId, ContractInfo, ContractKind, ImplementationInfo, MethodInfo,
};
use crate::synthesis::derive_name;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-registration overrides.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub controller_name: Option<String>,
	pub controller_base_type: Option<BaseType>,
	pub suppressed_methods: BTreeSet<String>,
	pub attributes: Vec<Attribute>,
	pub suppress_global_attributes: bool,
	pub suppress_default_route_template: bool,
	pub suppress_api_behavior: bool,
}

impl Overrides {
	/// Overrides that change nothing.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::Overrides;
	///
	/// let overrides = Overrides::new().controller_name("Students").suppress(["DeleteAsync"]);
	/// assert_eq!(overrides.controller_name.as_deref(), Some("Students"));
	/// assert!(overrides.suppressed_methods.contains("DeleteAsync"));
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the derived controller name.
	pub fn controller_name(mut self, name: impl Into<String>) -> Self {
		self.controller_name = Some(name.into());
		self
	}

	/// Base type for this adapter. Must derive from the controller base.
	pub fn controller_base_type(mut self, base: BaseType) -> Self {
		self.controller_base_type = Some(base);
		self
	}

	/// Exclude methods by name.
	pub fn suppress<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.suppressed_methods.extend(names.into_iter().map(Into::into));
		self
	}

	/// Add a controller attribute for this registration only.
	pub fn attribute(mut self, attribute: Attribute) -> Self {
		self.attributes.push(attribute);
		self
	}

	/// Skip [`ApiOptions::controller_attributes`](crate::ApiOptions::controller_attributes) for this adapter.
	pub fn suppress_global_attributes(mut self) -> Self {
		self.suppress_global_attributes = true;
		self
	}

	/// Leave the controller without the default route prefix.
	pub fn suppress_default_route_template(mut self) -> Self {
		self.suppress_default_route_template = true;
		self
	}

	/// Do not add [`Attribute::ApiBehavior`] to this adapter.
	pub fn suppress_api_behavior(mut self) -> Self {
		self.suppress_api_behavior = true;
		self
	}
}

/// A validated registration.
#[derive(Debug, Clone)]
pub struct Descriptor {
	pub binding: ServiceBinding,
	/// Adapter name, after overrides.
	pub derived_name: String,
	pub controller_base_type: Option<BaseType>,
	/// Method names removed from the API surface, every source merged.
	pub suppressed_methods: BTreeSet<String>,
	pub attributes: Vec<Attribute>,
	pub suppress_global_attributes: bool,
	pub suppress_default_route_template: bool,
	pub suppress_api_behavior: bool,
}

impl Descriptor {
	/// The registered contract.
	pub fn contract(&self) -> &Arc<ContractInfo> {
		self.binding.contract()
	}

	/// The implementation the adapter forwards to.
	pub fn implementation(&self) -> &Arc<ImplementationInfo> {
		self.binding.implementation()
	}

	/// Whether `method` is kept off the API surface.
	pub fn is_suppressed(&self, method: &MethodInfo) -> bool {
		method.is_suppressed() || self.suppressed_methods.contains(method.name())
	}
}

/// Entry submitted with [`register_api!`](crate::register_api) for assembly scanning.
pub struct ApiRegistration {
	pub module_path: &'static str,
	pub implementation: fn() -> ImplementationInfo,
	pub bindings: fn() -> Vec<ServiceBinding>,
}

inventory::collect!(ApiRegistration);

impl ApiRegistration {
	fn is_under(&self, scan_root: &str) -> bool {
		self.module_path == scan_root
			|| self
				.module_path
				.strip_prefix(scan_root)
				.is_some_and(|rest| rest.starts_with("::"))
	}
}

/// Submit an [`ApiImplementation`] for [`ContractRegistry::register_assembly`].
///
/// # Example
///
/// ```rust,ignore
/// use reinhardt_autoapi::register_api;
///
/// register_api!(TeacherService);
/// ```
#[macro_export]
macro_rules! register_api {
	($implementation:ty) => {
		$crate::inventory::submit! {
			$crate::registry::ApiRegistration {
				module_path: module_path!(),
				implementation: <$implementation as $crate::ApiImplementation>::implementation_info,
				bindings: <$implementation as $crate::ApiImplementation>::bindings,
			}
		}
	};
}

#[derive(Default)]
struct RegistryState {
	descriptors: Vec<Descriptor>,
	names: HashMap<String, usize>,
	suppressions: HashMap<ContractId, BTreeSet<String>>,
	frozen: bool,
}

/// Registration records, shared by every bootstrap thread.
pub struct ContractRegistry {
	name_suffixes: Vec<String>,
	state: Mutex<RegistryState>,
}

impl fmt::Debug for ContractRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("ContractRegistry")
			.field("name_suffixes", &self.name_suffixes)
			.field("descriptors", &state.descriptors)
			.field("frozen", &state.frozen)
			.finish()
	}
}

impl ContractRegistry {
	/// Empty registry deriving names with `name_suffixes`.
	pub fn new<I, S>(name_suffixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			name_suffixes: name_suffixes.into_iter().map(Into::into).collect(),
			state: Mutex::new(RegistryState::default()),
		}
	}

	/// Register one contract/implementation pair.
	///
	/// The same pair registered again is stored once. A second implementation
	/// for an already registered contract is ignored with a warning.
	pub fn register(&self, binding: ServiceBinding, overrides: Overrides) -> Result<(), RegistrationError> {
		let contract = Arc::clone(binding.contract());
		validate_contract(&contract, &binding)?;

		if let Some(base) = &overrides.controller_base_type {
			validate_base_type(base)?;
		}

		let derived_name = overrides
			.controller_name
			.clone()
			.unwrap_or_else(|| derive_name(&contract.name(), &self.name_suffixes));

		let mut state = self.state.lock();
		if state.frozen {
			return Err(RegistrationError::Frozen(contract.id.clone()));
		}

		if let Some(&index) = state.names.get(&derived_name) {
			let existing = &state.descriptors[index];
			if existing.contract().id != contract.id {
				return Err(RegistrationError::NameCollision {
					name: derived_name,
					existing: existing.contract().id.clone(),
					incoming: contract.id.clone(),
				});
			}
		}

		if let Some(existing) = state.descriptors.iter().find(|d| d.contract().id == contract.id) {
			if existing.binding.key() == binding.key() {
				debug!(contract = %contract.id, implementation = %binding.key().name, "pair already registered");
			} else {
				warn!(
					contract = %contract.id,
					kept = %existing.binding.key().name,
					ignored = %binding.key().name,
					"contract already has an implementation; keeping the first registration"
				);
			}
			return Ok(());
		}

		let mut suppressed_methods = contract_suppressions(&contract);
		suppressed_methods.extend(overrides.suppressed_methods);

		info!(
			contract = %contract.id,
			implementation = %binding.key().name,
			name = %derived_name,
			"registered automatic api"
		);

		let index = state.descriptors.len();
		state.names.insert(derived_name.clone(), index);
		state.descriptors.push(Descriptor {
			binding,
			derived_name,
			controller_base_type: overrides.controller_base_type,
			suppressed_methods,
			attributes: overrides.attributes,
			suppress_global_attributes: overrides.suppress_global_attributes,
			suppress_default_route_template: overrides.suppress_default_route_template,
			suppress_api_behavior: overrides.suppress_api_behavior,
		});
		Ok(())
	}

	/// Register every contract `info` declares directly, using the matching
	/// binding from `bindings`.
	pub fn register_implementation(
		&self,
		info: &ImplementationInfo,
		bindings: Vec<ServiceBinding>,
	) -> Result<(), RegistrationError> {
		for contract in info.declared_contracts() {
			let binding = bindings
				.iter()
				.find(|b| b.contract().id == contract.id)
				.cloned()
				.ok_or_else(|| RegistrationError::MissingBinding {
					contract: contract.id.clone(),
					implementation: info.name.clone(),
				})?;
			self.register(binding, Overrides::default())?;
		}
		Ok(())
	}

	/// [`ContractRegistry::register_implementation`] for an [`ApiImplementation`].
	pub fn register_type<I: ApiImplementation>(&self) -> Result<(), RegistrationError> {
		self.register_implementation(&I::implementation_info(), I::bindings())
	}

	/// Register every submitted implementation under `scan_root`.
	///
	/// Abstract and generic implementations are skipped. Returns the number of
	/// bindings accepted by `predicate`.
	pub fn register_assembly<P>(&self, scan_root: &str, predicate: P) -> Result<usize, RegistrationError>
	where
		P: Fn(&ServiceBinding) -> bool,
	{
		let mut accepted = 0;
		for entry in inventory::iter::<ApiRegistration> {
			if !entry.is_under(scan_root) {
				continue;
			}
			let info = (entry.implementation)();
			if info.is_abstract || info.is_generic {
				debug!(implementation = %info.name, "skipping abstract or generic implementation");
				continue;
			}
			let declared: Vec<ContractId> = info.declared_contracts().iter().map(|c| c.id.clone()).collect();
			let bindings = (entry.bindings)();
			for id in declared {
				let binding = bindings
					.iter()
					.find(|b| b.contract().id == id)
					.cloned()
					.ok_or_else(|| RegistrationError::MissingBinding {
						contract: id.clone(),
						implementation: info.name.clone(),
					})?;
				if predicate(&binding) {
					self.register(binding, Overrides::default())?;
					accepted += 1;
				}
			}
		}
		info!(scan_root, accepted, "scanned for automatic apis");
		Ok(accepted)
	}

	/// Suppress methods of a contract for every registration of it.
	pub fn suppress<I, S>(&self, contract: &ContractId, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.state
			.lock()
			.suppressions
			.entry(contract.clone())
			.or_default()
			.extend(names.into_iter().map(Into::into));
	}

	/// Snapshot of the stored descriptors, registry-wide suppressions merged in.
	pub fn descriptors(&self) -> Vec<Descriptor> {
		let state = self.state.lock();
		state
			.descriptors
			.iter()
			.map(|descriptor| {
				let mut descriptor = descriptor.clone();
				if let Some(extra) = state.suppressions.get(&descriptor.contract().id) {
					descriptor.suppressed_methods.extend(extra.iter().cloned());
				}
				descriptor
			})
			.collect()
	}

	/// Number of stored descriptors.
	pub fn len(&self) -> usize {
		self.state.lock().descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Reject further registrations.
	pub fn freeze(&self) {
		self.state.lock().frozen = true;
	}
}

fn validate_contract(contract: &ContractInfo, binding: &ServiceBinding) -> Result<(), RegistrationError> {
	if contract.kind != ContractKind::Interface {
		return Err(RegistrationError::NotInterface(contract.id.clone()));
	}
	if !contract.capability {
		return Err(RegistrationError::MissingCapability(contract.id.clone()));
	}

	let methods = contract.effective_methods();
	let mut by_name: HashMap<&str, &MethodInfo> = HashMap::new();
	for method in &methods {
		if let Some(first) = by_name.insert(method.name(), method) {
			return Err(RegistrationError::AmbiguousMethod {
				contract: contract.id.clone(),
				name: method.name().to_string(),
				first: first.id.clone(),
				second: method.id.clone(),
			});
		}
	}

	let missing: Vec<String> = methods
		.iter()
		.filter(|m| !binding.forwarders().contains(m.name()))
		.map(|m| m.name().to_string())
		.collect();
	if !missing.is_empty() {
		return Err(RegistrationError::NonConforming {
			contract: contract.id.clone(),
			implementation: binding.key().name.clone(),
			missing,
		});
	}
	Ok(())
}

pub(crate) fn validate_base_type(base: &BaseType) -> Result<(), RegistrationError> {
	if base.is_assignable_to(BaseType::CONTROLLER_BASE) {
		Ok(())
	} else {
		Err(RegistrationError::InvalidBaseType {
			base: base.name.clone(),
			required: BaseType::CONTROLLER_BASE.to_string(),
		})
	}
}

// Names suppressed by annotations anywhere in the hierarchy. A contract-level
// annotation only covers methods reachable through that contract.
fn contract_suppressions(contract: &ContractInfo) -> BTreeSet<String> {
	let mut names = BTreeSet::new();
	for annotated in contract.hierarchy() {
		let reachable = annotated.effective_methods();
		for attribute in &annotated.attributes {
			let Attribute::Suppress(suppression) = attribute else {
				continue;
			};
			names.extend(
				reachable
					.iter()
					.filter(|m| suppression.covers(m.name()))
					.map(|m| m.name().to_string()),
			);
		}
		names.extend(
			annotated
				.methods
				.iter()
				.filter(|m| m.is_suppressed())
				.map(|m| m.name().to_string()),
		);
	}
	names
}
