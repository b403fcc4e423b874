//! Contract bindings
//!
//! A contract is an ordinary trait extending [`AutomaticApi`]. Because Rust
//! cannot mint nominal types at runtime, each contract supplies a
//! [`DispatchTable`]: one forwarding closure per method, keyed by method name.
//! A [`ServiceBinding`] pairs that table with an implementation type and erases
//! both, so the registry and the synthesizer can work with any contract.
//!
//! ```rust
//! use reinhardt_autoapi::{ApiContract, AutomaticApi, DispatchTable, Implements};
//! use reinhardt_autoapi::metadata::{ContractInfo, MethodInfo};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! #[async_trait]
//! trait IDemoAService: AutomaticApi {
//!     async fn get(&self) -> String;
//! }
//!
//! impl ApiContract for dyn IDemoAService {
//!     fn contract_info() -> ContractInfo {
//!         ContractInfo::of::<Self>().method(MethodInfo::new("Get"))
//!     }
//!
//!     fn dispatch_table() -> DispatchTable<Self> {
//!         DispatchTable::new().forward("Get", |svc: Arc<Self>, _args| async move {
//!             Ok(serde_json::json!(svc.get().await))
//!         })
//!     }
//! }
//!
//! struct TestService;
//! impl AutomaticApi for TestService {}
//!
//! #[async_trait]
//! impl IDemoAService for TestService {
//!     async fn get(&self) -> String {
//!         "Hello AutomaticApi".to_string()
//!     }
//! }
//!
//! impl Implements<dyn IDemoAService> for TestService {
//!     fn into_contract(self: Arc<Self>) -> Arc<dyn IDemoAService> {
//!         self
//!     }
//! }
//! ```

use crate::error::{ArgumentError, BoxError, DispatchError};
use crate::metadata::{ContractInfo, ImplementationInfo};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Capability marker every API contract extends.
pub trait AutomaticApi: Send + Sync {}

/// The future returned by a forwarded call.
///
/// Its error is whatever the implementation returned; it is never wrapped.
pub type ActionFuture = BoxFuture<'static, Result<Value, BoxError>>;

/// A contract trait object that can be exposed automatically.
///
/// Implemented for `dyn Trait`, describing the trait's methods and how to call them.
pub trait ApiContract: AutomaticApi + 'static {
	fn contract_info() -> ContractInfo;

	fn dispatch_table() -> DispatchTable<Self>;
}

/// Conversion of an implementation into a contract trait object.
pub trait Implements<C: ?Sized + ApiContract>: Send + Sync + 'static {
	fn into_contract(self: Arc<Self>) -> Arc<C>;
}

/// An implementation that lists its own contracts, for
/// [`crate::AutomaticApiBuilder::add_implementation`] and assembly scanning.
pub trait ApiImplementation: Send + Sync + 'static {
	fn implementation_info() -> ImplementationInfo;

	/// One binding per implemented contract.
	fn bindings() -> Vec<ServiceBinding>;
}

/// Named call arguments, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
	values: Vec<(String, Value)>,
}

impl Arguments {
	pub fn new() -> Self {
		Self::default()
	}

	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::Arguments;
	/// use serde_json::json;
	///
	/// let mut args = Arguments::new().with("id", json!(7)).with("name", json!("ada"));
	/// assert_eq!(args.len(), 2);
	/// let id: u32 = args.take("id").unwrap();
	/// assert_eq!(id, 7);
	/// assert!(args.take::<u32>("id").is_err());
	/// ```
	pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
		self.push(name, value);
		self
	}

	pub fn push(&mut self, name: impl Into<String>, value: Value) {
		let name = name.into();
		match self.values.iter_mut().find(|(n, _)| *n == name) {
			Some(slot) => slot.1 = value,
			None => self.values.push((name, value)),
		}
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}

	/// Remove an argument and convert it to the parameter type.
	pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, ArgumentError> {
		let position = self
			.values
			.iter()
			.position(|(n, _)| n == name)
			.ok_or_else(|| ArgumentError::Missing(name.to_string()))?;
		let (_, value) = self.values.remove(position);
		serde_json::from_value(value).map_err(|source| ArgumentError::Invalid {
			name: name.to_string(),
			source,
		})
	}

	/// Like [`Arguments::take`], but a missing argument yields `None`.
	pub fn take_optional<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>, ArgumentError> {
		if self.get(name).is_none() {
			return Ok(None);
		}
		self.take(name).map(Some)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.values.iter().map(|(n, v)| (n.as_str(), v))
	}
}

type Forward<C> = Arc<dyn Fn(Arc<C>, Arguments) -> ActionFuture + Send + Sync>;

/// Per-contract table of forwarding closures.
pub struct DispatchTable<C: ?Sized> {
	entries: HashMap<String, Forward<C>>,
}

impl<C: ?Sized + Send + Sync + 'static> DispatchTable<C> {
	pub fn new() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}

	/// Register the forwarder for `method`.
	pub fn forward<F, Fut>(mut self, method: impl Into<String>, f: F) -> Self
	where
		F: Fn(Arc<C>, Arguments) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
	{
		let forward: Forward<C> =
			Arc::new(move |service: Arc<C>, args: Arguments| -> ActionFuture { Box::pin(f(service, args)) });
		self.entries.insert(method.into(), forward);
		self
	}

	/// Reuse the forwarders of a parent contract through an upcast.
	///
	/// Entries already present in `self` take precedence.
	pub fn inherit<P>(mut self, parent: DispatchTable<P>, upcast: fn(Arc<C>) -> Arc<P>) -> Self
	where
		P: ?Sized + Send + Sync + 'static,
	{
		for (name, forward) in parent.entries {
			if self.entries.contains_key(&name) {
				continue;
			}
			let inherited: Forward<C> =
				Arc::new(move |service: Arc<C>, args: Arguments| -> ActionFuture { forward(upcast(service), args) });
			self.entries.insert(name, inherited);
		}
		self
	}

	pub fn contains(&self, method: &str) -> bool {
		self.entries.contains_key(method)
	}

	pub fn names(&self) -> BTreeSet<String> {
		self.entries.keys().cloned().collect()
	}

	/// Call `method` on `target`. `None` when the method has no forwarder.
	pub fn call(&self, target: Arc<C>, method: &str, args: Arguments) -> Option<ActionFuture> {
		self.entries.get(method).map(|forward| forward(target, args))
	}
}

impl<C: ?Sized + Send + Sync + 'static> Default for DispatchTable<C> {
	fn default() -> Self {
		Self::new()
	}
}

impl<C: ?Sized> Clone for DispatchTable<C> {
	fn clone(&self) -> Self {
		Self {
			entries: self.entries.clone(),
		}
	}
}

impl<C: ?Sized> fmt::Debug for DispatchTable<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut names: Vec<&String> = self.entries.keys().collect();
		names.sort();
		f.debug_struct("DispatchTable").field("methods", &names).finish()
	}
}

/// An implementation instance bound to its contract's dispatch table.
pub trait BoundService: Send + Sync {
	/// Forward one call. `None` when the action is unknown.
	fn forward(&self, action: &str, args: Arguments) -> Option<ActionFuture>;
}

struct Bound<C: ?Sized> {
	target: Arc<C>,
	table: DispatchTable<C>,
}

impl<C: ?Sized + Send + Sync + 'static> BoundService for Bound<C> {
	fn forward(&self, action: &str, args: Arguments) -> Option<ActionFuture> {
		self.table.call(Arc::clone(&self.target), action, args)
	}
}

type Binder = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<Arc<dyn BoundService>> + Send + Sync>;

/// Key a host uses to resolve implementation instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImplementationKey {
	pub type_id: TypeId,
	pub name: String,
}

impl ImplementationKey {
	pub fn of<I: 'static>() -> Self {
		Self {
			type_id: TypeId::of::<I>(),
			name: std::any::type_name::<I>().to_string(),
		}
	}
}

/// Type-erased pairing of a contract and an implementation.
#[derive(Clone)]
pub struct ServiceBinding {
	contract: Arc<ContractInfo>,
	implementation: Arc<ImplementationInfo>,
	key: ImplementationKey,
	forwarders: BTreeSet<String>,
	binder: Binder,
}

impl ServiceBinding {
	/// Bind contract `C` to implementation `I`.
	pub fn new<C, I>() -> Self
	where
		C: ?Sized + ApiContract,
		I: Implements<C>,
	{
		let contract = C::contract_info();
		let implementation = ImplementationInfo::of::<I>().implements(contract.clone());
		Self::with_parts::<C, I>(contract, implementation)
	}

	/// Bind contract `C` to implementation `I` described by `implementation`.
	pub fn with_implementation<C, I>(implementation: ImplementationInfo) -> Self
	where
		C: ?Sized + ApiContract,
		I: Implements<C>,
	{
		Self::with_parts::<C, I>(C::contract_info(), implementation)
	}

	fn with_parts<C, I>(contract: ContractInfo, implementation: ImplementationInfo) -> Self
	where
		C: ?Sized + ApiContract,
		I: Implements<C>,
	{
		let table = C::dispatch_table();
		let forwarders = table.names();
		let binder: Binder = Arc::new(move |instance: Arc<dyn Any + Send + Sync>| {
			let typed = instance.downcast::<I>().ok()?;
			let bound: Arc<dyn BoundService> = Arc::new(Bound {
				target: typed.into_contract(),
				table: table.clone(),
			});
			Some(bound)
		});
		Self {
			contract: Arc::new(contract),
			implementation: Arc::new(implementation),
			key: ImplementationKey::of::<I>(),
			forwarders,
			binder,
		}
	}

	pub fn contract(&self) -> &Arc<ContractInfo> {
		&self.contract
	}

	pub fn implementation(&self) -> &Arc<ImplementationInfo> {
		&self.implementation
	}

	pub fn key(&self) -> &ImplementationKey {
		&self.key
	}

	/// Method names the dispatch table can forward.
	pub fn forwarders(&self) -> &BTreeSet<String> {
		&self.forwarders
	}

	/// Bind a resolved instance.
	pub fn bind(&self, instance: Arc<dyn Any + Send + Sync>) -> Result<Arc<dyn BoundService>, DispatchError> {
		(self.binder)(instance).ok_or_else(|| DispatchError::InstanceMismatch(self.key.name.clone()))
	}
}

impl fmt::Debug for ServiceBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceBinding")
			.field("contract", &self.contract.id)
			.field("implementation", &self.implementation.name)
			.field("forwarders", &self.forwarders)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	trait Counter: AutomaticApi {
		fn add(&self, a: i64, b: i64) -> i64;
	}

	struct Adder;
	impl AutomaticApi for Adder {}
	impl Counter for Adder {
		fn add(&self, a: i64, b: i64) -> i64 {
			a + b
		}
	}

	fn table() -> DispatchTable<dyn Counter> {
		DispatchTable::new().forward("Add", |svc: Arc<dyn Counter>, mut args: Arguments| async move {
			let a: i64 = args.take("a")?;
			let b: i64 = args.take("b")?;
			Ok(json!(svc.add(a, b)))
		})
	}

	#[rstest]
	#[tokio::test]
	async fn test_dispatch_table_forwards_arguments() {
		let target: Arc<dyn Counter> = Arc::new(Adder);
		let args = Arguments::new().with("a", json!(2)).with("b", json!(40));
		let result = table().call(target, "Add", args).unwrap().await.unwrap();
		assert_eq!(result, json!(42));
	}

	#[rstest]
	#[tokio::test]
	async fn test_argument_errors_surface_from_forwarder() {
		let target: Arc<dyn Counter> = Arc::new(Adder);
		let args = Arguments::new().with("a", json!("two"));
		let err = table().call(target, "Add", args).unwrap().await.unwrap_err();
		assert!(err.downcast_ref::<ArgumentError>().is_some());
	}

	#[rstest]
	fn test_unknown_method_has_no_forwarder() {
		let target: Arc<dyn Counter> = Arc::new(Adder);
		assert!(table().call(target, "Sub", Arguments::new()).is_none());
		assert_eq!(table().names().into_iter().collect::<Vec<_>>(), vec!["Add".to_string()]);
	}

	#[rstest]
	fn test_push_replaces_existing_argument() {
		let mut args = Arguments::new().with("id", json!(1));
		args.push("id", json!(2));
		assert_eq!(args.len(), 1);
		assert_eq!(args.get("id"), Some(&json!(2)));
		assert_eq!(args.take_optional::<i64>("missing").unwrap(), None);
	}
}
