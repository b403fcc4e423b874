//! Instance providers
//!
//! Adapters never construct implementations themselves. Each adapter instance
//! asks an [`InstanceProvider`] for the implementation behind its binding, once.
//! Hosts plug their own container in here; [`ServiceProvider`] is a small
//! scoped container for hosts that have none.

use crate::binding::ImplementationKey;
use crate::error::{BoxError, ProviderError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Type-erased implementation instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Host hook resolving implementation instances.
#[async_trait]
pub trait InstanceProvider: Send + Sync {
	async fn resolve(&self, key: &ImplementationKey) -> Result<Instance, BoxError>;
}

#[async_trait]
impl<P: InstanceProvider + ?Sized> InstanceProvider for Arc<P> {
	async fn resolve(&self, key: &ImplementationKey) -> Result<Instance, BoxError> {
		(**self).resolve(key).await
	}
}

/// Lifetime of a provided instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
	/// One instance for the provider's lifetime.
	Singleton,
	/// One instance per [`RequestScope`].
	Request,
	/// A new instance on every resolution.
	Transient,
}

type Factory = Arc<dyn Fn() -> BoxFuture<'static, Result<Instance, BoxError>> + Send + Sync>;

#[derive(Clone)]
struct Registration {
	name: String,
	scope: Scope,
	factory: Factory,
}

type Cells = Mutex<HashMap<TypeId, Arc<OnceCell<Instance>>>>;

fn cell_for(cells: &Cells, type_id: TypeId) -> Arc<OnceCell<Instance>> {
	Arc::clone(cells.lock().entry(type_id).or_default())
}

/// Reference provider with singleton, request and transient scopes.
///
/// # Examples
///
/// ```
/// use reinhardt_autoapi::ImplementationKey;
/// use reinhardt_autoapi::provider::{InstanceProvider, Scope, ServiceProvider};
///
/// struct Clock;
///
/// # tokio_test::block_on(async {
/// let provider = ServiceProvider::new().register(Scope::Singleton, || async { Ok(Clock) });
/// let first = provider.resolve(&ImplementationKey::of::<Clock>()).await.unwrap();
/// let second = provider.resolve(&ImplementationKey::of::<Clock>()).await.unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ServiceProvider {
	registrations: Arc<HashMap<TypeId, Registration>>,
	singletons: Arc<Cells>,
}

impl ServiceProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register an async factory for `I`.
	///
	/// Registering the same type again replaces the factory. Clones taken
	/// earlier keep their own registrations.
	pub fn register<I, F, Fut>(mut self, scope: Scope, factory: F) -> Self
	where
		I: Send + Sync + 'static,
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<I, BoxError>> + Send + 'static,
	{
		let factory: Factory = Arc::new(move || -> BoxFuture<'static, Result<Instance, BoxError>> {
			let fut = factory();
			Box::pin(async move {
				let instance: Instance = Arc::new(fut.await?);
				Ok(instance)
			})
		});
		let registration = Registration {
			name: std::any::type_name::<I>().to_string(),
			scope,
			factory,
		};
		Arc::make_mut(&mut self.registrations).insert(TypeId::of::<I>(), registration);
		self
	}

	/// Register an existing instance as a singleton.
	pub fn register_instance<I: Send + Sync + 'static>(mut self, instance: Arc<I>) -> Self {
		let factory: Factory = Arc::new(move || -> BoxFuture<'static, Result<Instance, BoxError>> {
			let instance: Instance = instance.clone();
			Box::pin(async move { Ok(instance) })
		});
		let registration = Registration {
			name: std::any::type_name::<I>().to_string(),
			scope: Scope::Singleton,
			factory,
		};
		Arc::make_mut(&mut self.registrations).insert(TypeId::of::<I>(), registration);
		self
	}

	pub fn contains(&self, key: &ImplementationKey) -> bool {
		self.registrations.contains_key(&key.type_id)
	}

	/// Open a request scope sharing this provider's singletons.
	pub fn request_scope(&self) -> RequestScope {
		RequestScope {
			provider: self.clone(),
			cache: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	async fn resolve_in(&self, key: &ImplementationKey, request: Option<&Cells>) -> Result<Instance, BoxError> {
		let registration = self
			.registrations
			.get(&key.type_id)
			.ok_or_else(|| ProviderError::NotRegistered(key.name.clone()))?;

		let cells = match (registration.scope, request) {
			(Scope::Singleton, _) => Some(self.singletons.as_ref()),
			(Scope::Request, Some(cache)) => Some(cache),
			// outside a request scope every resolution is fresh
			(Scope::Request, None) | (Scope::Transient, _) => None,
		};

		let instance = match cells {
			Some(cells) => {
				let cell = cell_for(cells, key.type_id);
				cell.get_or_try_init(|| (registration.factory)()).await?.clone()
			}
			None => (registration.factory)().await?,
		};

		if (*instance).type_id() != key.type_id {
			return Err(ProviderError::TypeMismatch(registration.name.clone()).into());
		}
		debug!(implementation = %registration.name, scope = ?registration.scope, "resolved instance");
		Ok(instance)
	}
}

#[async_trait]
impl InstanceProvider for ServiceProvider {
	async fn resolve(&self, key: &ImplementationKey) -> Result<Instance, BoxError> {
		self.resolve_in(key, None).await
	}
}

/// Per-request view of a [`ServiceProvider`].
#[derive(Clone)]
pub struct RequestScope {
	provider: ServiceProvider,
	cache: Arc<Cells>,
}

#[async_trait]
impl InstanceProvider for RequestScope {
	async fn resolve(&self, key: &ImplementationKey) -> Result<Instance, BoxError> {
		self.provider.resolve_in(key, Some(self.cache.as_ref())).await
	}
}
