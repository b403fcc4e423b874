//! Shared contracts and services for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reinhardt_autoapi::metadata::{
	short_type_name, Attribute, BindingSource, ContractInfo, ImplementationInfo, MethodInfo, ParamInfo, Suppression,
};
use reinhardt_autoapi::route_model::ActionDescriptor;
use reinhardt_autoapi::synthesis::AdapterType;
use reinhardt_autoapi::{
	register_api, ApiContract, ApiImplementation, Arguments, AutomaticApi, DispatchTable, HostBinding, Implements,
	ServiceBinding,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Module path used as the scan root for assembly registration.
pub const SCAN_ROOT: &str = module_path!();

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
	pub id: Uuid,
	pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("record {0} not found")]
	NotFound(Uuid),
}

pub trait Entity: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}

impl Entity for Teacher {}

#[async_trait]
pub trait IGeneralService<T: Entity>: AutomaticApi {
	async fn get_async(&self) -> Vec<T>;

	async fn insert_async(&self, model: T) -> bool;

	async fn update_async(&self, id: Uuid, model: T) -> Result<bool, ServiceError>;

	async fn delete_async(&self, id: Uuid) -> Result<bool, ServiceError>;
}

impl<T: Entity> ApiContract for dyn IGeneralService<T> {
	fn contract_info() -> ContractInfo {
		let model = short_type_name(std::any::type_name::<T>());
		ContractInfo::of::<Self>()
			.method(MethodInfo::new("GetAsync"))
			.method(MethodInfo::new("InsertAsync").param(ParamInfo::new("model", &model).bind(BindingSource::Body)))
			.method(
				MethodInfo::new("UpdateAsync")
					.param(ParamInfo::new("id", "Uuid"))
					.param(ParamInfo::new("model", &model).bind(BindingSource::Body)),
			)
			.method(MethodInfo::new("DeleteAsync").param(ParamInfo::new("id", "Uuid")))
	}

	fn dispatch_table() -> DispatchTable<Self> {
		DispatchTable::new()
			.forward("GetAsync", |svc: Arc<Self>, _args: Arguments| async move {
				Ok(serde_json::to_value(svc.get_async().await)?)
			})
			.forward("InsertAsync", |svc: Arc<Self>, mut args: Arguments| async move {
				let model: T = args.take("model")?;
				Ok(json!(svc.insert_async(model).await))
			})
			.forward("UpdateAsync", |svc: Arc<Self>, mut args: Arguments| async move {
				let id: Uuid = args.take("id")?;
				let model: T = args.take("model")?;
				Ok(json!(svc.update_async(id, model).await?))
			})
			.forward("DeleteAsync", |svc: Arc<Self>, mut args: Arguments| async move {
				let id: Uuid = args.take("id")?;
				Ok(json!(svc.delete_async(id).await?))
			})
	}
}

#[async_trait]
pub trait ITeacherService: IGeneralService<Teacher> {
	async fn teach_async(&self) -> bool;
}

fn teacher_as_general(svc: Arc<dyn ITeacherService>) -> Arc<dyn IGeneralService<Teacher>> {
	svc
}

impl ApiContract for dyn ITeacherService {
	fn contract_info() -> ContractInfo {
		ContractInfo::of::<Self>()
			.extends(<dyn IGeneralService<Teacher> as ApiContract>::contract_info())
			.attribute(Attribute::Suppress(Suppression::methods(["InsertAsync", "UpdateAsync"])))
			.method(MethodInfo::new("TeachAsync"))
	}

	fn dispatch_table() -> DispatchTable<Self> {
		DispatchTable::new()
			.forward("TeachAsync", |svc: Arc<Self>, _args: Arguments| async move {
				Ok(json!(svc.teach_async().await))
			})
			.inherit(
				<dyn IGeneralService<Teacher> as ApiContract>::dispatch_table(),
				teacher_as_general,
			)
	}
}

#[async_trait]
pub trait IDemoAService: AutomaticApi {
	async fn get(&self) -> String;
}

impl ApiContract for dyn IDemoAService {
	fn contract_info() -> ContractInfo {
		ContractInfo::of::<Self>().method(MethodInfo::new("Get").attribute(Attribute::Doc("DemoA endpoint".into())))
	}

	fn dispatch_table() -> DispatchTable<Self> {
		DispatchTable::new().forward("Get", |svc: Arc<Self>, _args: Arguments| async move {
			Ok(json!(svc.get().await))
		})
	}
}

#[async_trait]
pub trait IDemoBService: AutomaticApi {
	async fn fetch_async(&self, id: Uuid) -> String;
}

impl ApiContract for dyn IDemoBService {
	fn contract_info() -> ContractInfo {
		ContractInfo::of::<Self>().method(MethodInfo::new("FetchAsync").param(ParamInfo::new("id", "Uuid")))
	}

	fn dispatch_table() -> DispatchTable<Self> {
		DispatchTable::new().forward("FetchAsync", |svc: Arc<Self>, mut args: Arguments| async move {
			let id: Uuid = args.take("id")?;
			Ok(json!(svc.fetch_async(id).await))
		})
	}
}

/// In-memory store for any entity.
#[derive(Default)]
pub struct GenericService<T> {
	records: Mutex<HashMap<Uuid, T>>,
}

impl<T: Entity> GenericService<T> {
	pub fn with_records(records: impl IntoIterator<Item = (Uuid, T)>) -> Self {
		Self {
			records: Mutex::new(records.into_iter().collect()),
		}
	}
}

impl<T: Entity> AutomaticApi for GenericService<T> {}

#[async_trait]
impl<T: Entity> IGeneralService<T> for GenericService<T> {
	async fn get_async(&self) -> Vec<T> {
		self.records.lock().values().cloned().collect()
	}

	async fn insert_async(&self, model: T) -> bool {
		self.records.lock().insert(Uuid::new_v4(), model);
		true
	}

	async fn update_async(&self, id: Uuid, model: T) -> Result<bool, ServiceError> {
		match self.records.lock().get_mut(&id) {
			Some(slot) => {
				*slot = model;
				Ok(true)
			}
			None => Err(ServiceError::NotFound(id)),
		}
	}

	async fn delete_async(&self, id: Uuid) -> Result<bool, ServiceError> {
		self.records
			.lock()
			.remove(&id)
			.map(|_| true)
			.ok_or(ServiceError::NotFound(id))
	}
}

impl<T: Entity> Implements<dyn IGeneralService<T>> for GenericService<T> {
	fn into_contract(self: Arc<Self>) -> Arc<dyn IGeneralService<T>> {
		self
	}
}

impl<T: Entity> ApiImplementation for GenericService<T> {
	fn implementation_info() -> ImplementationInfo {
		ImplementationInfo::of::<Self>()
			.generic(true)
			.implements(<dyn IGeneralService<T> as ApiContract>::contract_info())
	}

	fn bindings() -> Vec<ServiceBinding> {
		vec![ServiceBinding::with_implementation::<dyn IGeneralService<T>, Self>(
			Self::implementation_info(),
		)]
	}
}

/// Teacher records plus teaching.
#[derive(Default)]
pub struct TeacherService {
	store: GenericService<Teacher>,
}

impl TeacherService {
	pub fn with_teachers(teachers: impl IntoIterator<Item = Teacher>) -> Self {
		Self {
			store: GenericService::with_records(teachers.into_iter().map(|t| (t.id, t))),
		}
	}
}

impl AutomaticApi for TeacherService {}

#[async_trait]
impl IGeneralService<Teacher> for TeacherService {
	async fn get_async(&self) -> Vec<Teacher> {
		self.store.get_async().await
	}

	async fn insert_async(&self, model: Teacher) -> bool {
		self.store.insert_async(model).await
	}

	async fn update_async(&self, id: Uuid, model: Teacher) -> Result<bool, ServiceError> {
		self.store.update_async(id, model).await
	}

	async fn delete_async(&self, id: Uuid) -> Result<bool, ServiceError> {
		self.store.delete_async(id).await
	}
}

#[async_trait]
impl ITeacherService for TeacherService {
	async fn teach_async(&self) -> bool {
		true
	}
}

impl Implements<dyn ITeacherService> for TeacherService {
	fn into_contract(self: Arc<Self>) -> Arc<dyn ITeacherService> {
		self
	}
}

impl Implements<dyn IGeneralService<Teacher>> for TeacherService {
	fn into_contract(self: Arc<Self>) -> Arc<dyn IGeneralService<Teacher>> {
		self
	}
}

impl ApiImplementation for TeacherService {
	fn implementation_info() -> ImplementationInfo {
		ImplementationInfo::of::<Self>()
			.implements(<dyn ITeacherService as ApiContract>::contract_info())
			.implements(<dyn IGeneralService<Teacher> as ApiContract>::contract_info())
	}

	fn bindings() -> Vec<ServiceBinding> {
		let info = Self::implementation_info();
		vec![
			ServiceBinding::with_implementation::<dyn ITeacherService, Self>(info.clone()),
			ServiceBinding::with_implementation::<dyn IGeneralService<Teacher>, Self>(info),
		]
	}
}

/// Implements both demo contracts.
#[derive(Default)]
pub struct TestService;

impl AutomaticApi for TestService {}

#[async_trait]
impl IDemoAService for TestService {
	async fn get(&self) -> String {
		"Hello AutomaticApi".to_string()
	}
}

#[async_trait]
impl IDemoBService for TestService {
	async fn fetch_async(&self, id: Uuid) -> String {
		format!("Hello AutomaticApi {}", id)
	}
}

impl Implements<dyn IDemoAService> for TestService {
	fn into_contract(self: Arc<Self>) -> Arc<dyn IDemoAService> {
		self
	}
}

impl Implements<dyn IDemoBService> for TestService {
	fn into_contract(self: Arc<Self>) -> Arc<dyn IDemoBService> {
		self
	}
}

impl ApiImplementation for TestService {
	fn implementation_info() -> ImplementationInfo {
		ImplementationInfo::of::<Self>()
			.implements(<dyn IDemoAService as ApiContract>::contract_info())
			.implements(<dyn IDemoBService as ApiContract>::contract_info())
	}

	fn bindings() -> Vec<ServiceBinding> {
		let info = Self::implementation_info();
		vec![
			ServiceBinding::with_implementation::<dyn IDemoAService, Self>(info.clone()),
			ServiceBinding::with_implementation::<dyn IDemoBService, Self>(info),
		]
	}
}

/// Base implementation that is never exposed on its own.
pub struct AbstractDemoService;

impl AutomaticApi for AbstractDemoService {}

#[async_trait]
impl IDemoAService for AbstractDemoService {
	async fn get(&self) -> String {
		"abstract".to_string()
	}
}

impl Implements<dyn IDemoAService> for AbstractDemoService {
	fn into_contract(self: Arc<Self>) -> Arc<dyn IDemoAService> {
		self
	}
}

impl ApiImplementation for AbstractDemoService {
	fn implementation_info() -> ImplementationInfo {
		ImplementationInfo::of::<Self>()
			.abstract_type(true)
			.implements(<dyn IDemoAService as ApiContract>::contract_info())
	}

	fn bindings() -> Vec<ServiceBinding> {
		vec![ServiceBinding::with_implementation::<dyn IDemoAService, Self>(
			Self::implementation_info(),
		)]
	}
}

register_api!(TestService);
register_api!(TeacherService);
register_api!(GenericService<Teacher>);
register_api!(AbstractDemoService);

/// Host double recording what it was given.
#[derive(Default)]
pub struct RecordingHost {
	pub controllers: Vec<(Arc<AdapterType>, Vec<ActionDescriptor>)>,
}

impl HostBinding for RecordingHost {
	fn add_controller(&mut self, adapter: &Arc<AdapterType>, actions: &[ActionDescriptor]) {
		self.controllers.push((Arc::clone(adapter), actions.to_vec()));
	}
}

pub fn teacher(name: &str) -> Teacher {
	Teacher {
		id: Uuid::new_v4(),
		name: name.to_string(),
	}
}
