//! Registration and discovery tests.

mod common;

use common::*;
use reinhardt_autoapi::metadata::{ContractInfo, ContractKind, MethodInfo};
use reinhardt_autoapi::{
	ApiContract, Arguments, AutomaticApi, AutomaticApiBuilder, DispatchTable, Implements, Overrides,
	RegistrationError, ServiceBinding,
};
use rstest::*;
use serde_json::Value;
use std::sync::Arc;

#[fixture]
fn builder() -> AutomaticApiBuilder {
	AutomaticApiBuilder::new()
}

fn derived_names(builder: &AutomaticApiBuilder) -> Vec<String> {
	let mut names: Vec<String> = builder
		.registry()
		.descriptors()
		.into_iter()
		.map(|d| d.derived_name)
		.collect();
	names.sort();
	names
}

#[rstest]
fn test_implementation_registers_each_declared_contract(builder: AutomaticApiBuilder) {
	builder.add_implementation::<TestService>().unwrap();
	assert_eq!(derived_names(&builder), vec!["DemoA", "DemoB"]);
}

#[rstest]
fn test_inherited_contract_not_registered_separately(builder: AutomaticApiBuilder) {
	builder.add_implementation::<TeacherService>().unwrap();
	assert_eq!(derived_names(&builder), vec!["Teacher"]);
}

#[rstest]
fn test_same_pair_twice_yields_one_route(builder: AutomaticApiBuilder) {
	builder
		.add_contract::<dyn IDemoAService, TestService>(Overrides::new())
		.unwrap()
		.add_contract::<dyn IDemoAService, TestService>(Overrides::new())
		.unwrap();
	builder.add_implementation::<TestService>().unwrap();

	let surface = builder.build_surface().unwrap();
	assert_eq!(surface.len(), 2);
	let demo_a: Vec<_> = surface
		.routes()
		.into_iter()
		.filter(|r| r.controller == "DemoAController")
		.collect();
	assert_eq!(demo_a.len(), 1);
}

#[rstest]
fn test_second_implementation_of_contract_ignored(builder: AutomaticApiBuilder) {
	builder
		.add_contract::<dyn IDemoAService, TestService>(Overrides::new())
		.unwrap()
		.add_contract::<dyn IDemoAService, AbstractDemoService>(Overrides::new())
		.unwrap();
	let descriptors = builder.registry().descriptors();
	assert_eq!(descriptors.len(), 1);
	assert!(descriptors[0].implementation().name.ends_with("TestService"));
}

#[rstest]
fn test_name_collision_between_contracts(builder: AutomaticApiBuilder) {
	builder.add_implementation::<TestService>().unwrap();
	let err = builder
		.add_contract::<dyn IDemoBService, TestService>(Overrides::new().controller_name("DemoA"))
		.unwrap_err();
	assert!(matches!(err, RegistrationError::NameCollision { ref name, .. } if name == "DemoA"));
}

#[rstest]
fn test_assembly_scan_skips_abstract_and_generic(builder: AutomaticApiBuilder) {
	let accepted = builder.add_assembly(SCAN_ROOT, |_| true).unwrap();
	assert_eq!(accepted, 3);
	assert_eq!(derived_names(&builder), vec!["DemoA", "DemoB", "Teacher"]);

	let demo_a = builder
		.registry()
		.descriptors()
		.into_iter()
		.find(|d| d.derived_name == "DemoA")
		.unwrap();
	assert!(demo_a.implementation().name.ends_with("TestService"));
}

#[rstest]
fn test_assembly_scan_honors_predicate(builder: AutomaticApiBuilder) {
	let accepted = builder
		.add_assembly(SCAN_ROOT, |binding| binding.contract().name().starts_with("IDemo"))
		.unwrap();
	assert_eq!(accepted, 2);
	assert_eq!(derived_names(&builder), vec!["DemoA", "DemoB"]);
}

#[rstest]
fn test_assembly_scan_outside_root_finds_nothing(builder: AutomaticApiBuilder) {
	let accepted = builder.add_assembly("some::other::crate", |_| true).unwrap();
	assert_eq!(accepted, 0);
	assert!(builder.registry().is_empty());
}

trait IPlainService: AutomaticApi {}
trait IConcreteService: AutomaticApi {}

impl ApiContract for dyn IPlainService {
	fn contract_info() -> ContractInfo {
		ContractInfo::of::<Self>().capability(false).method(MethodInfo::new("GetAsync"))
	}

	fn dispatch_table() -> DispatchTable<Self> {
		DispatchTable::new().forward("GetAsync", |_svc: Arc<Self>, _args: Arguments| async { Ok(Value::Null) })
	}
}

impl ApiContract for dyn IConcreteService {
	fn contract_info() -> ContractInfo {
		ContractInfo::of::<Self>().kind(ContractKind::Concrete)
	}

	fn dispatch_table() -> DispatchTable<Self> {
		DispatchTable::new()
	}
}

struct Plain;
impl AutomaticApi for Plain {}
impl IPlainService for Plain {}
impl IConcreteService for Plain {}

impl Implements<dyn IPlainService> for Plain {
	fn into_contract(self: Arc<Self>) -> Arc<dyn IPlainService> {
		self
	}
}

impl Implements<dyn IConcreteService> for Plain {
	fn into_contract(self: Arc<Self>) -> Arc<dyn IConcreteService> {
		self
	}
}

#[rstest]
fn test_contract_without_capability_rejected(builder: AutomaticApiBuilder) {
	let err = builder
		.add_binding(ServiceBinding::new::<dyn IPlainService, Plain>(), Overrides::new())
		.unwrap_err();
	assert!(matches!(err, RegistrationError::MissingCapability(_)));
}

#[rstest]
fn test_concrete_contract_rejected(builder: AutomaticApiBuilder) {
	let err = builder
		.add_contract::<dyn IConcreteService, Plain>(Overrides::new())
		.unwrap_err();
	assert!(matches!(err, RegistrationError::NotInterface(_)));
}

#[rstest]
fn test_concurrent_registration() {
	let builder = Arc::new(AutomaticApiBuilder::new());
	let handles: Vec<_> = (0..8)
		.map(|_| {
			let builder = Arc::clone(&builder);
			std::thread::spawn(move || {
				builder.add_implementation::<TestService>().unwrap();
				builder.add_implementation::<TeacherService>().unwrap();
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}
	assert_eq!(builder.registry().len(), 3);
}
