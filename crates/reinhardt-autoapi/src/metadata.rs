//! Contract metadata
//!
//! Contracts are described explicitly instead of being discovered through
//! reflection. A [`ContractInfo`] lists the methods a service trait declares,
//! the parent contracts it extends and the annotations attached to it. All of
//! it is plain data, validated when a contract is registered.

use crate::binding::AutomaticApi;
use http::Method;
use std::any::TypeId;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Identity of a contract.
///
/// Contracts described with [`ContractInfo::of`] also carry the `TypeId` of
/// their trait object, so two traits that print the same type name stay
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId {
	name: String,
	type_id: Option<TypeId>,
}

impl ContractId {
	/// Identity from a qualified name alone.
	pub fn new(qualified: impl Into<String>) -> Self {
		Self {
			name: qualified.into(),
			type_id: None,
		}
	}

	/// Identity of the trait object `C`.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::AutomaticApi;
	/// use reinhardt_autoapi::metadata::ContractId;
	///
	/// trait IStudentService: AutomaticApi {}
	///
	/// let id = ContractId::of::<dyn IStudentService>();
	/// assert!(id.as_str().ends_with("IStudentService"));
	/// assert_ne!(id, ContractId::new(id.as_str()));
	/// ```
	pub fn of<C: ?Sized + 'static>() -> Self {
		Self {
			name: std::any::type_name::<C>().trim_start_matches("dyn ").to_string(),
			type_id: Some(TypeId::of::<C>()),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.name
	}

	pub fn type_id(&self) -> Option<TypeId> {
		self.type_id
	}
}

impl fmt::Display for ContractId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

/// Identity of a method: declaring contract, name and parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId {
	pub contract: ContractId,
	pub name: String,
	pub signature: Vec<String>,
}

impl fmt::Display for MethodId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}::{}({})",
			short_type_name(self.contract.as_str()),
			self.name,
			self.signature.join(", ")
		)
	}
}

/// Where the host should bind a parameter from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingSource {
	Path,
	Query,
	Body,
	Header,
	Form,
	Services,
	Custom(String),
}

/// Which methods of a contract are excluded from the API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
	/// Every method reachable through the annotated contract.
	All,
	/// Only the named methods.
	Methods(BTreeSet<String>),
}

impl Suppression {
	/// Suppress the given method names.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::metadata::Suppression;
	///
	/// let suppression = Suppression::methods(["InsertAsync", "UpdateAsync"]);
	/// assert!(suppression.covers("InsertAsync"));
	/// assert!(!suppression.covers("TeachAsync"));
	/// ```
	pub fn methods<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::Methods(names.into_iter().map(Into::into).collect())
	}

	pub fn covers(&self, method_name: &str) -> bool {
		match self {
			Self::All => true,
			Self::Methods(names) => names.contains(method_name),
		}
	}
}

/// Annotation attached to a contract, method or parameter.
///
/// These replace the attribute classes a reflective runtime would read; they are
/// carried unchanged onto the synthesized adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
	/// Exclude methods from the API surface.
	Suppress(Suppression),
	/// Explicit route template.
	Route(String),
	/// Explicit HTTP verb.
	HttpMethod(Method),
	/// Marks a controller with standard API behavior.
	ApiBehavior,
	/// Keep the action out of API documentation.
	HideFromDocs,
	/// Documentation text.
	Doc(String),
	/// Explicit parameter binding hint.
	Bind(BindingSource),
	/// Any other host-specific metadata.
	Custom {
		name: String,
		args: Vec<(String, String)>,
	},
}

impl Attribute {
	pub fn custom(name: impl Into<String>) -> Self {
		Self::Custom {
			name: name.into(),
			args: Vec::new(),
		}
	}

	pub fn is_route(&self) -> bool {
		matches!(self, Self::Route(_))
	}
}

/// Kind of a method as seen by the route model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodKind {
	#[default]
	Instance,
	Static,
	/// Compiler-synthesized or otherwise special.
	Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodVisibility {
	#[default]
	Public,
	Private,
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
	pub name: String,
	pub ty: String,
	pub attributes: Vec<Attribute>,
}

impl ParamInfo {
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::metadata::{BindingSource, ParamInfo};
	///
	/// let param = ParamInfo::new("model", "Teacher").bind(BindingSource::Body);
	/// assert_eq!(param.binding(), Some(&BindingSource::Body));
	/// ```
	pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			ty: ty.into(),
			attributes: Vec::new(),
		}
	}

	pub fn bind(mut self, source: BindingSource) -> Self {
		self.attributes.push(Attribute::Bind(source));
		self
	}

	pub fn attribute(mut self, attribute: Attribute) -> Self {
		self.attributes.push(attribute);
		self
	}

	/// Explicit binding hint, if any.
	pub fn binding(&self) -> Option<&BindingSource> {
		self.attributes.iter().find_map(|attr| match attr {
			Attribute::Bind(source) => Some(source),
			_ => None,
		})
	}
}

/// A method declared by a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
	pub id: MethodId,
	pub params: Vec<ParamInfo>,
	pub kind: MethodKind,
	pub generic: bool,
	pub visibility: MethodVisibility,
	pub attributes: Vec<Attribute>,
}

impl MethodInfo {
	/// Create a public instance method. The declaring contract is filled in
	/// when the method is added to a [`ContractInfo`].
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			id: MethodId {
				contract: ContractId::new(""),
				name: name.into(),
				signature: Vec::new(),
			},
			params: Vec::new(),
			kind: MethodKind::Instance,
			generic: false,
			visibility: MethodVisibility::Public,
			attributes: Vec::new(),
		}
	}

	pub fn param(mut self, param: ParamInfo) -> Self {
		self.id.signature.push(param.ty.clone());
		self.params.push(param);
		self
	}

	pub fn kind(mut self, kind: MethodKind) -> Self {
		self.kind = kind;
		self
	}

	pub fn generic(mut self, generic: bool) -> Self {
		self.generic = generic;
		self
	}

	pub fn visibility(mut self, visibility: MethodVisibility) -> Self {
		self.visibility = visibility;
		self
	}

	pub fn attribute(mut self, attribute: Attribute) -> Self {
		self.attributes.push(attribute);
		self
	}

	pub fn name(&self) -> &str {
		&self.id.name
	}

	pub fn has_param(&self, name: &str) -> bool {
		self.params.iter().any(|p| p.name == name)
	}

	pub fn explicit_route(&self) -> Option<&str> {
		self.attributes.iter().find_map(|attr| match attr {
			Attribute::Route(template) => Some(template.as_str()),
			_ => None,
		})
	}

	pub fn explicit_verb(&self) -> Option<&Method> {
		explicit_verb(&self.attributes)
	}

	pub fn is_suppressed(&self) -> bool {
		self.attributes
			.iter()
			.any(|attr| matches!(attr, Attribute::Suppress(_)))
	}
}

fn explicit_verb(attributes: &[Attribute]) -> Option<&Method> {
	attributes.iter().find_map(|attr| match attr {
		Attribute::HttpMethod(method) => Some(method),
		_ => None,
	})
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractKind {
	#[default]
	Interface,
	Concrete,
}

/// Description of a service contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInfo {
	pub id: ContractId,
	pub kind: ContractKind,
	/// Whether the contract extends [`AutomaticApi`].
	pub capability: bool,
	pub methods: Vec<MethodInfo>,
	pub parents: Vec<Arc<ContractInfo>>,
	pub attributes: Vec<Attribute>,
}

impl ContractInfo {
	/// Describe a contract by qualified name. The result carries no capability
	/// marker; use [`ContractInfo::of`] for trait objects extending it.
	pub fn new(qualified: impl Into<String>) -> Self {
		Self {
			id: ContractId::new(qualified),
			kind: ContractKind::Interface,
			capability: false,
			methods: Vec::new(),
			parents: Vec::new(),
			attributes: Vec::new(),
		}
	}

	/// Describe the trait object `C`.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::AutomaticApi;
	/// use reinhardt_autoapi::metadata::ContractInfo;
	///
	/// trait IStudentService: AutomaticApi {}
	///
	/// let info = ContractInfo::of::<dyn IStudentService>();
	/// assert_eq!(info.name(), "IStudentService");
	/// assert!(info.capability);
	/// ```
	pub fn of<C: ?Sized + AutomaticApi + 'static>() -> Self {
		let mut info = Self::new("");
		info.id = ContractId::of::<C>();
		info.capability = true;
		info
	}

	pub fn kind(mut self, kind: ContractKind) -> Self {
		self.kind = kind;
		self
	}

	pub fn capability(mut self, capability: bool) -> Self {
		self.capability = capability;
		self
	}

	pub fn extends(mut self, parent: ContractInfo) -> Self {
		self.parents.push(Arc::new(parent));
		self
	}

	pub fn method(mut self, mut method: MethodInfo) -> Self {
		method.id.contract = self.id.clone();
		self.methods.push(method);
		self
	}

	pub fn attribute(mut self, attribute: Attribute) -> Self {
		self.attributes.push(attribute);
		self
	}

	/// Unqualified type name, generic arguments included.
	pub fn name(&self) -> String {
		short_type_name(self.id.as_str())
	}

	pub fn explicit_verb(&self) -> Option<&Method> {
		explicit_verb(&self.attributes)
	}

	pub fn suppression(&self) -> Option<&Suppression> {
		self.attributes.iter().find_map(|attr| match attr {
			Attribute::Suppress(s) => Some(s),
			_ => None,
		})
	}

	/// All transitive parents, each once, in depth-first declaration order.
	pub fn ancestors(&self) -> Vec<&ContractInfo> {
		let mut seen = HashSet::new();
		let mut out = Vec::new();
		collect_ancestors(self, &mut seen, &mut out);
		out
	}

	/// This contract followed by its ancestors.
	pub fn hierarchy(&self) -> Vec<&ContractInfo> {
		let mut all = vec![self];
		all.extend(self.ancestors().into_iter().filter(|c| c.id != self.id));
		all
	}

	/// Whether `id` is reachable through the parents of this contract.
	pub fn reaches(&self, id: &ContractId) -> bool {
		self.ancestors().iter().any(|c| &c.id == id)
	}

	/// Methods declared by this contract and every ancestor. A method reached
	/// through several inheritance paths appears once.
	pub fn effective_methods(&self) -> Vec<&MethodInfo> {
		let mut seen = HashSet::new();
		self.hierarchy()
			.into_iter()
			.flat_map(|contract| contract.methods.iter())
			.filter(|method| seen.insert(&method.id))
			.collect()
	}

	/// Route annotation of this contract or, failing that, of the nearest ancestor.
	pub fn route_template(&self) -> Option<&str> {
		self.hierarchy().into_iter().find_map(|contract| {
			contract.attributes.iter().find_map(|attr| match attr {
				Attribute::Route(template) => Some(template.as_str()),
				_ => None,
			})
		})
	}

	pub fn find_method(&self, id: &MethodId) -> Option<&MethodInfo> {
		self.effective_methods().into_iter().find(|m| &m.id == id)
	}
}

fn collect_ancestors<'a>(
	contract: &'a ContractInfo,
	seen: &mut HashSet<&'a ContractId>,
	out: &mut Vec<&'a ContractInfo>,
) {
	for parent in &contract.parents {
		if seen.insert(&parent.id) {
			out.push(parent);
			collect_ancestors(parent, seen, out);
		}
	}
}

/// Description of a concrete implementation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationInfo {
	pub name: String,
	pub is_abstract: bool,
	pub is_generic: bool,
	/// Every contract the type implements, inherited ones included.
	pub contracts: Vec<ContractInfo>,
}

impl ImplementationInfo {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			is_abstract: false,
			is_generic: false,
			contracts: Vec::new(),
		}
	}

	pub fn of<I: 'static>() -> Self {
		Self::new(std::any::type_name::<I>())
	}

	pub fn implements(mut self, contract: ContractInfo) -> Self {
		self.contracts.push(contract);
		self
	}

	pub fn abstract_type(mut self, is_abstract: bool) -> Self {
		self.is_abstract = is_abstract;
		self
	}

	pub fn generic(mut self, is_generic: bool) -> Self {
		self.is_generic = is_generic;
		self
	}

	/// Contracts implemented directly: those not reachable through another
	/// implemented contract, restricted to ones extending the capability marker.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::metadata::{ContractInfo, ImplementationInfo};
	///
	/// let general = ContractInfo::new("api::IGeneralService").capability(true);
	/// let teacher = ContractInfo::new("api::ITeacherService")
	///     .capability(true)
	///     .extends(general.clone());
	/// let info = ImplementationInfo::new("TeacherService")
	///     .implements(teacher)
	///     .implements(general);
	///
	/// let direct: Vec<_> = info.declared_contracts().iter().map(|c| c.name()).collect();
	/// assert_eq!(direct, vec!["ITeacherService".to_string()]);
	/// ```
	pub fn declared_contracts(&self) -> Vec<&ContractInfo> {
		self.contracts
			.iter()
			.filter(|candidate| {
				!self
					.contracts
					.iter()
					.any(|other| other.id != candidate.id && other.reaches(&candidate.id))
			})
			.filter(|candidate| candidate.capability)
			.collect()
	}

	pub fn short_name(&self) -> String {
		short_type_name(&self.name)
	}
}

/// Host handler base a synthesized adapter descends from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseType {
	pub name: String,
	/// Names of every base this one derives from.
	pub lineage: Vec<String>,
}

impl BaseType {
	/// The host's minimal handler base.
	pub const CONTROLLER_BASE: &'static str = "ControllerBase";

	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			lineage: Vec::new(),
		}
	}

	pub fn controller_base() -> Self {
		Self::new(Self::CONTROLLER_BASE)
	}

	/// Derive a new base from `parent`.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_autoapi::metadata::BaseType;
	///
	/// let base = BaseType::new("BaseController").derives_from(&BaseType::controller_base());
	/// assert!(base.is_assignable_to(BaseType::CONTROLLER_BASE));
	/// assert!(!BaseType::new("Plain").is_assignable_to(BaseType::CONTROLLER_BASE));
	/// ```
	pub fn derives_from(mut self, parent: &BaseType) -> Self {
		self.lineage.push(parent.name.clone());
		self.lineage.extend(parent.lineage.iter().cloned());
		self
	}

	pub fn is_assignable_to(&self, name: &str) -> bool {
		self.name == name || self.lineage.iter().any(|l| l == name)
	}
}

impl Default for BaseType {
	fn default() -> Self {
		Self::controller_base()
	}
}

/// Strip module paths from every segment of a type name.
///
/// `dyn app::api::IGeneralService<app::entities::Teacher>` becomes
/// `IGeneralService<Teacher>`.
pub fn short_type_name(qualified: &str) -> String {
	let qualified = qualified.trim_start_matches("dyn ");
	let mut out = String::with_capacity(qualified.len());
	let mut token = String::new();
	for ch in qualified.chars() {
		if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&') {
			out.push_str(token.rsplit("::").next().unwrap_or(token.as_str()));
			token.clear();
			out.push(ch);
		} else {
			token.push(ch);
		}
	}
	out.push_str(token.rsplit("::").next().unwrap_or(token.as_str()));
	out
}
