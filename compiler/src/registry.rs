// registry.rs — Reflection metadata registry
//
// Holds the read-only reflected signatures the core consumes: classes with
// their properties and functions, library functions, delegate signatures and
// enums. Populated from `.nrl` library files plus a built-in prelude, then
// linked once so every callback parameter embeds its resolved signature.
//
// Preconditions: `link()` has run before lookups are used for lowering.
// Postconditions: every type name referenced by a linked registry resolves.
// Failure modes: I/O, syntax, duplicate or dangling declarations → `RegistryError`.
// Side effects: `load_library` reads files.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ast::{self, ItemKind, Member, ParamMode};
use crate::types::{Container, PinType, TypeKind};

// ── Metadata tags ───────────────────────────────────────────────────────────

pub mod tags {
    pub const NEAT_DELEGATE_FUNCTION: &str = "NeatDelegateFunction";
    pub const NEAT_CONSTRUCTOR: &str = "NeatConstructor";
    pub const NEAT_CONSTRUCTOR_FINISH: &str = "NeatConstructorFinish";
    pub const REQUIRES_VALIDATION: &str = "RequiresValidation";
    pub const HIDE_SPAWN_PARMS: &str = "HideSpawnParms";
    pub const EXPOSE_ON_SPAWN: &str = "ExposeOnSpawn";
    pub const SETTER: &str = "Setter";
    pub const WORLD_CONTEXT: &str = "WorldContext";
    pub const HIDE_PIN: &str = "HidePin";
    pub const INTERNAL_USE_PARAM: &str = "InternalUseParam";
    pub const SHOW_WORLD_CONTEXT_PIN: &str = "ShowWorldContextPin";
    pub const INTERNAL_USE_ONLY: &str = "BlueprintInternalUseOnly";
}

/// Free-form tag bag attached to signatures, properties and classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Option<String>>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, value: Option<String>) {
        self.0.insert(tag.into(), value);
    }

    pub fn with(mut self, tag: &str) -> Self {
        self.insert(tag, None);
        self
    }

    pub fn with_value(mut self, tag: &str, value: &str) -> Self {
        self.insert(tag, Some(value.to_string()));
        self
    }

    pub fn has(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    /// Value of a tag; `None` when absent or valueless.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).and_then(|v| v.as_deref())
    }

    /// Comma-separated tag value split into trimmed, non-empty entries.
    pub fn list(&self, tag: &str) -> Vec<String> {
        self.get(tag)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ── Function references ─────────────────────────────────────────────────────

/// Identity of a reflected function: `Owner.Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionRef {
    pub owner: String,
    pub name: String,
}

impl FunctionRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        FunctionRef {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

impl FromStr for FunctionRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(FunctionRef::new(owner, name))
            }
            _ => Err(format!("invalid function reference '{s}', expected Owner.Name")),
        }
    }
}

impl TryFrom<String> for FunctionRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FunctionRef> for String {
    fn from(value: FunctionRef) -> Self {
        value.to_string()
    }
}

// ── Signatures ──────────────────────────────────────────────────────────────

/// Name given to the synthesized return parameter.
pub const RETURN_VALUE: &str = "ReturnValue";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParamFlags {
    pub is_return: bool,
    pub is_output: bool,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: PinType,
    pub flags: ParamFlags,
    pub default: Option<String>,
    /// Resolved signature of a callback-typed parameter (filled by `link`).
    pub callback: Option<Box<Signature>>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: PinType) -> Self {
        Param {
            name: name.into(),
            ty,
            flags: ParamFlags::default(),
            default: None,
            callback: None,
        }
    }

    pub fn output(mut self) -> Self {
        self.flags.is_output = true;
        self
    }

    pub fn reference(mut self) -> Self {
        self.flags.is_output = true;
        self.flags.is_reference = true;
        self
    }

    pub fn returning(ty: PinType) -> Self {
        let mut p = Param::new(RETURN_VALUE, ty);
        p.flags.is_return = true;
        p.flags.is_output = true;
        p
    }

    /// Inputs are everything that is not a return value and either not an
    /// output or an output passed by reference.
    pub fn is_input(&self) -> bool {
        !self.flags.is_return && (!self.flags.is_output || self.flags.is_reference)
    }

    /// Reference parameters that are also inputs.
    pub fn is_ref_input(&self) -> bool {
        self.flags.is_reference && self.is_input()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub owner: String,
    pub is_static: bool,
    pub is_pure: bool,
    pub params: Vec<Param>,
    pub metadata: Metadata,
}

impl Signature {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Signature {
            name: name.into(),
            owner: owner.into(),
            is_static: true,
            is_pure: false,
            params: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn key(&self) -> FunctionRef {
        FunctionRef::new(&self.owner, &self.name)
    }

    pub fn return_param(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.flags.is_return)
    }

    pub fn find_param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.is_input())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.find_param(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    pub ty: PinType,
    pub default: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<String>,
    pub is_library: bool,
    pub properties: Vec<Property>,
    pub functions: Vec<Signature>,
    pub metadata: Metadata,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        ClassInfo {
            name: name.into(),
            parent: parent.map(str::to_string),
            is_library: false,
            properties: Vec::new(),
            functions: Vec::new(),
            metadata: Metadata::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumInfo {
    pub name: String,
    pub variants: Vec<String>,
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {}", file.display(), messages.join("; "))]
    Parse { file: PathBuf, messages: Vec<String> },
    #[error("duplicate {what} '{name}'")]
    Duplicate { what: &'static str, name: String },
    #[error("class '{class}' derives from unknown class '{parent}'")]
    UnknownParent { class: String, parent: String },
    #[error("inheritance cycle through class '{0}'")]
    InheritanceCycle(String),
    #[error("{context}: {reason}")]
    InvalidType { context: String, reason: String },
    #[error("{context}: unknown {what} '{name}'")]
    UnknownType {
        context: String,
        what: &'static str,
        name: String,
    },
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Reflection registry. Immutable once linked; passed by reference into
/// every component.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registry {
    classes: BTreeMap<String, ClassInfo>,
    enums: BTreeMap<String, EnumInfo>,
    delegates: BTreeMap<String, Signature>,
}

/// Root class every object type derives from.
pub const ROOT_CLASS: &str = "Object";
/// Base class whose constructs get the default finish step.
pub const ACTOR_CLASS: &str = "Actor";

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the built-in prelude (see `prelude`).
    pub fn with_prelude() -> Self {
        let mut registry = Registry::new();
        prelude::install(&mut registry);
        registry
    }

    /// Prelude + one library source, linked. Convenient for tests and tools.
    pub fn from_source(source: &str) -> Result<Registry, RegistryError> {
        let mut registry = Registry::with_prelude();
        registry.load_source(source, Path::new("<inline>"))?;
        registry.link()?;
        Ok(registry)
    }

    /// Load a `.nrl` file. Returns the number of items declared. Call
    /// `link()` after all libraries are loaded.
    pub fn load_library(&mut self, path: &Path) -> Result<usize, RegistryError> {
        let source = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load_source(&source, path)
    }

    pub fn load_source(&mut self, source: &str, file: &Path) -> Result<usize, RegistryError> {
        let result = crate::parser::parse(source);
        if !result.errors.is_empty() {
            return Err(RegistryError::Parse {
                file: file.to_path_buf(),
                messages: result
                    .errors
                    .iter()
                    .map(|e| crate::parser::describe_error(source, e))
                    .collect(),
            });
        }
        let Some(library) = result.library else {
            return Err(RegistryError::Parse {
                file: file.to_path_buf(),
                messages: vec!["parse produced no output".to_string()],
            });
        };
        let count = library.items.len();
        for item in library.items {
            self.add_item(item)?;
        }
        Ok(count)
    }

    fn add_item(&mut self, item: ast::Item) -> Result<(), RegistryError> {
        let metadata = metadata_from(&item.attrs);
        match item.kind {
            ItemKind::Enum(decl) => {
                let info = EnumInfo {
                    name: decl.name.name,
                    variants: decl.variants.into_iter().map(|v| v.name).collect(),
                };
                self.insert_enum(info)
            }
            ItemKind::Delegate(decl) => {
                let mut sig = Signature::new("", decl.name.name);
                sig.metadata = metadata;
                sig.params = lower_params(&sig.name, decl.params, None)?;
                if let Some(ret) = decl.ret {
                    let context = format!("delegate {} return", sig.name);
                    sig.params.push(Param::returning(parse_type(&context, &ret.text)?));
                }
                self.insert_delegate(sig)
            }
            ItemKind::Class(decl) => {
                let mut class = ClassInfo::new(
                    decl.name.name,
                    decl.parent.as_ref().map(|p| p.name.as_str()),
                );
                class.metadata = metadata;
                for member in decl.members {
                    match member {
                        Member::Prop(prop) => {
                            let context = format!("{}.{}", class.name, prop.name.name);
                            class.properties.push(Property {
                                ty: parse_type(&context, &prop.ty.text)?,
                                name: prop.name.name,
                                default: prop.default.map(ast::Literal::into_text),
                                metadata: metadata_from(&prop.attrs),
                            });
                        }
                        Member::Fn(decl) => {
                            let sig = lower_fn(&class.name, decl, false)?;
                            class.functions.push(sig);
                        }
                    }
                }
                self.insert_class(class)
            }
            ItemKind::Library(decl) => {
                let mut class = ClassInfo::new(decl.name.name, Some(ROOT_CLASS));
                class.is_library = true;
                class.metadata = metadata;
                for decl in decl.functions {
                    let sig = lower_fn(&class.name, decl, true)?;
                    class.functions.push(sig);
                }
                self.insert_class(class)
            }
        }
    }

    pub fn insert_class(&mut self, class: ClassInfo) -> Result<(), RegistryError> {
        let mut seen = BTreeSet::new();
        for f in &class.functions {
            if !seen.insert(f.name.as_str()) {
                return Err(RegistryError::Duplicate {
                    what: "function",
                    name: format!("{}.{}", class.name, f.name),
                });
            }
        }
        if self.classes.contains_key(&class.name) {
            return Err(RegistryError::Duplicate {
                what: "class",
                name: class.name,
            });
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn insert_enum(&mut self, info: EnumInfo) -> Result<(), RegistryError> {
        if self.enums.contains_key(&info.name) {
            return Err(RegistryError::Duplicate {
                what: "enum",
                name: info.name,
            });
        }
        self.enums.insert(info.name.clone(), info);
        Ok(())
    }

    pub fn insert_delegate(&mut self, sig: Signature) -> Result<(), RegistryError> {
        if self.delegates.contains_key(&sig.name) {
            return Err(RegistryError::Duplicate {
                what: "delegate",
                name: sig.name,
            });
        }
        self.delegates.insert(sig.name.clone(), sig);
        Ok(())
    }

    // ── Linking ─────────────────────────────────────────────────────────

    /// Check parents and type references, then embed every callback
    /// parameter's delegate signature.
    pub fn link(&mut self) -> Result<(), RegistryError> {
        for class in self.classes.values() {
            if let Some(parent) = &class.parent {
                if !self.classes.contains_key(parent) {
                    return Err(RegistryError::UnknownParent {
                        class: class.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            // A chain longer than the class count must revisit a class.
            if self.class_chain(&class.name).len() > self.classes.len() {
                return Err(RegistryError::InheritanceCycle(class.name.clone()));
            }
        }

        for class in self.classes.values() {
            for prop in &class.properties {
                self.check_type(&format!("{}.{}", class.name, prop.name), &prop.ty)?;
            }
            for sig in &class.functions {
                for p in &sig.params {
                    self.check_type(&format!("{}.{}({})", class.name, sig.name, p.name), &p.ty)?;
                }
            }
        }
        for sig in self.delegates.values() {
            for p in &sig.params {
                self.check_type(&format!("delegate {}({})", sig.name, p.name), &p.ty)?;
            }
        }

        // Delegates never take delegate parameters of their own here, so one
        // level of embedding resolves everything.
        let delegates = self.delegates.clone();
        for class in self.classes.values_mut() {
            for sig in &mut class.functions {
                for p in &mut sig.params {
                    p.callback = p
                        .ty
                        .delegate_name()
                        .and_then(|d| delegates.get(d))
                        .map(|d| Box::new(d.clone()));
                }
            }
        }
        Ok(())
    }

    fn check_type(&self, context: &str, ty: &PinType) -> Result<(), RegistryError> {
        let unknown = |what: &'static str, name: &str| RegistryError::UnknownType {
            context: context.to_string(),
            what,
            name: name.to_string(),
        };
        match &ty.kind {
            TypeKind::Object(c) | TypeKind::Class(c) | TypeKind::Interface(c) => {
                if !self.classes.contains_key(c) {
                    return Err(unknown("class", c));
                }
            }
            TypeKind::Enum(e) => {
                if !self.enums.contains_key(e) {
                    return Err(unknown("enum", e));
                }
            }
            TypeKind::Delegate(d) => {
                if !self.delegates.contains_key(d) {
                    return Err(unknown("delegate", d));
                }
                if ty.container != Container::None {
                    return Err(RegistryError::InvalidType {
                        context: context.to_string(),
                        reason: "delegates cannot be stored in containers".to_string(),
                    });
                }
            }
            TypeKind::Exec => {
                return Err(RegistryError::InvalidType {
                    context: context.to_string(),
                    reason: "'exec' is not a data type".to_string(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    pub fn enum_info(&self, name: &str) -> Option<&EnumInfo> {
        self.enums.get(name)
    }

    pub fn delegate(&self, name: &str) -> Option<&Signature> {
        self.delegates.get(name)
    }

    /// The class followed by its ancestors, most-derived first. Stops after
    /// `classes.len() + 1` steps so a cycle cannot loop forever.
    pub fn class_chain(&self, name: &str) -> Vec<&ClassInfo> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(name);
        while let Some(class) = current {
            chain.push(class);
            if chain.len() > self.classes.len() {
                break;
            }
            current = class.parent.as_ref().and_then(|p| self.classes.get(p));
        }
        chain
    }

    /// True if `class` is `base` or derives from it.
    pub fn is_child_of(&self, class: &str, base: &str) -> bool {
        self.class_chain(class).iter().any(|c| c.name == base)
    }

    pub fn class_has_tag(&self, class: &str, tag: &str) -> bool {
        self.class_chain(class).iter().any(|c| c.metadata.has(tag))
    }

    /// Find a property on a class or its ancestors.
    pub fn find_property(&self, class: &str, name: &str) -> Option<(&ClassInfo, &Property)> {
        self.class_chain(class).into_iter().find_map(|c| {
            c.properties
                .iter()
                .find(|p| p.name == name)
                .map(|p| (c, p))
        })
    }

    /// Find a function by name on a class or its ancestors.
    pub fn find_function(&self, class: &str, name: &str) -> Option<&Signature> {
        self.class_chain(class)
            .into_iter()
            .find_map(|c| c.functions.iter().find(|f| f.name == name))
    }

    pub fn function(&self, func: &FunctionRef) -> Option<&Signature> {
        self.find_function(&func.owner, &func.name)
    }

    /// All functions, ordered by owner then declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &Signature> {
        self.classes.values().flat_map(|c| c.functions.iter())
    }

    /// Properties that may be configured at construction time, base-first.
    /// A redeclaration in a subclass replaces the inherited entry in place.
    pub fn spawn_properties(&self, class: &str) -> Vec<&Property> {
        let mut out: Vec<&Property> = Vec::new();
        for c in self.class_chain(class).into_iter().rev() {
            for prop in c
                .properties
                .iter()
                .filter(|p| p.metadata.has(tags::EXPOSE_ON_SPAWN))
            {
                match out.iter().position(|p| p.name == prop.name) {
                    Some(i) => out[i] = prop,
                    None => out.push(prop),
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.enums.len() + self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compact canonical JSON of the whole registry. Maps are ordered, so
    /// the output is stable and suitable for fingerprinting.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── AST lowering helpers ────────────────────────────────────────────────────

fn metadata_from(attrs: &[ast::Attribute]) -> Metadata {
    let mut md = Metadata::new();
    for attr in attrs {
        md.insert(attr.name.name.clone(), attr.value.clone());
    }
    md
}

fn parse_type(context: &str, text: &str) -> Result<PinType, RegistryError> {
    text.parse::<PinType>()
        .map_err(|e| RegistryError::InvalidType {
            context: context.to_string(),
            reason: e.to_string(),
        })
}

fn lower_params(
    owner: &str,
    decls: Vec<ast::ParamDecl>,
    fn_name: Option<&str>,
) -> Result<Vec<Param>, RegistryError> {
    let mut params: Vec<Param> = Vec::with_capacity(decls.len());
    for decl in decls {
        let context = match fn_name {
            Some(f) => format!("{owner}.{f}({})", decl.name.name),
            None => format!("{owner}({})", decl.name.name),
        };
        if params.iter().any(|p| p.name == decl.name.name) {
            return Err(RegistryError::Duplicate {
                what: "parameter",
                name: context,
            });
        }
        let mut param = Param::new(decl.name.name, parse_type(&context, &decl.ty.text)?);
        param = match decl.mode {
            ParamMode::In => param,
            ParamMode::Out => param.output(),
            ParamMode::Ref => param.reference(),
        };
        param.default = decl.default.map(ast::Literal::into_text);
        params.push(param);
    }
    Ok(params)
}

fn lower_fn(owner: &str, decl: ast::FnDecl, in_library: bool) -> Result<Signature, RegistryError> {
    let mut sig = Signature::new(owner, decl.name.name);
    sig.is_static = in_library || decl.is_static;
    sig.is_pure = decl.is_pure;
    sig.metadata = metadata_from(&decl.attrs);
    sig.params = lower_params(owner, decl.params, Some(&sig.name))?;
    if let Some(ret) = decl.ret {
        let context = format!("{}.{} return", owner, sig.name);
        if sig.has_param(RETURN_VALUE) {
            return Err(RegistryError::Duplicate {
                what: "parameter",
                name: format!("{}.{}({})", owner, sig.name, RETURN_VALUE),
            });
        }
        sig.params.push(Param::returning(parse_type(&context, &ret.text)?));
    }
    Ok(sig)
}

// ── Prelude ─────────────────────────────────────────────────────────────────

/// Built-in classes and helper functions every lowering relies on.
pub mod prelude {
    use super::*;

    pub const SYSTEM_LIBRARY: &str = "SystemLibrary";
    pub const ARRAY_LIBRARY: &str = "ArrayLibrary";
    pub const SET_LIBRARY: &str = "SetLibrary";
    pub const NEAT_STATICS: &str = "NeatStatics";

    pub const IS_VALID: &str = "IsValid";
    pub const DEFAULT_FINISH: &str = "DefaultFinishSpawningActor";
    pub const SET_ARRAY_BY_NAME: &str = "SetArrayPropertyByName";
    pub const SET_SET_BY_NAME: &str = "SetSetPropertyByName";

    pub fn is_valid() -> FunctionRef {
        FunctionRef::new(SYSTEM_LIBRARY, IS_VALID)
    }

    pub fn default_finish() -> FunctionRef {
        FunctionRef::new(NEAT_STATICS, DEFAULT_FINISH)
    }

    /// Scalar set-by-name functions and the value type each declares.
    pub const SET_BY_NAME: &[(&str, &str)] = &[
        ("SetBoolPropertyByName", "bool"),
        ("SetBytePropertyByName", "byte"),
        ("SetIntPropertyByName", "int"),
        ("SetInt64PropertyByName", "int64"),
        ("SetRealPropertyByName", "real"),
        ("SetNamePropertyByName", "name"),
        ("SetStringPropertyByName", "string"),
        ("SetTextPropertyByName", "text"),
        ("SetObjectPropertyByName", "object<Object>"),
        ("SetClassPropertyByName", "class<Object>"),
        ("SetInterfacePropertyByName", "wildcard"),
        ("SetStructurePropertyByName", "wildcard"),
    ];

    fn internal(sig: Signature) -> Signature {
        let mut sig = sig;
        sig.metadata.insert(tags::INTERNAL_USE_ONLY, None);
        sig
    }

    fn set_by_name(owner: &str, name: &str, value: PinType, by_ref: bool) -> Signature {
        let mut sig = Signature::new(owner, name);
        sig.params.push(Param::new("Object", PinType::object(ROOT_CLASS)));
        sig.params
            .push(Param::new("PropertyName", PinType::new(TypeKind::Name)));
        let value = Param::new("Value", value);
        sig.params.push(if by_ref { value.reference() } else { value });
        internal(sig)
    }

    pub(super) fn install(registry: &mut Registry) {
        let mut classes = vec![
            ClassInfo::new(ROOT_CLASS, None),
            ClassInfo::new(ACTOR_CLASS, Some(ROOT_CLASS)),
        ];

        let mut system = ClassInfo::new(SYSTEM_LIBRARY, Some(ROOT_CLASS));
        system.is_library = true;
        let mut is_valid = Signature::new(SYSTEM_LIBRARY, IS_VALID);
        is_valid.is_pure = true;
        is_valid
            .params
            .push(Param::new("Object", PinType::object(ROOT_CLASS)));
        is_valid
            .params
            .push(Param::returning(PinType::new(TypeKind::Bool)));
        system.functions.push(internal(is_valid));
        for (name, ty) in SET_BY_NAME {
            // Table entries are well-formed type names.
            if let Ok(value) = ty.parse::<PinType>() {
                let by_ref = value.is_wildcard();
                system
                    .functions
                    .push(set_by_name(SYSTEM_LIBRARY, name, value, by_ref));
            }
        }
        classes.push(system);

        let mut arrays = ClassInfo::new(ARRAY_LIBRARY, Some(ROOT_CLASS));
        arrays.is_library = true;
        arrays.functions.push(set_by_name(
            ARRAY_LIBRARY,
            SET_ARRAY_BY_NAME,
            PinType::array(TypeKind::Wildcard),
            true,
        ));
        classes.push(arrays);

        let mut sets = ClassInfo::new(SET_LIBRARY, Some(ROOT_CLASS));
        sets.is_library = true;
        sets.functions.push(set_by_name(
            SET_LIBRARY,
            SET_SET_BY_NAME,
            PinType {
                kind: TypeKind::Wildcard,
                container: Container::Set,
            },
            true,
        ));
        classes.push(sets);

        let mut statics = ClassInfo::new(NEAT_STATICS, Some(ROOT_CLASS));
        statics.is_library = true;
        let mut finish = Signature::new(NEAT_STATICS, DEFAULT_FINISH);
        finish
            .params
            .push(Param::new("Actor", PinType::object(ACTOR_CLASS)));
        statics.functions.push(internal(finish));
        classes.push(statics);

        for class in classes {
            registry.classes.insert(class.name.clone(), class);
        }
    }
}
