// schema.rs — Connection rules and standard pin vocabulary
//
// Type assignability between pins, the well-known pin names shared by
// synthesis and expansion, set-by-name function selection, and comparison of
// literal defaults.
//
// Preconditions: the registry is linked.
// Postconditions: none (pure functions).
// Failure modes: none.
// Side effects: none.

use crate::registry::{prelude, FunctionRef, Registry};
use crate::types::{Container, PinType, TypeKind};

/// Pin names with fixed meaning.
pub mod names {
    /// Primary control entry.
    pub const EXECUTE: &str = "execute";
    /// Default success continuation.
    pub const THEN: &str = "then";
    pub const ELSE: &str = "else";
    /// Failure continuation of a construct node that validates its result.
    pub const FAILED: &str = "failed";
    /// Member-call target on calls; delegate handle on event sinks.
    pub const SELF: &str = "self";
    pub const RETURN_VALUE: &str = crate::registry::RETURN_VALUE;
    pub const CONDITION: &str = "Condition";
    /// Target-type input of a construct signature.
    pub const CLASS: &str = "Class";
    pub const OBJECT: &str = "Object";
    pub const PROPERTY_NAME: &str = "PropertyName";
    pub const VALUE: &str = "Value";
    pub const ENUM: &str = "Enum";
}

/// Name of a synthesized callback data pin.
pub fn scoped_pin_name(callback: &str, param: &str) -> String {
    format!("{callback}_{param}")
}

// ── Assignability ───────────────────────────────────────────────────────────

/// Can a value of type `from` flow into a slot of type `to`?
pub fn is_assignable(registry: &Registry, from: &PinType, to: &PinType) -> bool {
    if from.is_wildcard() || to.is_wildcard() {
        return from.container == to.container || from.kind == to.kind;
    }
    if from.container != to.container {
        return false;
    }
    kind_assignable(registry, &from.kind, &to.kind)
}

fn kind_assignable(registry: &Registry, from: &TypeKind, to: &TypeKind) -> bool {
    match (from, to) {
        (TypeKind::Object(a), TypeKind::Object(b))
        | (TypeKind::Object(a), TypeKind::Interface(b))
        | (TypeKind::Interface(a), TypeKind::Interface(b))
        | (TypeKind::Class(a), TypeKind::Class(b)) => registry.is_child_of(a, b),
        (TypeKind::Enum(_), TypeKind::Byte) => true,
        (a, b) => a == b,
    }
}

// ── Set-by-name selection ───────────────────────────────────────────────────

/// Generic property setter for a value of type `ty`. `None` for types that
/// cannot be assigned by name.
pub fn set_by_name_function(ty: &PinType) -> Option<FunctionRef> {
    match ty.container {
        Container::Array => {
            return Some(FunctionRef::new(
                prelude::ARRAY_LIBRARY,
                prelude::SET_ARRAY_BY_NAME,
            ))
        }
        Container::Set => {
            return Some(FunctionRef::new(prelude::SET_LIBRARY, prelude::SET_SET_BY_NAME))
        }
        Container::None => {}
    }
    let name = match &ty.kind {
        TypeKind::Bool => "SetBoolPropertyByName",
        TypeKind::Byte | TypeKind::Enum(_) => "SetBytePropertyByName",
        TypeKind::Int => "SetIntPropertyByName",
        TypeKind::Int64 => "SetInt64PropertyByName",
        TypeKind::Real => "SetRealPropertyByName",
        TypeKind::Name => "SetNamePropertyByName",
        TypeKind::String => "SetStringPropertyByName",
        TypeKind::Text => "SetTextPropertyByName",
        TypeKind::Object(_) => "SetObjectPropertyByName",
        TypeKind::Class(_) => "SetClassPropertyByName",
        TypeKind::Interface(_) => "SetInterfacePropertyByName",
        TypeKind::Struct(_) => "SetStructurePropertyByName",
        TypeKind::Exec | TypeKind::Delegate(_) | TypeKind::Wildcard => return None,
    };
    Some(FunctionRef::new(prelude::SYSTEM_LIBRARY, name))
}

// ── Defaults ────────────────────────────────────────────────────────────────

/// Value a property of type `ty` holds when nothing was declared.
pub fn implicit_default(registry: &Registry, ty: &PinType) -> Option<String> {
    if ty.is_container() {
        return None;
    }
    match &ty.kind {
        TypeKind::Bool => Some("false".to_string()),
        TypeKind::Byte | TypeKind::Int | TypeKind::Int64 | TypeKind::Real => Some("0".to_string()),
        TypeKind::Name | TypeKind::String | TypeKind::Text => Some(String::new()),
        TypeKind::Enum(e) => registry
            .enum_info(e)
            .and_then(|info| info.variants.first().cloned()),
        _ => None,
    }
}

/// Compiled-in default of `class.property`, declared or implicit.
pub fn property_default(registry: &Registry, class: &str, property: &str) -> Option<String> {
    let (_, prop) = registry.find_property(class, property)?;
    prop.default
        .clone()
        .or_else(|| implicit_default(registry, &prop.ty))
}

/// Compare two literal values of type `ty`, normalizing numbers and booleans.
pub fn defaults_equal(ty: &PinType, a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if ty.is_container() {
        return a == b;
    }
    match ty.kind {
        TypeKind::Bool => a.eq_ignore_ascii_case(b),
        TypeKind::Byte | TypeKind::Int | TypeKind::Int64 | TypeKind::Real => {
            match (a.parse::<f64>(), b.parse::<f64>()) {
                (Ok(x), Ok(y)) => x == y,
                _ => a == b,
            }
        }
        _ => a == b,
    }
}
