// types.rs — Pin type descriptors
//
// A `PinType` is the type descriptor carried by every pin and every reflected
// parameter. Its textual form (`int`, `object<Actor>`, `array<name>`) is used
// by the reflection-library language, graph documents and DOT output.
//
// Preconditions: none.
// Postconditions: `Display` and `FromStr` are inverse for every valid type.
// Failure modes: unknown base names or malformed generics → `TypeParseError`.
// Side effects: none.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Base type of a pin, ignoring containers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    /// Control-flow pins.
    Exec,
    Bool,
    Byte,
    Int,
    Int64,
    Real,
    Name,
    String,
    Text,
    Object(String),
    Class(String),
    Interface(String),
    Struct(String),
    Enum(String),
    Delegate(String),
    /// Accepts any type; specialized once something concrete is wired in.
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Container {
    #[default]
    None,
    Array,
    Set,
}

/// Full type descriptor of a pin or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PinType {
    pub kind: TypeKind,
    pub container: Container,
}

impl PinType {
    pub fn new(kind: TypeKind) -> Self {
        PinType {
            kind,
            container: Container::None,
        }
    }

    pub fn exec() -> Self {
        Self::new(TypeKind::Exec)
    }

    pub fn object(class: impl Into<String>) -> Self {
        Self::new(TypeKind::Object(class.into()))
    }

    pub fn class(meta: impl Into<String>) -> Self {
        Self::new(TypeKind::Class(meta.into()))
    }

    pub fn array(kind: TypeKind) -> Self {
        PinType {
            kind,
            container: Container::Array,
        }
    }

    pub fn is_container(&self) -> bool {
        self.container != Container::None
    }

    pub fn is_exec(&self) -> bool {
        self.kind == TypeKind::Exec
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == TypeKind::Wildcard
    }

    /// Name of the class this type refers to, for object, class and
    /// interface types.
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Object(c) | TypeKind::Class(c) | TypeKind::Interface(c) => Some(c),
            _ => None,
        }
    }

    pub fn delegate_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Delegate(d) if self.container == Container::None => Some(d),
            _ => None,
        }
    }

    pub fn enum_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Exec => write!(f, "exec"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::Byte => write!(f, "byte"),
            TypeKind::Int => write!(f, "int"),
            TypeKind::Int64 => write!(f, "int64"),
            TypeKind::Real => write!(f, "real"),
            TypeKind::Name => write!(f, "name"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Text => write!(f, "text"),
            TypeKind::Object(c) => write!(f, "object<{c}>"),
            TypeKind::Class(c) => write!(f, "class<{c}>"),
            TypeKind::Interface(c) => write!(f, "interface<{c}>"),
            TypeKind::Struct(s) => write!(f, "struct<{s}>"),
            TypeKind::Enum(e) => write!(f, "enum<{e}>"),
            TypeKind::Delegate(d) => write!(f, "delegate<{d}>"),
            TypeKind::Wildcard => write!(f, "wildcard"),
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.container {
            Container::None => write!(f, "{}", self.kind),
            Container::Array => write!(f, "array<{}>", self.kind),
            Container::Set => write!(f, "set<{}>", self.kind),
        }
    }
}

// ── Parsing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type '{text}': {reason}")]
pub struct TypeParseError {
    pub text: String,
    pub reason: String,
}

impl TypeKind {
    /// Build a base kind from its name and optional generic argument.
    pub fn from_parts(name: &str, arg: Option<&str>) -> Result<TypeKind, String> {
        let simple = |kind: TypeKind| match arg {
            None => Ok(kind),
            Some(_) => Err(format!("'{name}' takes no type argument")),
        };
        let named = |build: fn(String) -> TypeKind| match arg {
            Some(a) => Ok(build(a.to_string())),
            None => Err(format!("'{name}' requires a type argument, e.g. {name}<T>")),
        };
        match name {
            "exec" => simple(TypeKind::Exec),
            "bool" => simple(TypeKind::Bool),
            "byte" => simple(TypeKind::Byte),
            "int" => simple(TypeKind::Int),
            "int64" => simple(TypeKind::Int64),
            "real" => simple(TypeKind::Real),
            "name" => simple(TypeKind::Name),
            "string" => simple(TypeKind::String),
            "text" => simple(TypeKind::Text),
            "wildcard" => simple(TypeKind::Wildcard),
            "object" => named(TypeKind::Object),
            "class" => named(TypeKind::Class),
            "interface" => named(TypeKind::Interface),
            "struct" => named(TypeKind::Struct),
            "enum" => named(TypeKind::Enum),
            "delegate" => named(TypeKind::Delegate),
            other => Err(format!("unknown type '{other}'")),
        }
    }
}

/// Split `head<inner>` into `("head", Some("inner"))`; `head` alone yields `None`.
fn split_generic(text: &str) -> Result<(&str, Option<&str>), String> {
    match text.find('<') {
        None => Ok((text, None)),
        Some(open) => {
            let inner = text[open + 1..]
                .strip_suffix('>')
                .ok_or_else(|| "missing closing '>'".to_string())?;
            Ok((&text[..open], Some(inner)))
        }
    }
}

impl FromStr for PinType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| TypeParseError {
            text: s.to_string(),
            reason,
        };
        let text = s.trim();
        let (head, arg) = split_generic(text).map_err(err)?;
        let container = match head {
            "array" => Some(Container::Array),
            "set" => Some(Container::Set),
            _ => None,
        };
        match container {
            Some(container) => {
                let inner = arg.ok_or_else(|| err(format!("'{head}' requires an element type")))?;
                let (inner_head, inner_arg) = split_generic(inner).map_err(err)?;
                if matches!(inner_head, "array" | "set") {
                    return Err(err("nested containers are not supported".to_string()));
                }
                let kind = TypeKind::from_parts(inner_head, inner_arg).map_err(err)?;
                Ok(PinType { kind, container })
            }
            None => Ok(PinType::new(TypeKind::from_parts(head, arg).map_err(err)?)),
        }
    }
}

impl TryFrom<String> for PinType {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PinType> for String {
    fn from(value: PinType) -> Self {
        value.to_string()
    }
}
