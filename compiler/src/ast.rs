// AST node types for `.nrl` reflection-library files.
//
// Mirrors the grammar accepted by `parser.rs`. Every node carries a
// `SimpleSpan` so the registry can point at the offending declaration.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Root ──

/// A complete library file: a sequence of top-level items.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryFile {
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// `Tag` or `Tag = "value"` inside `#[ ... ]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Ident,
    pub value: Option<String>,
    pub span: Span,
}

/// A top-level item with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub attrs: Vec<Attribute>,
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Enum(EnumDecl),
    Delegate(DelegateDecl),
    Class(ClassDecl),
    Library(LibraryDecl),
}

// ── enum IDENT '{' IDENT (',' IDENT)* '}' ──

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Ident,
    pub variants: Vec<Ident>,
}

// ── delegate IDENT '(' params ')' ('->' type)? ';' ──

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateDecl {
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub ret: Option<TypeExpr>,
}

// ── class IDENT (':' IDENT)? '{' member* '}' ──

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Prop(PropDecl),
    Fn(FnDecl),
}

// ── library IDENT '{' fn* '}' ──

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryDecl {
    pub name: Ident,
    pub functions: Vec<FnDecl>,
}

// ── prop IDENT ':' type ('=' literal)? ';' ──

#[derive(Debug, Clone, PartialEq)]
pub struct PropDecl {
    pub attrs: Vec<Attribute>,
    pub name: Ident,
    pub ty: TypeExpr,
    pub default: Option<Literal>,
    pub span: Span,
}

// ── static? pure? fn IDENT '(' params ')' ('->' type)? ';' ──

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub attrs: Vec<Attribute>,
    pub is_static: bool,
    pub is_pure: bool,
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub ret: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    In,
    Out,
    Ref,
}

// ── (out|ref)? IDENT ':' type ('=' literal)? ──

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub attrs: Vec<Attribute>,
    pub mode: ParamMode,
    pub name: Ident,
    pub ty: TypeExpr,
    pub default: Option<Literal>,
    pub span: Span,
}

/// A type expression in canonical text form (`array<object<Actor>>`);
/// interpreted by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(String),
    Str(String),
    Ident(String),
}

impl Literal {
    /// The literal as a pin default string.
    pub fn into_text(self) -> String {
        match self {
            Literal::Number(s) | Literal::Str(s) | Literal::Ident(s) => s,
        }
    }
}
