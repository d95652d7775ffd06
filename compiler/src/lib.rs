// neatc — Neat node compiler
//
// Library root. Lowers intent nodes (delegate-inlining calls and
// construct-configure-finish nodes) of a node graph into primitive nodes.

pub mod ast;
pub mod construct;
pub mod delegate;
pub mod diag;
pub mod document;
pub mod dot;
pub mod eligibility;
pub mod graph;
pub mod id;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod pass;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod session;
pub mod synth;
pub mod types;
