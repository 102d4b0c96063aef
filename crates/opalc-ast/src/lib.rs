//! opalc-ast - Parse-Tree Definitions for the Opal Compiler
//!
//! The front end (lexer, parser, and the template monomorphiser) lives
//! upstream; this crate defines the tree it hands to the backend. Nothing
//! here parses anything - these are the node sets the backend consumes,
//! plus the surface-type algebra with its equality rules.

pub mod ast;
#[cfg(test)]
mod tests;

pub use ast::*;
