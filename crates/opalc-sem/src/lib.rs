//! opalc-sem - Semantic Analysis for the Opal Compiler
//!
//! The first backend pass: walks the parse tree once, building the nested
//! scope tree (name -> binding per lexical scope) while inferring and
//! checking the type of every expression. Programs that survive this pass
//! are fully resolved; the mid-IR builder re-enters the scope tree by the
//! same block ordinals to reconstruct mangled names and label paths.

pub mod analysis;
pub mod check;
pub mod scope;
#[cfg(test)]
mod tests;

pub use analysis::construct_symtab;
pub use check::{cast_viable, eval_expr_type, eval_lvalue_type};
pub use scope::{Binding, Scope, ScopeId, ScopeTree};
