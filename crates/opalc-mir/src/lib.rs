//! opalc-mir - Mid-Level IR for the Opal Compiler
//!
//! The second backend pass. Rewrites the checked parse tree into a tree of
//! the same statement shape whose every node carries a target type, with
//! names resolved to global or mangled local symbols, casts and address
//! arithmetic made explicit, and block labels reconstructing the dotted
//! scope paths the linearizer turns into basic blocks.

pub mod lower;
pub mod mir;

pub use lower::{construct_ir_tree, lower_type};
pub use mir::*;
