//! opalc-lir - SSA Linearisation for the Opal Compiler
//!
//! The third backend pass. Walks the mid-IR trees and flattens each
//! function body into a list of `(result, instruction)` pairs with fresh
//! temporaries, explicit labels, and a terminator closing every basic
//! block. Structured control flow becomes labeled blocks here;
//! `continue`/`break` thread through the builder's loop labels.

pub mod lir;
pub mod lower;

pub use lir::{Inst, Item, Value};
pub use lower::{codegen_item, codegen_module, Builder};
