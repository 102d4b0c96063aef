//! opalc-gen - Textual IR Emission for the Opal Compiler
//!
//! The final backend pass: a pure function from linearised items to the
//! textual module. Signedness never reaches the printed types - `u32`
//! prints as `i32` - it selects opcodes instead (`udiv` vs `sdiv`, `zext`
//! vs `sext`, `icmp ult` vs `icmp slt`).

pub mod emit;

pub use emit::{emit_module, type_str, value_str};
