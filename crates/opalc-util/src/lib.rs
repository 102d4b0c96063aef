//! opalc-util - Foundation Types for the Opal Compiler
//!
//! Shared infrastructure for every backend phase: the typed-index vector
//! used by the scope tree, the insertion-ordered map every name table is
//! built on (iteration order must match declaration order so emitted IR is
//! deterministic), and the error type all passes return.

pub mod error;
pub mod index_vec;

pub use error::{CompileError, CompileResult};
pub use index_vec::{Idx, IndexVec};

use std::hash::BuildHasherDefault;

use rustc_hash::FxHasher;

/// An insertion-ordered map with the compiler's standard hasher.
///
/// Every binding table that is ever iterated uses this alias; plain hash
/// maps would make symbol traversal order depend on the hasher.
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<FxHasher>>;
