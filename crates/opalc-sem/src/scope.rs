//! The scope tree.
//!
//! Scopes form a tree mirroring the block structure of the source program.
//! A child scope is keyed in its parent either by source name (functions)
//! or by the decimal-string ordinal of the block statement that introduced
//! it. The ordinal numbering is a contract with the mid-IR builder: both
//! passes walk statement lists left to right and bump a counter for every
//! block-shaped statement, so the builder can re-enter exactly the scopes
//! this pass created.

use opalc_ast as ast;
use opalc_util::{CompileError, CompileResult, FxIndexMap, Idx, IndexVec};

/// Scope ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl Idx for ScopeId {
    fn from_usize(idx: usize) -> Self {
        ScopeId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a name resolves to: a type, or a value with a mutability and
/// (for functions with bodies) the scope of its parameters and body.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Ty(ast::Type),
    Value {
        mutability: ast::Mutability,
        ty: ast::Type,
        inner: Option<ScopeId>,
    },
}

/// A single scope.
#[derive(Debug, Default, PartialEq)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Bindings in declaration order.
    pub bindings: FxIndexMap<String, Binding>,
    /// Nested scopes, keyed by function name or block ordinal.
    pub children: FxIndexMap<String, ScopeId>,
}

/// The scope tree of a whole compilation unit.
///
/// Two distinguished roots: `top` holds module-level values and functions,
/// `types` holds the named types (filled by a first pass so value
/// declarations can reference types defined later in the file).
#[derive(Debug)]
pub struct ScopeTree {
    pub scopes: IndexVec<ScopeId, Scope>,
    pub top: ScopeId,
    pub types: ScopeId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let top = scopes.push(Scope::default());
        let types = scopes.push(Scope::default());
        Self { scopes, top, types }
    }

    /// Create a child of `parent` under the given key.
    pub fn new_child(&mut self, parent: ScopeId, key: &str) -> ScopeId {
        let id = self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        self.scopes[parent].children.insert(key.to_string(), id);
        id
    }

    /// Look up a child scope by key.
    pub fn child(&self, parent: ScopeId, key: &str) -> Option<ScopeId> {
        self.scopes[parent].children.get(key).copied()
    }

    /// Bind a name in a scope; a name may be bound at most once per scope.
    pub fn bind(&mut self, scope: ScopeId, name: &str, binding: Binding) -> CompileResult<()> {
        let bindings = &mut self.scopes[scope].bindings;
        if bindings.contains_key(name) {
            return Err(CompileError::Duplication(format!(
                "symbol `{name}` already defined"
            )));
        }
        bindings.insert(name.to_string(), binding);
        Ok(())
    }

    /// Resolve a name against a scope stack, innermost scope last.
    ///
    /// Returns the index into `chain` of the defining scope together with
    /// the binding; the mid-IR builder turns that depth into a mangled
    /// symbol (depth 0 is the module scope, so the name is a global).
    pub fn resolve<'a>(&'a self, chain: &[ScopeId], name: &str) -> Option<(usize, &'a Binding)> {
        for (depth, &id) in chain.iter().enumerate().rev() {
            if let Some(binding) = self.scopes[id].bindings.get(name) {
                return Some((depth, binding));
            }
        }
        None
    }

    /// The resolved body of a named type, if declared.
    pub fn lookup_type(&self, name: &str) -> Option<&ast::Type> {
        match self.scopes[self.types].bindings.get(name) {
            Some(Binding::Ty(t)) => Some(t),
            _ => None,
        }
    }

    /// Resolve a parse-tree type annotation: every `Stub` reference is
    /// looked up in the types scope and rewritten into an alias of the
    /// known body. References to a still-open forward declaration stay
    /// stubs; unknown names are errors.
    pub fn resolve_type(&self, t: &ast::Type) -> CompileResult<ast::Type> {
        use ast::Type::*;
        Ok(match t {
            Stub(name) => match self.lookup_type(name) {
                Some(Stub(_)) => Stub(name.clone()),
                Some(body) => Alias(name.clone(), Box::new(body.clone())),
                None => {
                    return Err(CompileError::Resolution(format!(
                        "unknown type name `{name}`"
                    )))
                }
            },
            Pointer(inner) => Pointer(Box::new(self.resolve_type(inner)?)),
            MutPointer(inner) => MutPointer(Box::new(self.resolve_type(inner)?)),
            Array(n, inner) => Array(*n, Box::new(self.resolve_type(inner)?)),
            Struct(packed, fields) => {
                let fields = fields
                    .iter()
                    .map(|f| self.resolve_type(f))
                    .collect::<CompileResult<_>>()?;
                Struct(*packed, fields)
            }
            StructLabeled(packed, fields) => {
                let fields = fields
                    .iter()
                    .map(|(n, f)| Ok((n.clone(), self.resolve_type(f)?)))
                    .collect::<CompileResult<_>>()?;
                StructLabeled(*packed, fields)
            }
            Alias(name, inner) => Alias(name.clone(), Box::new(self.resolve_type(inner)?)),
            Function(params, ret) => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type(p))
                    .collect::<CompileResult<_>>()?;
                Function(params, Box::new(self.resolve_type(ret)?))
            }
            other => other.clone(),
        })
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
