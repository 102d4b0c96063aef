//! Mid-IR node definitions: the target-type algebra, symbols, and the
//! typed expression/statement/root trees.

use std::fmt;

// ============================================================================
// TARGET TYPES
// ============================================================================

/// A type of the target IR.
///
/// Signedness is carried here (`I` vs `U`) but printed identically; the
/// emitter selects signed or unsigned *operations* from it. An `Alias`
/// carries the name to be printed; callers that need structure call
/// [`Ty::resolve_alias`] to strip it.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    I(u32),
    U(u32),
    F(u32),
    Ptr(Box<Ty>),
    Array(usize, Box<Ty>),
    Struct(bool, Vec<Ty>),
    StructLabeled(bool, Vec<(String, Ty)>),
    Fn(Vec<Ty>, Box<Ty>),
    /// A named type of unknown shape (open forward declaration, or a
    /// recursive self-reference).
    Opaque(String),
    Alias(Box<Ty>, String),
    Void,
}

impl Ty {
    /// Strip alias wrappers down to the underlying shape.
    pub fn resolve_alias(&self) -> &Ty {
        match self {
            Ty::Alias(t, _) => t.resolve_alias(),
            other => other,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.resolve_alias(), Ty::I(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.resolve_alias(), Ty::F(_))
    }

    /// Field types of a struct shape, labels dropped.
    pub fn fields(&self) -> Option<Vec<Ty>> {
        match self.resolve_alias() {
            Ty::Struct(_, tys) => Some(tys.clone()),
            Ty::StructLabeled(_, fields) => Some(fields.iter().map(|(_, t)| t.clone()).collect()),
            _ => None,
        }
    }
}

/// A resolved symbol: module-level values print with `@`, function-local
/// storage with `%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Global(String),
    Local(String),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Global(name) => write!(f, "@\"{name}\""),
            Symbol::Local(name) => write!(f, "%\"{name}\""),
        }
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// String bytes; realized as a NUL-terminated `[N x i8]` constant.
    Str(String),
    /// Pointer to a private string global, printed as a constant bitcast.
    GlobalStr { global: String, len: usize },
}

// ============================================================================
// OPERATORS & CASTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    /// Boolean negation; realized as `xor .. true`.
    Not,
    /// Bitwise complement; realized as `xor .. -1`.
    BitNot,
}

/// The viable conversions, one node each. Which machine instruction a kind
/// becomes (`zext` vs `sext`, `fptosi` vs `fptoui`, ...) is decided by the
/// operand types at emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    ItoF,
    FtoI,
    Bitcast,
    PtoI,
    ItoP,
    Trunc,
    Ext,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// A mid-IR expression. Every node carries the target type of its result.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A resolved variable; reading it goes through memory.
    Ident(Ty, Symbol),
    /// A raw SSA function argument; only appears in parameter prologues.
    ParamIdent(Ty, Symbol),
    Lit(Ty, Lit),
    StructLit(Ty, Vec<Expr>),
    ArrayLit(Ty, Vec<Expr>),
    /// Zero-filled array value.
    ArrayZero(Ty),
    /// Scalar store into a named slot.
    Assign(Ty, Symbol, Box<Expr>),
    /// Store through a computed pointer.
    Write(Ty, Box<Expr>, Box<Expr>),
    /// Call; the parameter types ride along for printing.
    Call(Ty, Box<Expr>, Vec<Ty>, Vec<Expr>),
    Bin(Ty, BinOp, Box<Expr>, Box<Expr>),
    Cmp(Ty, CmpOp, Box<Expr>, Box<Expr>),
    Un(Ty, UnOp, Box<Expr>),
    Deref(Ty, Box<Expr>),
    AddressOf(Ty, Box<Expr>),
    Cast(Ty, CastKind, Box<Expr>),
    /// Assign into the fields of a struct value: the base expression is
    /// evaluated once, then each field expression may reference it through
    /// [`Expr::Temporary`].
    StructAssign(Ty, Box<Expr>, Vec<Expr>),
    /// Extract field `n` of a struct value.
    StructAccess(Ty, Box<Expr>, usize),
    /// Address computation through an aggregate or pointer.
    GetElemPtr {
        ty: Ty,
        pointee: Ty,
        base: Box<Expr>,
        indices: Vec<Expr>,
    },
    /// The scratch value of the innermost enclosing `StructAssign`.
    Temporary(Ty),
}

impl Expr {
    /// The target type of this expression's result.
    pub fn ty(&self) -> &Ty {
        match self {
            Expr::Ident(t, _)
            | Expr::ParamIdent(t, _)
            | Expr::Lit(t, _)
            | Expr::StructLit(t, _)
            | Expr::ArrayLit(t, _)
            | Expr::ArrayZero(t)
            | Expr::Assign(t, _, _)
            | Expr::Write(t, _, _)
            | Expr::Call(t, _, _, _)
            | Expr::Bin(t, _, _, _)
            | Expr::Cmp(t, _, _, _)
            | Expr::Un(t, _, _)
            | Expr::Deref(t, _)
            | Expr::AddressOf(t, _)
            | Expr::Cast(t, _, _)
            | Expr::StructAssign(t, _, _)
            | Expr::StructAccess(t, _, _)
            | Expr::GetElemPtr { ty: t, .. }
            | Expr::Temporary(t) => t,
        }
    }
}

// ============================================================================
// STATEMENTS & ROOTS
// ============================================================================

/// A mid-IR statement. Block-shaped statements carry the dotted label path
/// reconstructed from the scope tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Empty,
    Decl(Ty, Symbol, Expr),
    Expr(Expr),
    Block(String, Vec<Stmt>),
    IfElse(String, String, Expr, Vec<Stmt>, Vec<Stmt>),
    While(String, Expr, Vec<Stmt>),
    For(String, Box<Stmt>, Expr, Expr, Vec<Stmt>),
    Continue,
    Break,
    Return(Option<Expr>),
}

/// A lowered top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Static {
        ty: Ty,
        public: bool,
        name: String,
        init: Lit,
    },
    Func {
        ret: Ty,
        public: bool,
        name: String,
        params: Vec<(String, Ty)>,
        body: Vec<Stmt>,
    },
    FuncFwd {
        ret: Ty,
        name: String,
        params: Vec<Ty>,
        external: bool,
    },
    TypeDef {
        ty: Ty,
        name: String,
    },
}
