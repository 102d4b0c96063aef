//! Linear SSA instruction model.

use opalc_mir::{BinOp, CastKind, CmpOp, Lit, Symbol, Ty};

/// An SSA value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A compiler temporary, printed `%__tmp.N`.
    Temp(u32),
    /// A named slot or symbol: allocas, globals, functions, parameters.
    Named(Symbol),
    Lit(Lit),
    Zero,
    Undef,
    /// The result slot of an instruction that produces nothing.
    None,
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

/// A single instruction. Operand types ride along so the emitter can print
/// them and pick signed or unsigned opcodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    Alloca(Ty),
    Load(Ty, Value),
    /// `store ty value, ty* ptr`
    Store(Ty, Value, Value),
    Gep {
        pointee: Ty,
        base: Value,
        indices: Vec<(Ty, Value)>,
    },
    InsertValue {
        agg: Ty,
        base: Value,
        field: Ty,
        value: Value,
        index: usize,
    },
    ExtractValue {
        agg: Ty,
        base: Value,
        index: usize,
    },
    Call {
        ret: Ty,
        callee: Value,
        args: Vec<(Ty, Value)>,
    },
    Ret(Option<(Ty, Value)>),
    Label(String),
    Br(String),
    BrCond(Value, String, String),
    Bin(BinOp, Ty, Value, Value),
    FNeg(Ty, Value),
    Cmp(CmpOp, Ty, Value, Value),
    Cast {
        kind: CastKind,
        from: Ty,
        value: Value,
        to: Ty,
    },
}

impl Inst {
    /// Whether this instruction ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Inst::Ret(_) | Inst::Br(_) | Inst::BrCond(..))
    }
}

/// A linearised top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Global {
        name: String,
        public: bool,
        ty: Ty,
        init: Value,
    },
    Func {
        name: String,
        public: bool,
        ret: Ty,
        params: Vec<(String, Ty)>,
        body: Vec<(Value, Inst)>,
    },
    FuncFwd {
        name: String,
        ret: Ty,
        params: Vec<Ty>,
    },
    TypeDef {
        name: String,
        ty: Ty,
    },
}
