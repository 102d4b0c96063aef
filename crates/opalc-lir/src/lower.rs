//! Mid-IR to linear SSA.
//!
//! The builder threads the fold state of the walk: the innermost loop's
//! continue/break labels, the monotonically increasing temporary counter,
//! the scratch value of an in-flight struct assignment, and the
//! instruction list. Every result-producing instruction consumes one
//! temporary id; transitions between blocks are always explicit branches,
//! never fall-through.

use opalc_mir as mir;
use opalc_mir::{BinOp, CastKind, Lit, Ty, UnOp};
use opalc_util::{CompileError, CompileResult};

use crate::lir::{Inst, Item, Value};

/// Linearise a whole module.
pub fn codegen_module(items: &[mir::Item]) -> CompileResult<Vec<Item>> {
    items.iter().map(codegen_item).collect()
}

/// Linearise one top-level item.
pub fn codegen_item(item: &mir::Item) -> CompileResult<Item> {
    match item {
        mir::Item::Static {
            ty,
            public,
            name,
            init,
        } => Ok(Item::Global {
            name: name.clone(),
            public: *public,
            ty: ty.clone(),
            init: Value::Lit(init.clone()),
        }),
        mir::Item::TypeDef { ty, name } => Ok(Item::TypeDef {
            name: name.clone(),
            ty: ty.clone(),
        }),
        mir::Item::FuncFwd {
            ret, name, params, ..
        } => Ok(Item::FuncFwd {
            name: name.clone(),
            ret: ret.clone(),
            params: params.clone(),
        }),
        mir::Item::Func {
            ret,
            public,
            name,
            params,
            body,
        } => {
            let mut b = Builder::new();
            for s in body {
                b.stmt(s)?;
            }
            Ok(Item::Func {
                name: name.clone(),
                public: *public,
                ret: ret.clone(),
                params: params.clone(),
                body: b.finish(),
            })
        }
    }
}

/// Per-function fold state.
pub struct Builder {
    cont_lbl: Option<String>,
    brk_lbl: Option<String>,
    next_tmp: u32,
    scratch: Option<Value>,
    insts: Vec<(Value, Inst)>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            cont_lbl: None,
            brk_lbl: None,
            next_tmp: 0,
            scratch: None,
            insts: Vec::new(),
        }
    }

    pub fn finish(self) -> Vec<(Value, Inst)> {
        self.insts
    }

    fn fresh(&mut self) -> Value {
        let v = Value::Temp(self.next_tmp);
        self.next_tmp += 1;
        v
    }

    /// Emit a result-producing instruction.
    fn emit(&mut self, inst: Inst) -> Value {
        let v = self.fresh();
        self.insts.push((v.clone(), inst));
        v
    }

    /// Emit an instruction with no result.
    fn emit_void(&mut self, inst: Inst) {
        self.insts.push((Value::None, inst));
    }

    fn label(&mut self, l: &str) {
        self.emit_void(Inst::Label(l.to_string()));
    }

    fn br(&mut self, l: &str) {
        self.emit_void(Inst::Br(l.to_string()));
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn stmt(&mut self, s: &mir::Stmt) -> CompileResult<()> {
        match s {
            mir::Stmt::Empty => Ok(()),

            mir::Stmt::Decl(ty, sym, init) => {
                let slot = Value::Named(sym.clone());
                self.insts.push((slot.clone(), Inst::Alloca(ty.clone())));
                let v = self.expr(init)?;
                self.emit_void(Inst::Store(ty.clone(), v, slot));
                Ok(())
            }

            mir::Stmt::Expr(e) => {
                self.expr(e)?;
                Ok(())
            }

            mir::Stmt::Block(label, stmts) => {
                let end = format!("{label}_end");
                self.br(label);
                self.label(label);
                for s in stmts {
                    self.stmt(s)?;
                }
                self.br(&end);
                self.label(&end);
                Ok(())
            }

            mir::Stmt::IfElse(if_lbl, else_lbl, cond, then_stmts, else_stmts) => {
                let end = format!("{if_lbl}_end");
                let c = self.expr(cond)?;
                self.emit_void(Inst::BrCond(c, if_lbl.clone(), else_lbl.clone()));
                self.label(if_lbl);
                for s in then_stmts {
                    self.stmt(s)?;
                }
                self.br(&end);
                self.label(else_lbl);
                for s in else_stmts {
                    self.stmt(s)?;
                }
                self.br(&end);
                self.label(&end);
                Ok(())
            }

            mir::Stmt::While(lbl, cond, body) => {
                let cond_lbl = format!("{lbl}_cond");
                let body_lbl = format!("{lbl}_body");
                let end_lbl = format!("{lbl}_end");
                let saved = (self.cont_lbl.take(), self.brk_lbl.take());
                self.cont_lbl = Some(cond_lbl.clone());
                self.brk_lbl = Some(end_lbl.clone());

                self.br(&cond_lbl);
                self.label(&cond_lbl);
                let c = self.expr(cond)?;
                self.emit_void(Inst::BrCond(c, body_lbl.clone(), end_lbl.clone()));
                self.label(&body_lbl);
                for s in body {
                    self.stmt(s)?;
                }
                self.br(&cond_lbl);
                self.label(&end_lbl);

                (self.cont_lbl, self.brk_lbl) = saved;
                Ok(())
            }

            mir::Stmt::For(lbl, decl, cond, inc, body) => {
                let body_lbl = format!("{lbl}_body");
                let inc_lbl = format!("{lbl}_inc");
                let end_lbl = format!("{lbl}_end");
                // The induction variable's slot lives before the loop head.
                self.stmt(decl)?;
                let saved = (self.cont_lbl.take(), self.brk_lbl.take());
                self.cont_lbl = Some(inc_lbl.clone());
                self.brk_lbl = Some(end_lbl.clone());

                self.br(lbl);
                self.label(lbl);
                let c = self.expr(cond)?;
                self.emit_void(Inst::BrCond(c, body_lbl.clone(), end_lbl.clone()));
                self.label(&body_lbl);
                for s in body {
                    self.stmt(s)?;
                }
                self.br(&inc_lbl);
                self.label(&inc_lbl);
                self.expr(inc)?;
                self.br(lbl);
                self.label(&end_lbl);

                (self.cont_lbl, self.brk_lbl) = saved;
                Ok(())
            }

            mir::Stmt::Continue => match self.cont_lbl.clone() {
                Some(l) => {
                    self.br(&l);
                    Ok(())
                }
                None => Err(CompileError::Control("`continue` outside of a loop".into())),
            },

            mir::Stmt::Break => match self.brk_lbl.clone() {
                Some(l) => {
                    self.br(&l);
                    Ok(())
                }
                None => Err(CompileError::Control("`break` outside of a loop".into())),
            },

            mir::Stmt::Return(None) => {
                self.emit_void(Inst::Ret(None));
                Ok(())
            }

            mir::Stmt::Return(Some(e)) => {
                let v = self.expr(e)?;
                self.emit_void(Inst::Ret(Some((e.ty().clone(), v))));
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn expr(&mut self, e: &mir::Expr) -> CompileResult<Value> {
        match e {
            // Reading a function yields its symbol; anything else lives in
            // memory and is loaded.
            mir::Expr::Ident(ty, sym) => {
                if matches!(ty.resolve_alias(), Ty::Fn(..)) {
                    Ok(Value::Named(sym.clone()))
                } else {
                    Ok(self.emit(Inst::Load(ty.clone(), Value::Named(sym.clone()))))
                }
            }

            mir::Expr::ParamIdent(_, sym) => Ok(Value::Named(sym.clone())),

            mir::Expr::Lit(_, Lit::Str(s)) => {
                // An inline string is a stack array holding the constant,
                // handed around as a byte pointer.
                let arr = Ty::Array(s.len() + 1, Box::new(Ty::I(8)));
                let slot = self.emit(Inst::Alloca(arr.clone()));
                self.emit_void(Inst::Store(
                    arr.clone(),
                    Value::Lit(Lit::Str(s.clone())),
                    slot.clone(),
                ));
                Ok(self.emit(Inst::Cast {
                    kind: CastKind::Bitcast,
                    from: Ty::Ptr(Box::new(arr)),
                    value: slot,
                    to: Ty::Ptr(Box::new(Ty::I(8))),
                }))
            }

            mir::Expr::Lit(_, lit) => Ok(Value::Lit(lit.clone())),

            mir::Expr::StructLit(ty, fields) | mir::Expr::ArrayLit(ty, fields) => {
                let mut current = Value::Undef;
                for (index, field) in fields.iter().enumerate() {
                    let v = self.expr(field)?;
                    current = self.emit(Inst::InsertValue {
                        agg: ty.clone(),
                        base: current,
                        field: field.ty().clone(),
                        value: v,
                        index,
                    });
                }
                Ok(current)
            }

            mir::Expr::ArrayZero(_) => Ok(Value::Zero),

            mir::Expr::Assign(ty, sym, rhs) => {
                let v = self.expr(rhs)?;
                self.emit_void(Inst::Store(ty.clone(), v, Value::Named(sym.clone())));
                Ok(Value::None)
            }

            mir::Expr::Write(ty, ptr, rhs) => {
                let p = self.expr(ptr)?;
                let v = self.expr(rhs)?;
                self.emit_void(Inst::Store(ty.clone(), v, p));
                Ok(Value::None)
            }

            mir::Expr::Call(ret, callee, param_tys, args) => {
                let f = self.expr(callee)?;
                let mut call_args = Vec::with_capacity(args.len());
                for (arg, ty) in args.iter().zip(param_tys) {
                    let v = self.expr(arg)?;
                    call_args.push((ty.clone(), v));
                }
                let inst = Inst::Call {
                    ret: ret.clone(),
                    callee: f,
                    args: call_args,
                };
                if *ret == Ty::Void {
                    self.emit_void(inst);
                    Ok(Value::None)
                } else {
                    Ok(self.emit(inst))
                }
            }

            mir::Expr::Bin(ty, op, lhs, rhs) => {
                let l = self.expr(lhs)?;
                let r = self.expr(rhs)?;
                Ok(self.emit(Inst::Bin(*op, ty.clone(), l, r)))
            }

            mir::Expr::Cmp(_, op, lhs, rhs) => {
                let operand_ty = lhs.ty().clone();
                let l = self.expr(lhs)?;
                let r = self.expr(rhs)?;
                Ok(self.emit(Inst::Cmp(*op, operand_ty, l, r)))
            }

            mir::Expr::Un(ty, op, inner) => {
                let v = self.expr(inner)?;
                match op {
                    UnOp::Neg if ty.is_float() => Ok(self.emit(Inst::FNeg(ty.clone(), v))),
                    UnOp::Neg => Ok(self.emit(Inst::Bin(
                        BinOp::Sub,
                        ty.clone(),
                        Value::Lit(Lit::Int(0)),
                        v,
                    ))),
                    UnOp::Not => Ok(self.emit(Inst::Bin(
                        BinOp::Xor,
                        ty.clone(),
                        v,
                        Value::Lit(Lit::Bool(true)),
                    ))),
                    UnOp::BitNot => Ok(self.emit(Inst::Bin(
                        BinOp::Xor,
                        ty.clone(),
                        v,
                        Value::Lit(Lit::Int(-1)),
                    ))),
                }
            }

            mir::Expr::Deref(ty, ptr) => {
                let p = self.expr(ptr)?;
                Ok(self.emit(Inst::Load(ty.clone(), p)))
            }

            mir::Expr::AddressOf(_, inner) => self.address_of(inner),

            mir::Expr::Cast(to, kind, inner) => {
                let from = inner.ty().clone();
                let v = self.expr(inner)?;
                Ok(self.emit(Inst::Cast {
                    kind: *kind,
                    from,
                    value: v,
                    to: to.clone(),
                }))
            }

            mir::Expr::StructAssign(_, base, fields) => {
                let v = self.expr(base)?;
                let saved = self.scratch.replace(v.clone());
                for field in fields {
                    self.expr(field)?;
                }
                self.scratch = saved;
                Ok(v)
            }

            mir::Expr::StructAccess(_, base, index) => {
                let agg = base.ty().clone();
                let b = self.expr(base)?;
                Ok(self.emit(Inst::ExtractValue {
                    agg,
                    base: b,
                    index: *index,
                }))
            }

            mir::Expr::GetElemPtr {
                pointee,
                base,
                indices,
                ..
            } => {
                let b = self.expr(base)?;
                let mut idx_vals = Vec::with_capacity(indices.len());
                for idx in indices {
                    let ty = idx.ty().clone();
                    let v = self.expr(idx)?;
                    idx_vals.push((ty, v));
                }
                Ok(self.emit(Inst::Gep {
                    pointee: pointee.clone(),
                    base: b,
                    indices: idx_vals,
                }))
            }

            mir::Expr::Temporary(_) => self.scratch.clone().ok_or_else(|| {
                CompileError::Structural(
                    "struct temporary outside of a struct assignment".into(),
                )
            }),
        }
    }

    /// The address of an expression. `&*e` cancels; identifiers already
    /// denote memory; member access becomes a GEP chain rooted at the
    /// base's address. Anything else has no address.
    fn address_of(&mut self, e: &mir::Expr) -> CompileResult<Value> {
        match e {
            mir::Expr::Deref(_, inner) => self.expr(inner),

            mir::Expr::Ident(_, sym) | mir::Expr::ParamIdent(_, sym) => {
                Ok(Value::Named(sym.clone()))
            }

            mir::Expr::StructAccess(_, base, index) => {
                let agg = base.ty().clone();
                let base_addr = self.address_of(base)?;
                Ok(self.emit(Inst::Gep {
                    pointee: agg,
                    base: base_addr,
                    indices: vec![
                        (Ty::I(32), Value::Lit(Lit::Int(0))),
                        (Ty::I(32), Value::Lit(Lit::Int(*index as i64))),
                    ],
                }))
            }

            _ => Err(CompileError::Structural(
                "cannot take the address of a temporary value".into(),
            )),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
