//! AST to mid-IR lowering.
//!
//! `construct_ir_tree` walks top-level declarations in order, producing a
//! fully typed, globally named tree the linearizer can emit one to one. The
//! builder re-enters the scope tree built by semantic analysis using the
//! same block ordinals, which is also how the mangled names of locals and
//! the dotted block labels are reconstructed.

use opalc_ast as ast;
use opalc_sem::{eval_expr_type, Binding, ScopeId, ScopeTree};
use opalc_util::{CompileError, CompileResult};

use crate::mir::{BinOp, CastKind, CmpOp, Expr, Item, Lit, Stmt, Symbol, Ty, UnOp};

/// Map a resolved source type onto the target algebra. Both pointer
/// flavors collapse to `Ptr`; `bool` becomes the unsigned single bit so
/// widening it picks `zext`.
pub fn lower_type(t: &ast::Type) -> Ty {
    match t {
        ast::Type::Int(w) => Ty::I(*w),
        ast::Type::UInt(w) => Ty::U(*w),
        ast::Type::Float32 => Ty::F(32),
        ast::Type::Float64 => Ty::F(64),
        ast::Type::Bool => Ty::U(1),
        ast::Type::Void => Ty::Void,
        ast::Type::Pointer(inner) | ast::Type::MutPointer(inner) => {
            Ty::Ptr(Box::new(lower_type(inner)))
        }
        ast::Type::Array(n, inner) => Ty::Array(*n, Box::new(lower_type(inner))),
        ast::Type::Struct(packed, fields) => {
            Ty::Struct(*packed, fields.iter().map(lower_type).collect())
        }
        ast::Type::StructLabeled(packed, fields) => Ty::StructLabeled(
            *packed,
            fields
                .iter()
                .map(|(n, t)| (n.clone(), lower_type(t)))
                .collect(),
        ),
        ast::Type::Alias(name, inner) => Ty::Alias(Box::new(lower_type(inner)), name.clone()),
        ast::Type::Stub(name) => Ty::Opaque(name.clone()),
        ast::Type::Function(params, ret) => Ty::Fn(
            params.iter().map(lower_type).collect(),
            Box::new(lower_type(ret)),
        ),
    }
}

fn lower_lit(lit: &ast::Literal) -> Lit {
    match lit {
        ast::Literal::I8(v) => Lit::Int(i64::from(*v)),
        ast::Literal::I16(v) => Lit::Int(i64::from(*v)),
        ast::Literal::I32(v) => Lit::Int(i64::from(*v)),
        ast::Literal::I64(v) => Lit::Int(*v),
        ast::Literal::U8(v) => Lit::Int(i64::from(*v)),
        ast::Literal::U16(v) => Lit::Int(i64::from(*v)),
        ast::Literal::U32(v) => Lit::Int(i64::from(*v)),
        ast::Literal::U64(v) => Lit::Int(*v as i64),
        ast::Literal::F32(v) => Lit::Float(f64::from(*v)),
        ast::Literal::F64(v) => Lit::Float(*v),
        ast::Literal::Bool(v) => Lit::Bool(*v),
        ast::Literal::Str(s) => Lit::Str(s.clone()),
    }
}

/// Build the mid-IR for a whole module.
pub fn construct_ir_tree(module: &ast::Module, tree: &ScopeTree) -> CompileResult<Vec<Item>> {
    let mut items = Vec::new();
    for item in &module.items {
        match item {
            ast::Item::TypeDef(name, _) => {
                let body = tree.lookup_type(name).ok_or_else(|| {
                    CompileError::Structural(format!("missing type binding for `{name}`"))
                })?;
                items.push(Item::TypeDef {
                    ty: lower_type(body),
                    name: name.clone(),
                });
            }
            ast::Item::TypeFwdDef(name) => {
                // Still a stub: the type stays opaque. A closed forward
                // declaration is emitted by its defining TypeDef instead.
                if matches!(tree.lookup_type(name), Some(ast::Type::Stub(_))) {
                    items.push(Item::TypeDef {
                        ty: Ty::Opaque(name.clone()),
                        name: name.clone(),
                    });
                }
            }
            ast::Item::StaticDecl(public, vd) => lower_static(tree, *public, vd, &mut items)?,
            ast::Item::FuncFwdDecl(name, _, _, external) => {
                match tree.scopes[tree.top].bindings.get(name) {
                    // The declaration was closed by a definition later in
                    // the module; the definition emits the symbol.
                    Some(Binding::Value { inner: Some(_), .. }) => {}
                    Some(Binding::Value {
                        ty: ast::Type::Function(params, ret),
                        ..
                    }) => {
                        items.push(Item::FuncFwd {
                            ret: lower_type(&**ret),
                            name: name.clone(),
                            params: params.iter().map(lower_type).collect(),
                            external: *external,
                        });
                    }
                    _ => {
                        return Err(CompileError::Structural(format!(
                            "missing function binding for `{name}`"
                        )))
                    }
                }
            }
            ast::Item::FuncDecl(public, name, params, _, body) => {
                items.push(lower_func(tree, *public, name, params, body)?);
            }
        }
    }
    Ok(items)
}

/// A static declaration. Strings become a private data global plus the
/// public byte-pointer symbol initialized with a constant bitcast of it.
fn lower_static(
    tree: &ScopeTree,
    public: bool,
    vd: &ast::VarDecl,
    items: &mut Vec<Item>,
) -> CompileResult<()> {
    let lit = match &vd.init {
        ast::Expr::Literal(lit) => lit,
        _ => {
            return Err(CompileError::Unsupported(format!(
                "static initialiser of `{}` is not a literal",
                vd.name
            )))
        }
    };
    match lit {
        ast::Literal::Str(s) => {
            let data_name = format!("{}.str", vd.name);
            let len = s.len() + 1;
            items.push(Item::Static {
                ty: Ty::Array(len, Box::new(Ty::I(8))),
                public: false,
                name: data_name.clone(),
                init: Lit::Str(s.clone()),
            });
            items.push(Item::Static {
                ty: Ty::Ptr(Box::new(Ty::I(8))),
                public,
                name: vd.name.clone(),
                init: Lit::GlobalStr {
                    global: data_name,
                    len,
                },
            });
        }
        _ => {
            let ty = match tree.scopes[tree.top].bindings.get(&vd.name) {
                Some(Binding::Value { ty, .. }) => lower_type(ty),
                _ => {
                    return Err(CompileError::Structural(format!(
                        "missing binding for `{}`",
                        vd.name
                    )))
                }
            };
            items.push(Item::Static {
                ty,
                public,
                name: vd.name.clone(),
                init: lower_lit(lit),
            });
        }
    }
    Ok(())
}

fn lower_func(
    tree: &ScopeTree,
    public: bool,
    name: &str,
    params: &[ast::Param],
    body: &[ast::Stmt],
) -> CompileResult<Item> {
    let (param_tys, ret_ty, fscope) = match tree.scopes[tree.top].bindings.get(name) {
        Some(Binding::Value {
            ty: ast::Type::Function(params, ret),
            inner: Some(scope),
            ..
        }) => (params.clone(), (**ret).clone(), *scope),
        _ => {
            return Err(CompileError::Structural(format!(
                "missing function binding for `{name}`"
            )))
        }
    };

    let mut lw = Lowerer {
        tree,
        chain: vec![tree.top, fscope],
        path: vec![name.to_string()],
    };

    let mut body_ir = Vec::new();
    // Spill every parameter into a named slot so later reads go through
    // memory like any other local.
    let mut sig = Vec::with_capacity(params.len());
    for (p, pty) in params.iter().zip(&param_tys) {
        let ty = lower_type(pty);
        sig.push((p.name.clone(), ty.clone()));
        body_ir.push(Stmt::Decl(
            ty.clone(),
            Symbol::Local(format!("{}.{}", name, p.name)),
            Expr::ParamIdent(ty, Symbol::Local(p.name.clone())),
        ));
    }

    let mut ord = 0usize;
    for s in body {
        body_ir.push(lw.map_stmt(s, &mut ord)?);
    }

    let ret = lower_type(&ret_ty);
    // A void body always ends in an explicit return so linearisation can
    // close the final block.
    if ret == Ty::Void && !matches!(body_ir.last(), Some(Stmt::Return(_))) {
        body_ir.push(Stmt::Return(None));
    }

    Ok(Item::Func {
        ret,
        public,
        name: name.to_string(),
        params: sig,
        body: body_ir,
    })
}

// ============================================================================
// THE LOWERER
// ============================================================================

struct Lowerer<'a> {
    tree: &'a ScopeTree,
    /// Scope stack, module scope first.
    chain: Vec<ScopeId>,
    /// Mangled path segments parallel to `chain[1..]`: the function name,
    /// then the ordinals of the enclosing blocks.
    path: Vec<String>,
}

impl<'a> Lowerer<'a> {
    fn src_ty(&self, e: &ast::Expr) -> CompileResult<ast::Type> {
        eval_expr_type(self.tree, &self.chain, e)
    }

    /// The mangled symbol for a name bound at `depth` in the chain.
    fn symbol_at(&self, depth: usize, name: &str) -> Symbol {
        if depth == 0 {
            Symbol::Global(name.to_string())
        } else {
            let mut s = self.path[..depth].join(".");
            s.push('.');
            s.push_str(name);
            Symbol::Local(s)
        }
    }

    fn enter(&mut self, key: &str) -> CompileResult<()> {
        let parent = self.chain[self.chain.len() - 1];
        let scope = self.tree.child(parent, key).ok_or_else(|| {
            CompileError::Structural(format!("missing block scope `{key}`"))
        })?;
        self.chain.push(scope);
        self.path.push(key.to_string());
        Ok(())
    }

    fn exit(&mut self) {
        self.chain.pop();
        self.path.pop();
    }

    fn label(&self) -> String {
        self.path.join(".")
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn map_stmt(&mut self, stmt: &ast::Stmt, ord: &mut usize) -> CompileResult<Stmt> {
        match stmt {
            ast::Stmt::Empty => Ok(Stmt::Empty),
            ast::Stmt::Continue => Ok(Stmt::Continue),
            ast::Stmt::Break => Ok(Stmt::Break),

            ast::Stmt::Decl(vd) => self.map_decl(vd),

            ast::Stmt::Expr(e) => Ok(Stmt::Expr(self.map_expr(e)?)),

            ast::Stmt::Block(stmts) => {
                let key = ord.to_string();
                *ord += 1;
                self.enter(&key)?;
                let label = self.label();
                let body = self.map_stmts(stmts)?;
                self.exit();
                Ok(Stmt::Block(label, body))
            }

            ast::Stmt::IfElse(cond, then_stmts, else_stmts) => {
                let cond = self.map_expr(cond)?;
                let if_key = ord.to_string();
                let else_key = (*ord + 1).to_string();
                *ord += 2;

                self.enter(&if_key)?;
                let if_label = self.label();
                let then_ir = self.map_stmts(then_stmts)?;
                self.exit();

                self.enter(&else_key)?;
                let else_label = self.label();
                let else_ir = self.map_stmts(else_stmts)?;
                self.exit();

                Ok(Stmt::IfElse(if_label, else_label, cond, then_ir, else_ir))
            }

            ast::Stmt::While(cond, body) => {
                let key = ord.to_string();
                *ord += 1;
                self.enter(&key)?;
                let label = self.label();
                let cond = self.map_expr(cond)?;
                let body = self.map_stmts(body)?;
                self.exit();
                Ok(Stmt::While(label, cond, body))
            }

            ast::Stmt::For(vd, cond, inc, body) => {
                let key = ord.to_string();
                *ord += 1;
                self.enter(&key)?;
                let label = self.label();
                let decl = self.map_decl(vd)?;
                let cond = self.map_expr(cond)?;
                let inc = self.map_expr(inc)?;
                let body = self.map_stmts(body)?;
                self.exit();
                Ok(Stmt::For(label, Box::new(decl), cond, inc, body))
            }

            ast::Stmt::Return(None) => Ok(Stmt::Return(None)),
            ast::Stmt::Return(Some(e)) => Ok(Stmt::Return(Some(self.map_expr(e)?))),
        }
    }

    fn map_stmts(&mut self, stmts: &[ast::Stmt]) -> CompileResult<Vec<Stmt>> {
        let mut ord = 0usize;
        stmts.iter().map(|s| self.map_stmt(s, &mut ord)).collect()
    }

    fn map_decl(&mut self, vd: &ast::VarDecl) -> CompileResult<Stmt> {
        let current = self.chain[self.chain.len() - 1];
        let ty_src = match self.tree.scopes[current].bindings.get(&vd.name) {
            Some(Binding::Value { ty, .. }) => ty.clone(),
            _ => {
                return Err(CompileError::Structural(format!(
                    "missing binding for `{}`",
                    vd.name
                )))
            }
        };
        let sym = self.symbol_at(self.chain.len() - 1, &vd.name);
        let init = self.map_expr(&vd.init)?;
        Ok(Stmt::Decl(lower_type(&ty_src), sym, init))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn map_expr(&mut self, e: &ast::Expr) -> CompileResult<Expr> {
        match e {
            ast::Expr::Identifier(name) => match self.tree.resolve(&self.chain, name) {
                Some((depth, Binding::Value { ty, .. })) => {
                    let ty = lower_type(ty);
                    let sym = self.symbol_at(depth, name);
                    Ok(Expr::Ident(ty, sym))
                }
                _ => Err(CompileError::Resolution(format!(
                    "undefined identifier `{name}`"
                ))),
            },

            ast::Expr::Literal(ast::Literal::Str(s)) => Ok(Expr::Lit(
                Ty::Ptr(Box::new(Ty::I(8))),
                Lit::Str(s.clone()),
            )),
            ast::Expr::Literal(lit) => Ok(Expr::Lit(lower_type(&lit.ty()), lower_lit(lit))),

            ast::Expr::StructLiteral(fields) => {
                let ty = lower_type(&self.src_ty(e)?);
                let fields = fields
                    .iter()
                    .map(|f| self.map_expr(f))
                    .collect::<CompileResult<_>>()?;
                Ok(Expr::StructLit(ty, fields))
            }

            ast::Expr::ArrayLiteral(elems) => {
                let ty = lower_type(&self.src_ty(e)?);
                let elems = elems
                    .iter()
                    .map(|el| self.map_expr(el))
                    .collect::<CompileResult<_>>()?;
                Ok(Expr::ArrayLit(ty, elems))
            }

            ast::Expr::ArrayInit(..) => Ok(Expr::ArrayZero(lower_type(&self.src_ty(e)?))),

            ast::Expr::Index(base, index) => {
                let (elem, gep) = self.lower_index(base, index)?;
                Ok(Expr::Deref(elem, Box::new(gep)))
            }

            ast::Expr::Member(..) | ast::Expr::MemberIndex(..) => self.lower_member(e),

            ast::Expr::Call(callee, args) => self.lower_call(callee, args),

            ast::Expr::Cast(to, inner) => {
                let to = self.tree.resolve_type(to)?;
                self.lower_cast(&to, inner)
            }

            ast::Expr::Binary(op, lhs, rhs) => self.lower_binary(e, *op, lhs, rhs),

            ast::Expr::Unary(op, inner) => match op {
                ast::UnOp::Neg => {
                    let ty = lower_type(&self.src_ty(e)?);
                    Ok(Expr::Un(ty, UnOp::Neg, Box::new(self.map_expr(inner)?)))
                }
                ast::UnOp::Not => Ok(Expr::Un(
                    Ty::U(1),
                    UnOp::Not,
                    Box::new(self.map_expr(inner)?),
                )),
                ast::UnOp::BitNot => {
                    let ty = lower_type(&self.src_ty(e)?);
                    Ok(Expr::Un(ty, UnOp::BitNot, Box::new(self.map_expr(inner)?)))
                }
                ast::UnOp::Deref => {
                    let ty = lower_type(&self.src_ty(e)?);
                    Ok(Expr::Deref(ty, Box::new(self.map_expr(inner)?)))
                }
                ast::UnOp::AddrOf => {
                    let ty = lower_type(&self.src_ty(e)?);
                    Ok(Expr::AddressOf(ty, Box::new(self.map_expr(inner)?)))
                }
            },

            ast::Expr::Assign(lhs, rhs) => {
                let rhs_ir = self.map_expr(rhs)?;
                self.lower_assign_to(lhs, rhs_ir)
            }

            ast::Expr::TemplateInstance(name, _) => Err(CompileError::Unsupported(format!(
                "template instantiation of `{name}` must be monomorphised before the backend"
            ))),
        }
    }

    /// `a[i]` as an address: `GEP(&a, [0, i])`. Returns the element type
    /// and the GEP node; rvalue reads wrap it in a deref, lvalue writes
    /// store through it.
    fn lower_index(
        &mut self,
        base: &ast::Expr,
        index: &ast::Expr,
    ) -> CompileResult<(Ty, Expr)> {
        let base_src = self.src_ty(base)?;
        let elem_src = match base_src.structural() {
            ast::Type::Array(_, elem) => (**elem).clone(),
            _ => {
                return Err(CompileError::Structural(format!(
                    "cannot index into non-array type {base_src}"
                )))
            }
        };
        let arr_ty = lower_type(&base_src);
        let elem = lower_type(&elem_src);
        let base_ir = self.map_expr(base)?;
        let index_ir = self.map_expr(index)?;
        let gep = Expr::GetElemPtr {
            ty: Ty::Ptr(Box::new(elem.clone())),
            pointee: arr_ty.clone(),
            base: Box::new(Expr::AddressOf(
                Ty::Ptr(Box::new(arr_ty)),
                Box::new(base_ir),
            )),
            indices: vec![Expr::Lit(Ty::I(32), Lit::Int(0)), index_ir],
        };
        Ok((elem, gep))
    }

    /// `s.f` and `s.N` become extract-value nodes; the labeled struct's
    /// field order supplies the index for named access.
    fn lower_member(&mut self, e: &ast::Expr) -> CompileResult<Expr> {
        let (base, idx, field_src) = match e {
            ast::Expr::Member(base, field) => {
                let bt = self.src_ty(base)?;
                match bt.structural() {
                    ast::Type::StructLabeled(_, fields) => {
                        let (idx, (_, fty)) = fields
                            .iter()
                            .enumerate()
                            .find(|(_, (n, _))| n == field)
                            .ok_or_else(|| {
                                CompileError::Typing(format!("no field `{field}` on type {bt}"))
                            })?;
                        (base, idx, fty.clone())
                    }
                    _ => {
                        return Err(CompileError::Structural(format!(
                            "member access on non-labeled struct type {bt}"
                        )))
                    }
                }
            }
            ast::Expr::MemberIndex(base, idx) => {
                let bt = self.src_ty(base)?;
                let fty = match bt.structural() {
                    ast::Type::Struct(_, tys) => tys.get(*idx).cloned(),
                    ast::Type::StructLabeled(_, fields) => {
                        fields.get(*idx).map(|(_, t)| t.clone())
                    }
                    _ => None,
                }
                .ok_or_else(|| {
                    CompileError::Structural(format!("type {bt} has no element {idx}"))
                })?;
                (base, *idx, fty)
            }
            _ => return Err(CompileError::Structural("not a member access".into())),
        };
        let base_ir = self.map_expr(base)?;
        Ok(Expr::StructAccess(
            lower_type(&field_src),
            Box::new(base_ir),
            idx,
        ))
    }

    fn lower_call(&mut self, callee: &ast::Expr, args: &[ast::Expr]) -> CompileResult<Expr> {
        // A call whose callee names a type is a constructor or a cast.
        if let ast::Expr::Identifier(name) = callee {
            if self.tree.resolve(&self.chain, name).is_none() {
                if let Some(body) = self.tree.lookup_type(name) {
                    let body = body.clone();
                    return self.lower_type_call(name, &body, args);
                }
            }
        }

        let callee_src = self.src_ty(callee)?;
        let (param_srcs, ret_src) = match callee_src.structural() {
            ast::Type::Function(params, ret) => (params.clone(), (**ret).clone()),
            _ => {
                return Err(CompileError::Typing(format!(
                    "call of non-function value of type {callee_src}"
                )))
            }
        };
        let callee_ir = self.map_expr(callee)?;
        let args_ir = args
            .iter()
            .map(|a| self.map_expr(a))
            .collect::<CompileResult<_>>()?;
        Ok(Expr::Call(
            lower_type(&ret_src),
            Box::new(callee_ir),
            param_srcs.iter().map(lower_type).collect(),
            args_ir,
        ))
    }

    fn lower_type_call(
        &mut self,
        name: &str,
        body: &ast::Type,
        args: &[ast::Expr],
    ) -> CompileResult<Expr> {
        let named = ast::Type::Alias(name.to_string(), Box::new(body.clone()));
        match body.structural() {
            ast::Type::Struct(..) | ast::Type::StructLabeled(..) => {
                let ty = lower_type(&named);
                let args_ir = args
                    .iter()
                    .map(|a| self.map_expr(a))
                    .collect::<CompileResult<_>>()?;
                Ok(Expr::StructLit(ty, args_ir))
            }
            _ => match args {
                [arg] => self.lower_cast(&named, arg),
                _ => Err(CompileError::Typing(format!(
                    "cast to `{name}` takes exactly one argument, got {}",
                    args.len()
                ))),
            },
        }
    }

    /// Explicit cast selection. Identity casts vanish; casts to the single
    /// bit expand to a zero comparison.
    fn lower_cast(&mut self, to_src: &ast::Type, inner: &ast::Expr) -> CompileResult<Expr> {
        let to = lower_type(to_src);
        let inner_ir = self.map_expr(inner)?;
        build_cast(to, inner_ir)
    }

    fn lower_binary(
        &mut self,
        e: &ast::Expr,
        op: ast::BinOp,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
    ) -> CompileResult<Expr> {
        use ast::BinOp as B;

        // Pointer arithmetic lowers to address computation, not integer
        // add: `p + n` is `GEP(pointee, p, [n])`, `p - n` negates the
        // index.
        if matches!(op, B::Add | B::Sub) {
            let lt = self.src_ty(lhs)?;
            let rt = self.src_ty(rhs)?;
            let (ptr, ptr_src, idx) = if lt.is_pointer() {
                (lhs, lt, rhs)
            } else if rt.is_pointer() {
                (rhs, rt, lhs)
            } else {
                return self.lower_arith(e, op, lhs, rhs);
            };
            let pointee_src = ptr_src.pointee().ok_or_else(|| {
                CompileError::Structural(format!("pointer type {ptr_src} has no pointee"))
            })?;
            let pointee = lower_type(pointee_src);
            let base = self.map_expr(ptr)?;
            let mut index = self.map_expr(idx)?;
            if op == B::Sub {
                let ity = index.ty().clone();
                index = Expr::Un(ity, UnOp::Neg, Box::new(index));
            }
            return Ok(Expr::GetElemPtr {
                ty: lower_type(&ptr_src),
                pointee,
                base: Box::new(base),
                indices: vec![index],
            });
        }

        self.lower_arith(e, op, lhs, rhs)
    }

    fn lower_arith(
        &mut self,
        e: &ast::Expr,
        op: ast::BinOp,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
    ) -> CompileResult<Expr> {
        use ast::BinOp as B;
        let ty = lower_type(&self.src_ty(e)?);
        let l = Box::new(self.map_expr(lhs)?);
        let r = Box::new(self.map_expr(rhs)?);
        Ok(match op {
            B::Add => Expr::Bin(ty, BinOp::Add, l, r),
            B::Sub => Expr::Bin(ty, BinOp::Sub, l, r),
            B::Mul => Expr::Bin(ty, BinOp::Mul, l, r),
            B::Div => Expr::Bin(ty, BinOp::Div, l, r),
            B::Rem => Expr::Bin(ty, BinOp::Rem, l, r),
            B::Eq => Expr::Cmp(ty, CmpOp::Eq, l, r),
            B::Lt => Expr::Cmp(ty, CmpOp::Lt, l, r),
            B::Gt => Expr::Cmp(ty, CmpOp::Gt, l, r),
            B::And | B::BitAnd => Expr::Bin(ty, BinOp::And, l, r),
            B::Or | B::BitOr => Expr::Bin(ty, BinOp::Or, l, r),
            B::BitXor => Expr::Bin(ty, BinOp::Xor, l, r),
            B::Shl => Expr::Bin(ty, BinOp::Shl, l, r),
            B::Shr => Expr::Bin(ty, BinOp::Shr, l, r),
        })
    }

    /// `=` rewrites by the shape of its left-hand side.
    fn lower_assign_to(&mut self, lhs: &ast::Expr, rhs_ir: Expr) -> CompileResult<Expr> {
        match lhs {
            ast::Expr::Identifier(name) => match self.tree.resolve(&self.chain, name) {
                Some((depth, Binding::Value { ty, .. })) => {
                    let ty = lower_type(ty);
                    let sym = self.symbol_at(depth, name);
                    Ok(Expr::Assign(ty, sym, Box::new(rhs_ir)))
                }
                _ => Err(CompileError::Resolution(format!(
                    "undefined identifier `{name}`"
                ))),
            },

            ast::Expr::Unary(ast::UnOp::Deref, ptr) => {
                let ptr_src = self.src_ty(ptr)?;
                let pointee = ptr_src.pointee().ok_or_else(|| {
                    CompileError::Typing(format!("cannot dereference non-pointer type {ptr_src}"))
                })?;
                let ty = lower_type(pointee);
                let ptr_ir = self.map_expr(ptr)?;
                Ok(Expr::Write(ty, Box::new(ptr_ir), Box::new(rhs_ir)))
            }

            ast::Expr::Index(base, index) => {
                let (elem, gep) = self.lower_index(base, index)?;
                Ok(Expr::Write(elem, Box::new(gep), Box::new(rhs_ir)))
            }

            ast::Expr::Member(..) | ast::Expr::MemberIndex(..) => {
                let access = self.lower_member(lhs)?;
                let ty = access.ty().clone();
                let addr = Expr::AddressOf(Ty::Ptr(Box::new(ty.clone())), Box::new(access));
                Ok(Expr::Write(ty, Box::new(addr), Box::new(rhs_ir)))
            }

            ast::Expr::StructLiteral(dests) => {
                let agg = rhs_ir.ty().clone();
                let fields = agg.fields().ok_or_else(|| {
                    CompileError::Structural(
                        "destructuring assignment from a non-struct value".into(),
                    )
                })?;
                if fields.len() != dests.len() {
                    return Err(CompileError::Structural(format!(
                        "destructuring arity mismatch: {} targets, {} fields",
                        dests.len(),
                        fields.len()
                    )));
                }
                let mut assigns = Vec::with_capacity(dests.len());
                for (idx, (dest, fty)) in dests.iter().zip(&fields).enumerate() {
                    let access = Expr::StructAccess(
                        fty.clone(),
                        Box::new(Expr::Temporary(agg.clone())),
                        idx,
                    );
                    assigns.push(self.lower_assign_to(dest, access)?);
                }
                Ok(Expr::StructAssign(agg, Box::new(rhs_ir), assigns))
            }

            _ => Err(CompileError::Structural("invalid lvalue".into())),
        }
    }
}

/// Pick the cast node for a conversion, or elide it entirely.
fn build_cast(to: Ty, inner: Expr) -> CompileResult<Expr> {
    let from = inner.ty().clone();
    if from.resolve_alias() == to.resolve_alias() {
        return Ok(inner);
    }
    let kind = match (from.resolve_alias(), to.resolve_alias()) {
        // To the single bit: `e != 0`, built as a negated zero comparison.
        (Ty::F(_), Ty::I(1) | Ty::U(1)) => {
            let zero = Expr::Lit(from.clone(), Lit::Float(0.0));
            let eq = Expr::Cmp(Ty::U(1), CmpOp::Eq, Box::new(inner), Box::new(zero));
            return Ok(Expr::Un(Ty::U(1), UnOp::Not, Box::new(eq)));
        }
        (Ty::I(_) | Ty::U(_), Ty::I(1) | Ty::U(1)) => {
            let zero = Expr::Lit(from.clone(), Lit::Int(0));
            let eq = Expr::Cmp(Ty::U(1), CmpOp::Eq, Box::new(inner), Box::new(zero));
            return Ok(Expr::Un(Ty::U(1), UnOp::Not, Box::new(eq)));
        }
        (Ty::I(_) | Ty::U(_), Ty::F(_)) => CastKind::ItoF,
        (Ty::F(_), Ty::I(_) | Ty::U(_)) => CastKind::FtoI,
        (Ty::I(a) | Ty::U(a), Ty::I(b) | Ty::U(b)) => {
            if b < a {
                CastKind::Trunc
            } else if b > a {
                CastKind::Ext
            } else {
                // Same width, different signedness: the representation is
                // identical.
                return Ok(inner);
            }
        }
        (Ty::F(a), Ty::F(b)) => {
            if b < a {
                CastKind::Trunc
            } else {
                CastKind::Ext
            }
        }
        (Ty::Ptr(_), Ty::Ptr(_)) => CastKind::Bitcast,
        (Ty::Ptr(_), Ty::I(_) | Ty::U(_)) => CastKind::PtoI,
        (Ty::I(_) | Ty::U(_), Ty::Ptr(_)) => CastKind::ItoP,
        _ => {
            return Err(CompileError::Typing(format!(
                "unviable cast from {from:?}"
            )))
        }
    };
    Ok(Expr::Cast(to, kind, Box::new(inner)))
}
