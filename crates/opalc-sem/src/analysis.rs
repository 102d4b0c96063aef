//! Symbol-table construction.
//!
//! `construct_symtab` walks top-level declarations in order. A first pass
//! fills the types scope so value declarations can reference types defined
//! anywhere in the file; functions and statics are then declared strictly
//! in order, each function body checked as soon as it is bound, so a body
//! may reference earlier declarations and explicit forward declarations
//! only.

use opalc_ast as ast;
use opalc_ast::{Mutability, Type};
use opalc_util::{CompileError, CompileResult};

use crate::check::eval_expr_type;
use crate::scope::{Binding, ScopeId, ScopeTree};

/// Build the scope tree for a module, type-checking every function body on
/// the way. The returned tree is the contract with the mid-IR builder.
pub fn construct_symtab(module: &ast::Module) -> CompileResult<ScopeTree> {
    let mut tree = ScopeTree::new();
    declare_types(&mut tree, module)?;
    for item in &module.items {
        match item {
            ast::Item::TypeDef(..) | ast::Item::TypeFwdDef(_) => {}
            ast::Item::StaticDecl(_, vd) => declare_static(&mut tree, vd)?,
            ast::Item::FuncFwdDecl(name, params, ret, _) => {
                declare_func_fwd(&mut tree, name, params, ret)?
            }
            ast::Item::FuncDecl(_, name, params, ret, body) => {
                declare_func(&mut tree, name, params, ret, body)?
            }
        }
    }
    Ok(tree)
}

/// First pass: named types, in order. A forward declaration binds a stub;
/// the closing definition resolves its body (self-references stay stubs,
/// which is how recursive types tie the knot by name) and replaces it.
fn declare_types(tree: &mut ScopeTree, module: &ast::Module) -> CompileResult<()> {
    for item in &module.items {
        match item {
            ast::Item::TypeFwdDef(name) => {
                if tree.scopes[tree.types].bindings.contains_key(name) {
                    return Err(CompileError::Duplication(format!(
                        "type `{name}` already declared"
                    )));
                }
                tree.bind(tree.types, name, Binding::Ty(Type::Stub(name.clone())))?;
            }
            ast::Item::TypeDef(name, body) => {
                match tree.scopes[tree.types].bindings.get(name) {
                    None => {
                        tree.bind(tree.types, name, Binding::Ty(Type::Stub(name.clone())))?;
                    }
                    Some(Binding::Ty(Type::Stub(_))) => {}
                    Some(_) => {
                        return Err(CompileError::Duplication(format!(
                            "type `{name}` already defined"
                        )))
                    }
                }
                let resolved = tree.resolve_type(body)?;
                let types = tree.types;
                tree.scopes[types]
                    .bindings
                    .insert(name.clone(), Binding::Ty(resolved));
            }
            _ => {}
        }
    }
    Ok(())
}

/// A static declaration. Initialisers are restricted to literals: constant
/// folding of operator expressions in static position is not implemented.
fn declare_static(tree: &mut ScopeTree, vd: &ast::VarDecl) -> CompileResult<()> {
    let init_ty = match &vd.init {
        ast::Expr::Literal(lit) => lit.ty(),
        ast::Expr::Binary(..) => {
            return Err(CompileError::Unsupported(format!(
                "constant folding in the static initialiser of `{}` is not implemented",
                vd.name
            )))
        }
        _ => {
            return Err(CompileError::Typing(format!(
                "static initialiser of `{}` must be a literal",
                vd.name
            )))
        }
    };
    let ty = declared_type(tree, vd, init_ty)?;
    tree.bind(
        tree.top,
        &vd.name,
        Binding::Value {
            mutability: vd.mutability,
            ty,
            inner: None,
        },
    )
}

/// Resolve parameter and return annotations, rejecting duplicate
/// parameter names.
fn resolve_signature(
    tree: &ScopeTree,
    params: &[ast::Param],
    ret: &Type,
) -> CompileResult<(Vec<Type>, Type)> {
    let mut param_tys = Vec::with_capacity(params.len());
    for (i, p) in params.iter().enumerate() {
        if params[..i].iter().any(|q| q.name == p.name) {
            return Err(CompileError::Duplication(format!(
                "duplicate parameter `{}`",
                p.name
            )));
        }
        param_tys.push(tree.resolve_type(&p.ty)?);
    }
    Ok((param_tys, tree.resolve_type(ret)?))
}

fn declare_func_fwd(
    tree: &mut ScopeTree,
    name: &str,
    params: &[ast::Param],
    ret: &Type,
) -> CompileResult<()> {
    let (param_tys, ret_ty) = resolve_signature(tree, params, ret)?;
    tree.bind(
        tree.top,
        name,
        Binding::Value {
            mutability: Mutability::Val,
            ty: Type::Function(param_tys, Box::new(ret_ty)),
            inner: None,
        },
    )
}

fn declare_func(
    tree: &mut ScopeTree,
    name: &str,
    params: &[ast::Param],
    ret: &Type,
    body: &[ast::Stmt],
) -> CompileResult<()> {
    let (param_tys, ret_ty) = resolve_signature(tree, params, ret)?;
    let fn_ty = Type::Function(param_tys.clone(), Box::new(ret_ty.clone()));

    // A second binding of the same name is legal only when the earlier one
    // is a forward declaration of the same function type.
    match tree.scopes[tree.top].bindings.get(name) {
        None => {}
        Some(Binding::Value { ty, inner: None, .. }) if !matches!(ty, Type::Function(..)) => {
            return Err(CompileError::Duplication(format!(
                "symbol `{name}` already defined"
            )))
        }
        Some(Binding::Value { ty, inner: None, .. }) => {
            if *ty != fn_ty {
                return Err(CompileError::Typing(format!(
                    "definition of `{name}` does not match its forward declaration: expected {ty}, got {fn_ty}"
                )));
            }
        }
        Some(_) => {
            return Err(CompileError::Duplication(format!(
                "symbol `{name}` already defined"
            )))
        }
    }

    let fscope = tree.new_child(tree.top, name);
    for (p, pty) in params.iter().zip(&param_tys) {
        tree.bind(
            fscope,
            &p.name,
            Binding::Value {
                mutability: Mutability::Val,
                ty: pty.clone(),
                inner: None,
            },
        )?;
    }
    let top = tree.top;
    tree.scopes[top].bindings.insert(
        name.to_string(),
        Binding::Value {
            mutability: Mutability::Val,
            ty: fn_ty,
            inner: Some(fscope),
        },
    );

    let mut chain = vec![tree.top, fscope];
    check_stmts(tree, &mut chain, body, &ret_ty)
}

/// Check a statement list, numbering block-shaped statements from zero.
fn check_stmts(
    tree: &mut ScopeTree,
    chain: &mut Vec<ScopeId>,
    stmts: &[ast::Stmt],
    ret_ty: &Type,
) -> CompileResult<()> {
    let mut ord = 0usize;
    for s in stmts {
        check_stmt(tree, chain, s, &mut ord, ret_ty)?;
    }
    Ok(())
}

fn check_stmt(
    tree: &mut ScopeTree,
    chain: &mut Vec<ScopeId>,
    stmt: &ast::Stmt,
    ord: &mut usize,
    ret_ty: &Type,
) -> CompileResult<()> {
    match stmt {
        ast::Stmt::Empty | ast::Stmt::Continue | ast::Stmt::Break => Ok(()),

        ast::Stmt::Decl(vd) => check_decl(tree, chain, vd),

        ast::Stmt::Expr(e) => {
            eval_expr_type(tree, chain, e)?;
            Ok(())
        }

        ast::Stmt::Block(stmts) => {
            enter_block(tree, chain, ord);
            check_stmts(tree, chain, stmts, ret_ty)?;
            chain.pop();
            Ok(())
        }

        ast::Stmt::IfElse(cond, then_stmts, else_stmts) => {
            require_bool(tree, chain, cond, "`if` condition")?;
            enter_block(tree, chain, ord);
            check_stmts(tree, chain, then_stmts, ret_ty)?;
            chain.pop();
            enter_block(tree, chain, ord);
            check_stmts(tree, chain, else_stmts, ret_ty)?;
            chain.pop();
            Ok(())
        }

        ast::Stmt::While(cond, body) => {
            enter_block(tree, chain, ord);
            require_bool(tree, chain, cond, "`while` condition")?;
            check_stmts(tree, chain, body, ret_ty)?;
            chain.pop();
            Ok(())
        }

        ast::Stmt::For(vd, cond, inc, body) => {
            // The induction variable lives in the loop's own scope and is
            // visible in condition, increment, and body.
            enter_block(tree, chain, ord);
            check_decl(tree, chain, vd)?;
            require_bool(tree, chain, cond, "`for` condition")?;
            eval_expr_type(tree, chain, inc)?;
            check_stmts(tree, chain, body, ret_ty)?;
            chain.pop();
            Ok(())
        }

        ast::Stmt::Return(None) => {
            if matches!(ret_ty.structural(), Type::Void) {
                Ok(())
            } else {
                Err(CompileError::Typing(format!(
                    "missing return value: function returns {ret_ty}"
                )))
            }
        }

        ast::Stmt::Return(Some(e)) => {
            let t = eval_expr_type(tree, chain, e)?;
            if t.compatible(ret_ty) {
                Ok(())
            } else {
                Err(CompileError::Typing(format!(
                    "mismatched return type: expected {ret_ty}, got {t}"
                )))
            }
        }
    }
}

fn check_decl(tree: &mut ScopeTree, chain: &[ScopeId], vd: &ast::VarDecl) -> CompileResult<()> {
    let init_ty = eval_expr_type(tree, chain, &vd.init)?;
    let ty = declared_type(tree, vd, init_ty)?;
    if matches!(ty.structural(), Type::Void) {
        return Err(CompileError::Typing(format!(
            "cannot declare `{}` of type void",
            vd.name
        )));
    }
    let current = chain[chain.len() - 1];
    tree.bind(
        current,
        &vd.name,
        Binding::Value {
            mutability: vd.mutability,
            ty,
            inner: None,
        },
    )
}

/// An annotated declaration must match its initialiser; an inferred one
/// takes the initialiser's type.
fn declared_type(tree: &ScopeTree, vd: &ast::VarDecl, init_ty: Type) -> CompileResult<Type> {
    match &vd.ty {
        Some(annot) => {
            let declared = tree.resolve_type(annot)?;
            if !declared.compatible(&init_ty) {
                return Err(CompileError::Typing(format!(
                    "mismatched types in declaration of `{}`: expected {declared}, got {init_ty}",
                    vd.name
                )));
            }
            Ok(declared)
        }
        None => Ok(init_ty),
    }
}

fn enter_block(tree: &mut ScopeTree, chain: &mut Vec<ScopeId>, ord: &mut usize) {
    let parent = chain[chain.len() - 1];
    let scope = tree.new_child(parent, &ord.to_string());
    *ord += 1;
    chain.push(scope);
}

fn require_bool(
    tree: &ScopeTree,
    chain: &[ScopeId],
    cond: &ast::Expr,
    what: &str,
) -> CompileResult<()> {
    let t = eval_expr_type(tree, chain, cond)?;
    if matches!(t.structural(), Type::Bool) {
        Ok(())
    } else {
        Err(CompileError::Typing(format!(
            "{what} must be boolean, got {t}"
        )))
    }
}
