//! Expression typing.
//!
//! `eval_expr_type` assigns a surface type to an expression against a scope
//! stack, rejecting ill-typed programs. It is pure with respect to the
//! scope tree, so the mid-IR builder calls it again during lowering to
//! recover the type of any subexpression.

use opalc_ast::{BinOp, Expr, Mutability, Type, UnOp};
use opalc_util::{CompileError, CompileResult};

use crate::scope::{Binding, ScopeId, ScopeTree};

/// Whether `cast(to, e)` is accepted for an operand of type `from`.
///
/// Viable conversions: between any scalars (integers of any width, floats,
/// bool), pointer to pointer, and integer to/from pointer. Everything else
/// is rejected.
pub fn cast_viable(from: &Type, to: &Type) -> bool {
    let (f, t) = (from.structural(), to.structural());
    let scalar = |x: &Type| x.is_numeric() || matches!(x, Type::Bool);
    if scalar(f) && scalar(t) {
        return true;
    }
    if f.is_pointer() && t.is_pointer() {
        return true;
    }
    (f.is_pointer() && t.is_integer()) || (f.is_integer() && t.is_pointer())
}

/// Type of an expression.
pub fn eval_expr_type(tree: &ScopeTree, chain: &[ScopeId], e: &Expr) -> CompileResult<Type> {
    match e {
        Expr::Identifier(name) => match tree.resolve(chain, name) {
            Some((_, Binding::Value { ty, .. })) => Ok(ty.clone()),
            Some((_, Binding::Ty(_))) => Err(CompileError::Resolution(format!(
                "expected value, got type `{name}`"
            ))),
            None if tree.lookup_type(name).is_some() => Err(CompileError::Resolution(format!(
                "expected value, got type `{name}`"
            ))),
            None => Err(CompileError::Resolution(format!(
                "undefined identifier `{name}`"
            ))),
        },

        Expr::Literal(lit) => Ok(lit.ty()),

        Expr::StructLiteral(fields) => {
            let tys = fields
                .iter()
                .map(|f| eval_expr_type(tree, chain, f))
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(Type::Struct(false, tys))
        }

        Expr::ArrayLiteral(elems) => {
            let mut tys = elems.iter().map(|e| eval_expr_type(tree, chain, e));
            let first = match tys.next() {
                Some(t) => t?,
                None => {
                    return Err(CompileError::Typing(
                        "cannot infer the type of an empty array literal".into(),
                    ))
                }
            };
            for t in tys {
                let t = t?;
                if t != first {
                    return Err(CompileError::Typing(format!(
                        "array elements must share a type: found {first} and {t}"
                    )));
                }
            }
            Ok(Type::Array(elems.len(), Box::new(first)))
        }

        Expr::ArrayInit(elem, n) => {
            let elem = tree.resolve_type(elem)?;
            Ok(Type::Array(*n, Box::new(elem)))
        }

        Expr::Index(base, index) => {
            let it = eval_expr_type(tree, chain, index)?;
            if !it.is_integer() {
                return Err(CompileError::Typing(format!(
                    "array index must be an integer, got {it}"
                )));
            }
            let bt = eval_expr_type(tree, chain, base)?;
            match bt.structural() {
                Type::Array(_, elem) => Ok((**elem).clone()),
                _ => Err(CompileError::Structural(format!(
                    "cannot index into non-array type {bt}"
                ))),
            }
        }

        Expr::Member(base, field) => {
            let bt = eval_expr_type(tree, chain, base)?;
            match bt.structural() {
                Type::StructLabeled(_, fields) => fields
                    .iter()
                    .find(|(n, _)| n == field)
                    .map(|(_, t)| t.clone())
                    .ok_or_else(|| {
                        CompileError::Typing(format!("no field `{field}` on type {bt}"))
                    }),
                _ => Err(CompileError::Structural(format!(
                    "member access on non-labeled struct type {bt}"
                ))),
            }
        }

        Expr::MemberIndex(base, idx) => {
            let bt = eval_expr_type(tree, chain, base)?;
            let fields: Vec<&Type> = match bt.structural() {
                Type::Struct(_, tys) => tys.iter().collect(),
                Type::StructLabeled(_, fields) => fields.iter().map(|(_, t)| t).collect(),
                _ => {
                    return Err(CompileError::Structural(format!(
                        "element access on non-struct type {bt}"
                    )))
                }
            };
            fields.get(*idx).map(|t| (*t).clone()).ok_or_else(|| {
                CompileError::Structural(format!("type {bt} has no element {idx}"))
            })
        }

        Expr::Call(callee, args) => eval_call(tree, chain, callee, args),

        Expr::Cast(to, inner) => {
            let to = tree.resolve_type(to)?;
            let from = eval_expr_type(tree, chain, inner)?;
            if cast_viable(&from, &to) {
                Ok(to)
            } else {
                Err(CompileError::Typing(format!(
                    "cannot cast {from} to {to}"
                )))
            }
        }

        Expr::Binary(op, lhs, rhs) => {
            let lt = eval_expr_type(tree, chain, lhs)?;
            let rt = eval_expr_type(tree, chain, rhs)?;
            eval_binop(*op, &lt, &rt)
        }

        Expr::Unary(op, inner) => {
            let t = eval_expr_type(tree, chain, inner)?;
            match op {
                UnOp::Neg => {
                    if t.is_numeric() {
                        Ok(t)
                    } else {
                        Err(CompileError::Typing(format!("cannot negate {t}")))
                    }
                }
                UnOp::Not => {
                    if matches!(t.structural(), Type::Bool) {
                        Ok(Type::Bool)
                    } else {
                        Err(CompileError::Typing(format!(
                            "logical not requires a boolean operand, got {t}"
                        )))
                    }
                }
                UnOp::BitNot => {
                    if t.is_integer() {
                        Ok(t)
                    } else {
                        Err(CompileError::Typing(format!(
                            "bitwise not requires an integer operand, got {t}"
                        )))
                    }
                }
                UnOp::Deref => match t.structural() {
                    Type::Pointer(p) | Type::MutPointer(p) => Ok((**p).clone()),
                    _ => Err(CompileError::Typing(format!(
                        "cannot dereference non-pointer type {t}"
                    ))),
                },
                UnOp::AddrOf => {
                    // &var yields a mutable pointer; everything else an
                    // immutable one. Both collapse in the target IR.
                    let mutable = matches!(
                        &**inner,
                        Expr::Identifier(n) if matches!(
                            tree.resolve(chain, n),
                            Some((_, Binding::Value { mutability: Mutability::Var, .. }))
                        )
                    );
                    if mutable {
                        Ok(Type::MutPointer(Box::new(t)))
                    } else {
                        Ok(Type::Pointer(Box::new(t)))
                    }
                }
            }
        }

        Expr::Assign(lhs, rhs) => {
            let lt = eval_lvalue_type(tree, chain, lhs)?;
            let rt = eval_expr_type(tree, chain, rhs)?;
            if !lt.compatible(&rt) {
                return Err(CompileError::Typing(format!(
                    "mismatched types in assignment: expected {lt}, got {rt}"
                )));
            }
            Ok(rt)
        }

        Expr::TemplateInstance(name, _) => Err(CompileError::Unsupported(format!(
            "template instantiation of `{name}` must be monomorphised before the backend"
        ))),
    }
}

/// Type of an assignment target, with the mutability rules applied:
/// a named binding must be `var`, a write through a pointer needs the
/// mutable pointer flavor, and a destructuring pattern needs every field
/// to be a valid target itself.
pub fn eval_lvalue_type(tree: &ScopeTree, chain: &[ScopeId], lhs: &Expr) -> CompileResult<Type> {
    match lhs {
        Expr::Identifier(name) => match tree.resolve(chain, name) {
            Some((
                _,
                Binding::Value {
                    mutability: Mutability::Var,
                    ty,
                    ..
                },
            )) => Ok(ty.clone()),
            Some((_, Binding::Value { .. })) => Err(CompileError::Typing(format!(
                "cannot reassign immutable binding `{name}`"
            ))),
            Some((_, Binding::Ty(_))) => Err(CompileError::Resolution(format!(
                "expected value, got type `{name}`"
            ))),
            None => Err(CompileError::Resolution(format!(
                "undefined identifier `{name}`"
            ))),
        },

        Expr::Unary(UnOp::Deref, ptr) => {
            let pt = eval_expr_type(tree, chain, ptr)?;
            match pt.structural() {
                Type::MutPointer(p) => Ok((**p).clone()),
                Type::Pointer(_) => Err(CompileError::Typing(
                    "cannot write through an immutable pointer".into(),
                )),
                _ => Err(CompileError::Typing(format!(
                    "cannot dereference non-pointer type {pt}"
                ))),
            }
        }

        Expr::Index(..) | Expr::Member(..) | Expr::MemberIndex(..) => {
            eval_expr_type(tree, chain, lhs)
        }

        Expr::StructLiteral(dests) => {
            let tys = dests
                .iter()
                .map(|d| eval_lvalue_type(tree, chain, d))
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(Type::Struct(false, tys))
        }

        _ => Err(CompileError::Structural("invalid lvalue".into())),
    }
}

fn eval_binop(op: BinOp, lt: &Type, rt: &Type) -> CompileResult<Type> {
    let arith = |lt: &Type, rt: &Type| {
        if lt == rt && lt.is_numeric() {
            Ok(lt.clone())
        } else {
            Err(CompileError::Typing(format!(
                "mismatched operand types {lt} and {rt}"
            )))
        }
    };

    match op {
        BinOp::Add | BinOp::Sub => {
            // Pointer arithmetic; the mid-IR builder turns these into GEPs.
            if lt.is_pointer() && rt.is_integer() {
                Ok(lt.clone())
            } else if op == BinOp::Add && lt.is_integer() && rt.is_pointer() {
                Ok(rt.clone())
            } else {
                arith(lt, rt)
            }
        }
        BinOp::Mul | BinOp::Div | BinOp::Rem => arith(lt, rt),
        BinOp::Eq => {
            let comparable =
                lt.is_numeric() || lt.is_pointer() || matches!(lt.structural(), Type::Bool);
            if lt == rt && comparable {
                Ok(Type::Bool)
            } else {
                Err(CompileError::Typing(format!(
                    "cannot compare {lt} and {rt}"
                )))
            }
        }
        BinOp::Lt | BinOp::Gt => {
            if lt == rt && lt.is_numeric() {
                Ok(Type::Bool)
            } else {
                Err(CompileError::Typing(format!(
                    "cannot order {lt} and {rt}"
                )))
            }
        }
        BinOp::And | BinOp::Or => {
            if matches!(lt.structural(), Type::Bool) && matches!(rt.structural(), Type::Bool) {
                Ok(Type::Bool)
            } else {
                Err(CompileError::Typing(format!(
                    "logical operator requires boolean operands, got {lt} and {rt}"
                )))
            }
        }
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
            if lt == rt && lt.is_integer() {
                Ok(lt.clone())
            } else {
                Err(CompileError::Typing(format!(
                    "bitwise operator requires matching integer operands, got {lt} and {rt}"
                )))
            }
        }
    }
}

fn eval_call(
    tree: &ScopeTree,
    chain: &[ScopeId],
    callee: &Expr,
    args: &[Expr],
) -> CompileResult<Type> {
    // `TypeName(x)` idiom: a callee naming a type (and shadowed by no
    // value) either constructs a struct or casts its single argument.
    if let Expr::Identifier(name) = callee {
        if tree.resolve(chain, name).is_none() {
            if let Some(body) = tree.lookup_type(name) {
                return eval_type_call(tree, chain, name, &body.clone(), args);
            }
        }
    }

    let callee_ty = eval_expr_type(tree, chain, callee)?;
    match callee_ty.structural() {
        Type::Function(params, ret) => {
            if args.len() != params.len() {
                return Err(CompileError::Typing(format!(
                    "incorrect arity: expected {} arguments, got {}",
                    params.len(),
                    args.len()
                )));
            }
            for (arg, param) in args.iter().zip(params) {
                let at = eval_expr_type(tree, chain, arg)?;
                if !at.compatible(param) {
                    return Err(CompileError::Typing(format!(
                        "mismatched argument type: expected {param}, got {at}"
                    )));
                }
            }
            Ok((**ret).clone())
        }
        _ => Err(CompileError::Typing(format!(
            "call of non-function value of type {callee_ty}"
        ))),
    }
}

fn eval_type_call(
    tree: &ScopeTree,
    chain: &[ScopeId],
    name: &str,
    body: &Type,
    args: &[Expr],
) -> CompileResult<Type> {
    let named = Type::Alias(name.to_string(), Box::new(body.clone()));
    let field_tys: Option<Vec<Type>> = match body.structural() {
        Type::Struct(_, tys) => Some(tys.clone()),
        Type::StructLabeled(_, fields) => Some(fields.iter().map(|(_, t)| t.clone()).collect()),
        _ => None,
    };
    match field_tys {
        Some(fields) => {
            if args.len() != fields.len() {
                return Err(CompileError::Typing(format!(
                    "incorrect arity: `{name}` has {} fields, got {} arguments",
                    fields.len(),
                    args.len()
                )));
            }
            for (arg, field) in args.iter().zip(&fields) {
                let at = eval_expr_type(tree, chain, arg)?;
                if !at.compatible(field) {
                    return Err(CompileError::Typing(format!(
                        "mismatched field type in `{name}`: expected {field}, got {at}"
                    )));
                }
            }
            Ok(named)
        }
        None => {
            if args.len() != 1 {
                return Err(CompileError::Typing(format!(
                    "cast to `{name}` takes exactly one argument, got {}",
                    args.len()
                )));
            }
            let at = eval_expr_type(tree, chain, &args[0])?;
            if cast_viable(&at, &named) {
                Ok(named)
            } else {
                Err(CompileError::Typing(format!(
                    "cannot cast {at} to {name}"
                )))
            }
        }
    }
}
