//! Unit tests for symbol-table construction and type checking.

use opalc_ast::*;
use opalc_util::CompileError;

use crate::{construct_symtab, Binding};

fn ident(n: &str) -> Expr {
    Expr::Identifier(n.into())
}

fn lit(v: i32) -> Expr {
    Expr::Literal(Literal::I32(v))
}

fn var(name: &str, ty: Option<Type>, init: Expr) -> Stmt {
    Stmt::Decl(VarDecl {
        mutability: Mutability::Var,
        name: name.into(),
        ty,
        init,
    })
}

fn func(name: &str, params: Vec<Param>, ret: Type, body: Vec<Stmt>) -> Item {
    Item::FuncDecl(true, name.into(), params, ret, body)
}

fn module(items: Vec<Item>) -> Module {
    Module { items }
}

fn param(name: &str, ty: Type) -> Param {
    Param {
        name: name.into(),
        ty,
    }
}

#[test]
fn test_symtab_binds_locals_and_blocks_by_ordinal() {
    let m = module(vec![func(
        "f",
        vec![param("a", Type::Int(32))],
        Type::Void,
        vec![
            var("x", None, lit(1)),
            Stmt::Block(vec![var("y", None, lit(2))]),
            Stmt::Block(vec![var("z", None, lit(3))]),
            Stmt::Return(None),
        ],
    )]);
    let tree = construct_symtab(&m).unwrap();

    let fscope = tree.child(tree.top, "f").unwrap();
    assert!(tree.scopes[fscope].bindings.contains_key("a"));
    assert!(tree.scopes[fscope].bindings.contains_key("x"));

    // Blocks are keyed 0, 1 in statement order.
    let b0 = tree.child(fscope, "0").unwrap();
    let b1 = tree.child(fscope, "1").unwrap();
    assert!(tree.scopes[b0].bindings.contains_key("y"));
    assert!(tree.scopes[b1].bindings.contains_key("z"));
}

#[test]
fn test_if_else_takes_two_ordinals() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![
            Stmt::IfElse(
                Expr::Literal(Literal::Bool(true)),
                vec![var("a", None, lit(1))],
                vec![var("b", None, lit(2))],
            ),
            Stmt::Block(vec![]),
        ],
    )]);
    let tree = construct_symtab(&m).unwrap();
    let fscope = tree.child(tree.top, "f").unwrap();
    assert!(tree.child(fscope, "0").is_some());
    assert!(tree.child(fscope, "1").is_some());
    // The trailing block lands on the next free ordinal.
    assert!(tree.child(fscope, "2").is_some());
}

#[test]
fn test_for_scope_holds_induction_variable() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![Stmt::For(
            VarDecl {
                mutability: Mutability::Var,
                name: "i".into(),
                ty: Some(Type::Int(32)),
                init: lit(0),
            },
            Expr::Binary(BinOp::Lt, Box::new(ident("i")), Box::new(lit(10))),
            Expr::Assign(
                Box::new(ident("i")),
                Box::new(Expr::Binary(BinOp::Add, Box::new(ident("i")), Box::new(lit(1)))),
            ),
            vec![Stmt::Expr(ident("i"))],
        )]),
    ]);
    let tree = construct_symtab(&m).unwrap();
    let fscope = tree.child(tree.top, "f").unwrap();
    let loop_scope = tree.child(fscope, "0").unwrap();
    assert!(tree.scopes[loop_scope].bindings.contains_key("i"));
}

#[test]
fn test_duplicate_symbol_rejected() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![var("x", None, lit(1)), var("x", None, lit(2))],
    )]);
    assert!(matches!(
        construct_symtab(&m),
        Err(CompileError::Duplication(_))
    ));
}

#[test]
fn test_duplicate_parameter_rejected() {
    let m = module(vec![func(
        "f",
        vec![param("a", Type::Int(32)), param("a", Type::Int(32))],
        Type::Void,
        vec![],
    )]);
    assert!(matches!(
        construct_symtab(&m),
        Err(CompileError::Duplication(_))
    ));
}

#[test]
fn test_undefined_identifier_rejected() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![Stmt::Expr(ident("nope"))],
    )]);
    assert!(matches!(
        construct_symtab(&m),
        Err(CompileError::Resolution(_))
    ));
}

#[test]
fn test_value_position_type_name_rejected() {
    let m = module(vec![
        Item::TypeDef("P".into(), Type::Struct(false, vec![Type::Int(32)])),
        func("f", vec![], Type::Void, vec![Stmt::Expr(ident("P"))]),
    ]);
    match construct_symtab(&m) {
        Err(CompileError::Resolution(msg)) => assert!(msg.contains("expected value")),
        other => panic!("expected resolution error, got {other:?}"),
    }
}

#[test]
fn test_non_boolean_condition_rejected() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![Stmt::While(lit(1), vec![])],
    )]);
    assert!(matches!(construct_symtab(&m), Err(CompileError::Typing(_))));
}

#[test]
fn test_val_reassignment_rejected() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![
            Stmt::Decl(VarDecl {
                mutability: Mutability::Val,
                name: "x".into(),
                ty: None,
                init: lit(1),
            }),
            Stmt::Expr(Expr::Assign(Box::new(ident("x")), Box::new(lit(2)))),
        ],
    )]);
    match construct_symtab(&m) {
        Err(CompileError::Typing(msg)) => assert!(msg.contains("immutable")),
        other => panic!("expected typing error, got {other:?}"),
    }
}

#[test]
fn test_declared_type_must_match_initialiser() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![var("x", Some(Type::Int(64)), lit(1))],
    )]);
    assert!(matches!(construct_symtab(&m), Err(CompileError::Typing(_))));
}

#[test]
fn test_forward_declaration_must_match_definition() {
    let m = module(vec![
        Item::FuncFwdDecl("f".into(), vec![param("a", Type::Int(32))], Type::Int(32), false),
        func("f", vec![param("a", Type::Int(64))], Type::Int(32), vec![
            Stmt::Return(Some(lit(0))),
        ]),
    ]);
    assert!(matches!(construct_symtab(&m), Err(CompileError::Typing(_))));
}

#[test]
fn test_forward_declaration_closed_by_matching_definition() {
    let m = module(vec![
        Item::FuncFwdDecl("g".into(), vec![], Type::Void, false),
        func("g", vec![], Type::Void, vec![Stmt::Return(None)]),
    ]);
    let tree = construct_symtab(&m).unwrap();
    match tree.scopes[tree.top].bindings.get("g") {
        Some(Binding::Value { inner: Some(_), .. }) => {}
        other => panic!("expected definition binding, got {other:?}"),
    }
}

#[test]
fn test_recursive_type_stays_stub_inside_its_own_body() {
    let m = module(vec![Item::TypeDef(
        "Node".into(),
        Type::Struct(
            false,
            vec![Type::Int(32), Type::Pointer(Box::new(Type::Stub("Node".into())))],
        ),
    )]);
    let tree = construct_symtab(&m).unwrap();
    let body = tree.lookup_type("Node").unwrap();
    match body {
        Type::Struct(_, fields) => {
            assert_eq!(fields[1], Type::Pointer(Box::new(Type::Stub("Node".into()))));
        }
        other => panic!("unexpected body {other:?}"),
    }
}

#[test]
fn test_unknown_type_name_rejected() {
    let m = module(vec![func(
        "f",
        vec![param("a", Type::Stub("Missing".into()))],
        Type::Void,
        vec![],
    )]);
    assert!(matches!(
        construct_symtab(&m),
        Err(CompileError::Resolution(_))
    ));
}

#[test]
fn test_static_operator_initialiser_unsupported() {
    let m = module(vec![Item::StaticDecl(
        false,
        VarDecl {
            mutability: Mutability::Val,
            name: "x".into(),
            ty: Some(Type::Int(32)),
            init: Expr::Binary(BinOp::Add, Box::new(lit(1)), Box::new(lit(2))),
        },
    )]);
    assert!(matches!(
        construct_symtab(&m),
        Err(CompileError::Unsupported(_))
    ));
}

#[test]
fn test_return_type_is_checked() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Int(64),
        vec![Stmt::Return(Some(lit(0)))],
    )]);
    assert!(matches!(construct_symtab(&m), Err(CompileError::Typing(_))));
}

#[test]
fn test_template_instance_rejected() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![Stmt::Expr(Expr::TemplateInstance("box".into(), vec![Type::Int(32)]))],
    )]);
    assert!(matches!(
        construct_symtab(&m),
        Err(CompileError::Unsupported(_))
    ));
}

#[test]
fn test_type_call_constructs_struct() {
    let m = module(vec![
        Item::TypeDef(
            "P".into(),
            Type::Struct(false, vec![Type::Int(32), Type::Int(32)]),
        ),
        func(
            "f",
            vec![],
            Type::Void,
            vec![
                Stmt::Decl(VarDecl {
                    mutability: Mutability::Val,
                    name: "p".into(),
                    ty: Some(Type::Stub("P".into())),
                    init: Expr::Call(Box::new(ident("P")), vec![lit(1), lit(2)]),
                }),
                Stmt::Return(None),
            ],
        ),
    ]);
    construct_symtab(&m).unwrap();
}

#[test]
fn test_type_call_casts_single_argument() {
    let m = module(vec![
        Item::TypeDef("Word".into(), Type::Int(64)),
        func(
            "f",
            vec![param("x", Type::Int(32))],
            Type::Void,
            vec![
                var("w", None, Expr::Call(Box::new(ident("Word")), vec![ident("x")])),
                Stmt::Return(None),
            ],
        ),
    ]);
    construct_symtab(&m).unwrap();
}

#[test]
fn test_call_arity_checked() {
    let m = module(vec![
        Item::FuncFwdDecl("g".into(), vec![param("a", Type::Int(32))], Type::Void, true),
        func(
            "f",
            vec![],
            Type::Void,
            vec![Stmt::Expr(Expr::Call(Box::new(ident("g")), vec![]))],
        ),
    ]);
    match construct_symtab(&m) {
        Err(CompileError::Typing(msg)) => assert!(msg.contains("arity")),
        other => panic!("expected arity error, got {other:?}"),
    }
}

#[test]
fn test_non_function_callee_rejected() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![
            var("x", None, lit(1)),
            Stmt::Expr(Expr::Call(Box::new(ident("x")), vec![])),
        ],
    )]);
    assert!(matches!(construct_symtab(&m), Err(CompileError::Typing(_))));
}

#[test]
fn test_unviable_cast_rejected() {
    let m = module(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![
            var("x", None, lit(1)),
            Stmt::Expr(Expr::Cast(
                Type::Struct(false, vec![Type::Int(32)]),
                Box::new(ident("x")),
            )),
        ],
    )]);
    assert!(matches!(construct_symtab(&m), Err(CompileError::Typing(_))));
}

#[test]
fn test_pointer_arithmetic_accepted() {
    let m = module(vec![func(
        "f",
        vec![param("p", Type::MutPointer(Box::new(Type::Int(32))))],
        Type::Void,
        vec![
            Stmt::Expr(Expr::Binary(BinOp::Add, Box::new(ident("p")), Box::new(lit(2)))),
            Stmt::Return(None),
        ],
    )]);
    construct_symtab(&m).unwrap();
}
