//! End-to-end pipeline tests: whole programs in, textual IR out.

use opalc_ast::*;

use crate::compile_module;

fn ident(n: &str) -> Expr {
    Expr::Identifier(n.into())
}

fn lit(v: i32) -> Expr {
    Expr::Literal(Literal::I32(v))
}

fn decl(mutability: Mutability, name: &str, ty: Option<Type>, init: Expr) -> VarDecl {
    VarDecl {
        mutability,
        name: name.into(),
        ty,
        init,
    }
}

fn var(name: &str, ty: Option<Type>, init: Expr) -> Stmt {
    Stmt::Decl(decl(Mutability::Var, name, ty, init))
}

fn param(name: &str, ty: Type) -> Param {
    Param {
        name: name.into(),
        ty,
    }
}

fn func(name: &str, params: Vec<Param>, ret: Type, body: Vec<Stmt>) -> Item {
    Item::FuncDecl(true, name.into(), params, ret, body)
}

fn compile(items: Vec<Item>) -> String {
    compile_module(&Module { items }).unwrap()
}

fn binary(op: BinOp, l: Expr, r: Expr) -> Expr {
    Expr::Binary(op, Box::new(l), Box::new(r))
}

fn assign(l: Expr, r: Expr) -> Expr {
    Expr::Assign(Box::new(l), Box::new(r))
}

// Locals live in memory; reads load, writes store.
#[test]
fn test_scalar_declaration_and_update() {
    let out = compile(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![
            var("x", Some(Type::Int(32)), lit(3)),
            Stmt::Expr(assign(ident("x"), binary(BinOp::Add, ident("x"), lit(4)))),
            Stmt::Return(None),
        ],
    )]);
    let expected = "define void @\"f\"() {\n  \
        %\"f.x\" = alloca i32\n  \
        store i32 3, i32* %\"f.x\"\n  \
        %__tmp.0 = load i32, i32* %\"f.x\"\n  \
        %__tmp.1 = add i32 %__tmp.0, 4\n  \
        store i32 %__tmp.1, i32* %\"f.x\"\n  \
        ret void\n}\n";
    assert_eq!(out, expected);
}

// Pointer arithmetic is address computation.
#[test]
fn test_pointer_arithmetic_emits_gep() {
    let out = compile(vec![func(
        "f",
        vec![param("p", Type::MutPointer(Box::new(Type::Int(32))))],
        Type::Void,
        vec![
            Stmt::Expr(binary(BinOp::Add, ident("p"), lit(2))),
            Stmt::Return(None),
        ],
    )]);
    assert!(out.contains("%__tmp.1 = getelementptr i32, i32* %__tmp.0, i32 2"));
}

// If/else produces the label triple and a terminator per branch.
#[test]
fn test_if_else_shape() {
    let out = compile(vec![func(
        "f",
        vec![param("x", Type::Int(32))],
        Type::Int(32),
        vec![Stmt::IfElse(
            binary(BinOp::Lt, ident("x"), lit(0)),
            vec![Stmt::Return(Some(Expr::Unary(
                UnOp::Neg,
                Box::new(ident("x")),
            )))],
            vec![Stmt::Return(Some(ident("x")))],
        )],
    )]);
    assert!(out.contains("%__tmp.1 = icmp slt i32 %__tmp.0, 0"));
    assert!(out.contains("br i1 %__tmp.1, label %\"f.0\", label %\"f.1\""));
    assert!(out.contains("\n\"f.0\":\n"));
    assert!(out.contains("\n\"f.1\":\n"));
    assert!(out.contains("\n\"f.0_end\":\n"));
    // Each branch returns, then still branches to the join label.
    assert!(out.contains("sub i32 0, %__tmp.2"));
    assert_eq!(out.matches("  ret i32 ").count(), 2);
    assert_eq!(out.matches("br label %\"f.0_end\"").count(), 2);
}

// For-loop label set and break/continue targets.
#[test]
fn test_for_loop_shape() {
    let out = compile(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![Stmt::For(
            decl(Mutability::Var, "i", Some(Type::Int(32)), lit(0)),
            binary(BinOp::Lt, ident("i"), lit(10)),
            assign(ident("i"), binary(BinOp::Add, ident("i"), lit(1))),
            vec![Stmt::IfElse(
                binary(BinOp::Gt, ident("i"), lit(5)),
                vec![Stmt::Break],
                vec![Stmt::Continue],
            )],
        )],
    )]);
    // The induction variable is scoped to the loop.
    assert!(out.contains("%\"f.0.i\" = alloca i32"));
    for label in ["\"f.0\":", "\"f.0_body\":", "\"f.0_inc\":", "\"f.0_end\":"] {
        assert!(out.contains(label), "missing {label} in:\n{out}");
    }
    // Head: load, compare, conditional branch.
    assert!(out.contains("br i1"));
    assert!(out.contains("icmp slt i32"));
    assert!(out.contains("br label %\"f.0_end\""));
    assert!(out.contains("br label %\"f.0_inc\""));
}

// A static string becomes a private data global plus the bitcast
// pointer symbol.
#[test]
fn test_static_string_pair() {
    let out = compile(vec![Item::StaticDecl(
        true,
        decl(
            Mutability::Val,
            "s",
            None,
            Expr::Literal(Literal::Str("hi".into())),
        ),
    )]);
    assert!(out.contains("@\"s.str\" = private global [3 x i8] c\"hi\\00\""));
    assert!(out.contains("@\"s\" = global i8* bitcast ([3 x i8]* @\"s.str\" to i8*)"));
}

// Struct destructuring extracts each field once into the declared
// slots.
#[test]
fn test_struct_destructure() {
    let out = compile(vec![
        Item::TypeDef(
            "P".into(),
            Type::Struct(false, vec![Type::Int(32), Type::Int(32)]),
        ),
        func(
            "f",
            vec![param("p", Type::Stub("P".into()))],
            Type::Void,
            vec![
                var("a", None, lit(0)),
                var("b", None, lit(0)),
                Stmt::Expr(assign(
                    Expr::StructLiteral(vec![ident("a"), ident("b")]),
                    ident("p"),
                )),
                Stmt::Return(None),
            ],
        ),
    ]);
    assert!(out.contains("%\"P\" = type { i32, i32 }"));
    assert!(out.contains("extractvalue %\"P\" %__tmp.0, 0"));
    assert!(out.contains("extractvalue %\"P\" %__tmp.0, 1"));
    assert!(out.contains("store i32 %__tmp.1, i32* %\"f.a\""));
    assert!(out.contains("store i32 %__tmp.2, i32* %\"f.b\""));
}

#[test]
fn test_determinism() {
    let items = vec![
        Item::StaticDecl(
            true,
            decl(Mutability::Val, "greeting", None, Expr::Literal(Literal::Str("hey".into()))),
        ),
        Item::TypeDef(
            "P".into(),
            Type::Struct(false, vec![Type::Int(32), Type::Int(32)]),
        ),
        func(
            "f",
            vec![param("x", Type::Int(32))],
            Type::Int(32),
            vec![
                var("i", None, ident("x")),
                Stmt::While(
                    binary(BinOp::Lt, ident("i"), lit(10)),
                    vec![Stmt::Expr(assign(
                        ident("i"),
                        binary(BinOp::Add, ident("i"), lit(1)),
                    ))],
                ),
                Stmt::Return(Some(ident("i"))),
            ],
        ),
    ];
    let module = Module { items };
    let a = compile_module(&module).unwrap();
    let b = compile_module(&module).unwrap();
    assert_eq!(a, b);
}

// Law: cast(T, cast(T, e)) emits the same IR as cast(T, e).
#[test]
fn test_cast_idempotence() {
    let single = compile(vec![func(
        "f",
        vec![param("x", Type::Int(64))],
        Type::Void,
        vec![
            Stmt::Expr(Expr::Cast(Type::Int(32), Box::new(ident("x")))),
            Stmt::Return(None),
        ],
    )]);
    let double = compile(vec![func(
        "f",
        vec![param("x", Type::Int(64))],
        Type::Void,
        vec![
            Stmt::Expr(Expr::Cast(
                Type::Int(32),
                Box::new(Expr::Cast(Type::Int(32), Box::new(ident("x")))),
            )),
            Stmt::Return(None),
        ],
    )]);
    assert_eq!(single, double);
}

// Law: &*e adds nothing beyond evaluating e.
#[test]
fn test_address_of_deref_cancellation() {
    let direct = compile(vec![func(
        "f",
        vec![param("p", Type::MutPointer(Box::new(Type::Int(32))))],
        Type::Void,
        vec![
            Stmt::Decl(decl(Mutability::Val, "q", None, ident("p"))),
            Stmt::Return(None),
        ],
    )]);
    let cancelled = compile(vec![func(
        "f",
        vec![param("p", Type::MutPointer(Box::new(Type::Int(32))))],
        Type::Void,
        vec![
            Stmt::Decl(decl(
                Mutability::Val,
                "q",
                None,
                Expr::Unary(
                    UnOp::AddrOf,
                    Box::new(Expr::Unary(UnOp::Deref, Box::new(ident("p")))),
                ),
            )),
            Stmt::Return(None),
        ],
    )]);
    assert_eq!(direct, cancelled);
}

// Law: trailing empty statements do not disturb block ordinals.
#[test]
fn test_block_ordinal_stability() {
    let base = vec![Stmt::Block(vec![var("x", None, lit(1))]), Stmt::Return(None)];
    let with_trailing = vec![
        Stmt::Block(vec![var("x", None, lit(1))]),
        Stmt::Empty,
        Stmt::Return(None),
    ];
    let a = compile(vec![func("f", vec![], Type::Void, base)]);
    let b = compile(vec![func("f", vec![], Type::Void, with_trailing)]);
    assert_eq!(a, b);
}

#[test]
fn test_recursive_type_through_pointer() {
    let out = compile(vec![
        Item::TypeDef(
            "Node".into(),
            Type::Struct(
                false,
                vec![
                    Type::Int(32),
                    Type::Pointer(Box::new(Type::Stub("Node".into()))),
                ],
            ),
        ),
        func(
            "head",
            vec![param("n", Type::MutPointer(Box::new(Type::Stub("Node".into()))))],
            Type::Int(32),
            vec![Stmt::Return(Some(Expr::MemberIndex(
                Box::new(Expr::Unary(UnOp::Deref, Box::new(ident("n")))),
                0,
            )))],
        ),
    ]);
    assert!(out.contains("%\"Node\" = type { i32, %\"Node\"* }"));
    assert!(out.contains("extractvalue %\"Node\""));
    assert!(out.contains("ret i32"));
}

#[test]
fn test_calls_and_forward_declarations() {
    let out = compile(vec![
        Item::FuncFwdDecl(
            "emit".into(),
            vec![param("c", Type::Int(8))],
            Type::Void,
            true,
        ),
        func(
            "twice",
            vec![param("c", Type::Int(8))],
            Type::Void,
            vec![
                Stmt::Expr(Expr::Call(Box::new(ident("emit")), vec![ident("c")])),
                Stmt::Expr(Expr::Call(Box::new(ident("emit")), vec![ident("c")])),
                Stmt::Return(None),
            ],
        ),
    ]);
    assert!(out.contains("declare void @\"emit\"(i8)"));
    assert!(out.contains("define void @\"twice\"(i8 %\"c\") {"));
    assert_eq!(out.matches("call void @\"emit\"(i8 ").count(), 2);
}

#[test]
fn test_while_loop_condition_reevaluates() {
    let out = compile(vec![func(
        "f",
        vec![param("x", Type::Int(32))],
        Type::Void,
        vec![
            var("i", None, ident("x")),
            Stmt::While(
                binary(BinOp::Lt, ident("i"), lit(10)),
                vec![Stmt::Expr(assign(
                    ident("i"),
                    binary(BinOp::Add, ident("i"), lit(1)),
                ))],
            ),
            Stmt::Return(None),
        ],
    )]);
    for label in ["\"f.0_cond\":", "\"f.0_body\":", "\"f.0_end\":"] {
        assert!(out.contains(label), "missing {label} in:\n{out}");
    }
    assert!(out.contains("br i1"));
    // The backedge returns to the condition block.
    assert!(out.contains("br label %\"f.0_cond\""));
}

#[test]
fn test_inline_string_literal_in_function() {
    let out = compile(vec![func(
        "f",
        vec![],
        Type::Void,
        vec![
            Stmt::Decl(decl(
                Mutability::Val,
                "s",
                None,
                Expr::Literal(Literal::Str("ok".into())),
            )),
            Stmt::Return(None),
        ],
    )]);
    assert!(out.contains("alloca [3 x i8]"));
    assert!(out.contains("store [3 x i8] c\"ok\\00\""));
    assert!(out.contains("bitcast [3 x i8]* %__tmp.0 to i8*"));
    assert!(out.contains("%\"f.s\" = alloca i8*"));
}

/// Every `%__tmp.N` result index appears exactly once and in increasing
/// order within a function body.
#[test]
fn test_temporary_indices_are_unique_and_ordered() {
    let out = compile(vec![func(
        "f",
        vec![param("x", Type::Int(32))],
        Type::Int(32),
        vec![
            var(
                "y",
                None,
                binary(
                    BinOp::Mul,
                    binary(BinOp::Add, ident("x"), lit(1)),
                    binary(BinOp::Sub, ident("x"), lit(2)),
                ),
            ),
            Stmt::Return(Some(ident("y"))),
        ],
    )]);
    let mut seen = Vec::new();
    for line in out.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("%__tmp.") {
            if let Some((idx, _)) = rest.split_once(" = ") {
                seen.push(idx.parse::<u32>().unwrap());
            }
        }
    }
    let mut sorted = seen.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(seen, sorted, "temporaries out of order or duplicated: {seen:?}");
}

/// Mixed program exercising statics, globals, and signed/unsigned ops.
#[test]
fn test_globals_are_loaded_and_stored_by_symbol() {
    let out = compile(vec![
        Item::StaticDecl(
            false,
            decl(Mutability::Var, "counter", None, Expr::Literal(Literal::I64(0))),
        ),
        func(
            "bump",
            vec![],
            Type::Void,
            vec![
                Stmt::Expr(assign(
                    ident("counter"),
                    Expr::Binary(
                        BinOp::Add,
                        Box::new(ident("counter")),
                        Box::new(Expr::Literal(Literal::I64(1))),
                    ),
                )),
                Stmt::Return(None),
            ],
        ),
    ]);
    assert!(out.contains("@\"counter\" = private global i64 0"));
    assert!(out.contains("load i64, i64* @\"counter\""));
    assert!(out.contains("store i64 %__tmp.1, i64* @\"counter\""));
}
