//! Unit tests for the surface-type algebra.

use crate::*;

fn pair_i32() -> Type {
    Type::Struct(false, vec![Type::Int(32), Type::Int(32)])
}

#[test]
fn test_structural_equality() {
    assert_eq!(Type::Int(32), Type::Int(32));
    assert_ne!(Type::Int(32), Type::Int(64));
    assert_ne!(Type::Int(32), Type::UInt(32));
    assert_eq!(
        Type::Pointer(Box::new(Type::Bool)),
        Type::Pointer(Box::new(Type::Bool))
    );
    assert_ne!(
        Type::Pointer(Box::new(Type::Bool)),
        Type::MutPointer(Box::new(Type::Bool))
    );
    assert_eq!(pair_i32(), pair_i32());
    assert_ne!(pair_i32(), Type::Struct(true, vec![Type::Int(32), Type::Int(32)]));
}

#[test]
fn test_alias_equality_is_by_name_and_body() {
    let a = Type::Alias("P".into(), Box::new(pair_i32()));
    let b = Type::Alias("P".into(), Box::new(pair_i32()));
    let c = Type::Alias("Q".into(), Box::new(pair_i32()));
    assert_eq!(a, b);
    assert_ne!(a, c);
    // An alias is not its bare body.
    assert_ne!(a, pair_i32());
}

#[test]
fn test_stub_matches_alias_of_same_name() {
    let stub = Type::Stub("Node".into());
    let alias = Type::Alias("Node".into(), Box::new(pair_i32()));
    assert_eq!(stub, alias);
    assert_eq!(alias, stub);
    assert_eq!(stub, Type::Stub("Node".into()));
    assert_ne!(stub, Type::Stub("Edge".into()));
}

#[test]
fn test_structural_strips_aliases() {
    let nested = Type::Alias(
        "A".into(),
        Box::new(Type::Alias("B".into(), Box::new(Type::Int(8)))),
    );
    assert_eq!(nested.structural(), &Type::Int(8));
    assert!(nested.is_integer());
    assert!(nested.is_numeric());
}

#[test]
fn test_compatible_ignores_top_level_alias() {
    let named = Type::Alias("P".into(), Box::new(pair_i32()));
    assert!(named.compatible(&pair_i32()));
    assert!(pair_i32().compatible(&named));
    assert!(!named.compatible(&Type::Int(32)));
}

#[test]
fn test_pointee() {
    let p = Type::MutPointer(Box::new(Type::Float64));
    assert_eq!(p.pointee(), Some(&Type::Float64));
    assert_eq!(Type::Bool.pointee(), None);
}

#[test]
fn test_literal_types_have_fixed_widths() {
    assert_eq!(Literal::I8(1).ty(), Type::Int(8));
    assert_eq!(Literal::U64(1).ty(), Type::UInt(64));
    assert_eq!(Literal::F32(1.0).ty(), Type::Float32);
    assert_eq!(Literal::Bool(true).ty(), Type::Bool);
    assert_eq!(
        Literal::Str("hi".into()).ty(),
        Type::Pointer(Box::new(Type::Int(8)))
    );
}

#[test]
fn test_display_names_aliases_and_stubs() {
    let named = Type::Alias("P".into(), Box::new(pair_i32()));
    assert_eq!(named.to_string(), "P");
    assert_eq!(Type::Stub("Node".into()).to_string(), "Node");
    assert_eq!(pair_i32().to_string(), "(i32, i32)");
    assert_eq!(
        Type::Function(vec![Type::Int(32)], Box::new(Type::Void)).to_string(),
        "fn(i32) -> void"
    );
}
