//! The pretty-printer.

use std::fmt::Write;

use opalc_lir::{Inst, Item, Value};
use opalc_mir::{BinOp, CastKind, CmpOp, Lit, Ty};

/// Print a type. Labeled structs degrade to plain structs here; function
/// types print as pointer-to-function since that is what they are at every
/// use site.
pub fn type_str(t: &Ty) -> String {
    match t {
        Ty::I(w) | Ty::U(w) => format!("i{w}"),
        Ty::F(32) => "float".into(),
        Ty::F(_) => "double".into(),
        Ty::Ptr(inner) => format!("{}*", type_str(inner)),
        Ty::Array(n, inner) => format!("[{} x {}]", n, type_str(inner)),
        Ty::Struct(packed, fields) => struct_str(*packed, fields),
        Ty::StructLabeled(packed, fields) => {
            let tys: Vec<Ty> = fields.iter().map(|(_, t)| t.clone()).collect();
            struct_str(*packed, &tys)
        }
        Ty::Fn(params, ret) => {
            let params: Vec<String> = params.iter().map(type_str).collect();
            format!("{} ({})*", type_str(ret), params.join(", "))
        }
        Ty::Opaque(name) | Ty::Alias(_, name) => format!("%\"{name}\""),
        Ty::Void => "void".into(),
    }
}

fn struct_str(packed: bool, fields: &[Ty]) -> String {
    let inner = fields
        .iter()
        .map(type_str)
        .collect::<Vec<_>>()
        .join(", ");
    if packed {
        format!("<{{ {inner} }}>")
    } else {
        format!("{{ {inner} }}")
    }
}

/// Print a value operand.
pub fn value_str(v: &Value) -> String {
    match v {
        Value::Temp(i) => format!("%__tmp.{i}"),
        Value::Named(sym) => sym.to_string(),
        Value::Lit(lit) => lit_str(lit),
        Value::Zero => "zeroinitializer".into(),
        Value::Undef => "undef".into(),
        Value::None => String::new(),
    }
}

fn lit_str(lit: &Lit) -> String {
    match lit {
        Lit::Int(v) => v.to_string(),
        Lit::Float(v) => float_str(*v),
        Lit::Bool(true) => "true".into(),
        Lit::Bool(false) => "false".into(),
        Lit::Str(s) => format!("c\"{}\"", escape_bytes(s)),
        Lit::GlobalStr { global, len } => {
            format!("bitcast ([{len} x i8]* @\"{global}\" to i8*)")
        }
    }
}

fn float_str(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// C-style escaping: printable ASCII passes through, everything else is a
/// two-digit hex escape. The terminating NUL is always appended.
fn escape_bytes(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 3);
    for b in s.bytes() {
        if (32..127).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\{b:02X}");
        }
    }
    out.push_str("\\00");
    out
}

// ============================================================================
// INSTRUCTIONS
// ============================================================================

fn bin_opcode(op: BinOp, ty: &Ty) -> &'static str {
    let float = ty.is_float();
    let signed = ty.is_signed();
    match op {
        BinOp::Add if float => "fadd",
        BinOp::Add => "add",
        BinOp::Sub if float => "fsub",
        BinOp::Sub => "sub",
        BinOp::Mul if float => "fmul",
        BinOp::Mul => "mul",
        BinOp::Div if float => "fdiv",
        BinOp::Div if signed => "sdiv",
        BinOp::Div => "udiv",
        BinOp::Rem if float => "frem",
        BinOp::Rem if signed => "srem",
        BinOp::Rem => "urem",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Xor => "xor",
        BinOp::Shl => "shl",
        BinOp::Shr if signed => "ashr",
        BinOp::Shr => "lshr",
    }
}

fn cmp_opcode(op: CmpOp, ty: &Ty) -> &'static str {
    let signed = ty.is_signed();
    if ty.is_float() {
        match op {
            CmpOp::Eq => "fcmp oeq",
            CmpOp::Lt => "fcmp olt",
            CmpOp::Gt => "fcmp ogt",
        }
    } else {
        match op {
            CmpOp::Eq => "icmp eq",
            CmpOp::Lt if signed => "icmp slt",
            CmpOp::Lt => "icmp ult",
            CmpOp::Gt if signed => "icmp sgt",
            CmpOp::Gt => "icmp ugt",
        }
    }
}

/// The source side picks `zext`/`sext`/`fptoui`/... from the operand
/// types; the cast kind only fixes the family.
fn cast_opcode(kind: CastKind, from: &Ty, to: &Ty) -> &'static str {
    match kind {
        CastKind::ItoF => {
            if from.is_signed() {
                "sitofp"
            } else {
                "uitofp"
            }
        }
        CastKind::FtoI => {
            if to.is_signed() {
                "fptosi"
            } else {
                "fptoui"
            }
        }
        CastKind::Trunc => {
            if from.is_float() {
                "fptrunc"
            } else {
                "trunc"
            }
        }
        CastKind::Ext => {
            if from.is_float() {
                "fpext"
            } else if from.is_signed() {
                "sext"
            } else {
                "zext"
            }
        }
        CastKind::Bitcast => "bitcast",
        CastKind::PtoI => "ptrtoint",
        CastKind::ItoP => "inttoptr",
    }
}

fn inst_str(result: &Value, inst: &Inst) -> String {
    let res = value_str(result);
    match inst {
        Inst::Label(l) => format!("\"{l}\":"),
        Inst::Alloca(ty) => format!("{res} = alloca {}", type_str(ty)),
        Inst::Load(ty, ptr) => {
            let t = type_str(ty);
            format!("{res} = load {t}, {t}* {}", value_str(ptr))
        }
        Inst::Store(ty, value, ptr) => {
            let t = type_str(ty);
            format!("store {t} {}, {t}* {}", value_str(value), value_str(ptr))
        }
        Inst::Gep {
            pointee,
            base,
            indices,
        } => {
            let t = type_str(pointee);
            let mut s = format!("{res} = getelementptr {t}, {t}* {}", value_str(base));
            for (ity, iv) in indices {
                let _ = write!(s, ", {} {}", type_str(ity), value_str(iv));
            }
            s
        }
        Inst::InsertValue {
            agg,
            base,
            field,
            value,
            index,
        } => format!(
            "{res} = insertvalue {} {}, {} {}, {index}",
            type_str(agg),
            value_str(base),
            type_str(field),
            value_str(value)
        ),
        Inst::ExtractValue { agg, base, index } => format!(
            "{res} = extractvalue {} {}, {index}",
            type_str(agg),
            value_str(base)
        ),
        Inst::Call { ret, callee, args } => {
            let args = args
                .iter()
                .map(|(t, v)| format!("{} {}", type_str(t), value_str(v)))
                .collect::<Vec<_>>()
                .join(", ");
            let call = format!("call {} {}({})", type_str(ret), value_str(callee), args);
            if result.is_none() {
                call
            } else {
                format!("{res} = {call}")
            }
        }
        Inst::Ret(None) => "ret void".into(),
        Inst::Ret(Some((ty, v))) => format!("ret {} {}", type_str(ty), value_str(v)),
        Inst::Br(l) => format!("br label %\"{l}\""),
        Inst::BrCond(c, then_lbl, else_lbl) => format!(
            "br i1 {}, label %\"{then_lbl}\", label %\"{else_lbl}\"",
            value_str(c)
        ),
        Inst::Bin(op, ty, lhs, rhs) => format!(
            "{res} = {} {} {}, {}",
            bin_opcode(*op, ty),
            type_str(ty),
            value_str(lhs),
            value_str(rhs)
        ),
        Inst::FNeg(ty, v) => format!("{res} = fneg {} {}", type_str(ty), value_str(v)),
        Inst::Cmp(op, ty, lhs, rhs) => format!(
            "{res} = {} {} {}, {}",
            cmp_opcode(*op, ty),
            type_str(ty),
            value_str(lhs),
            value_str(rhs)
        ),
        Inst::Cast {
            kind,
            from,
            value,
            to,
        } => format!(
            "{res} = {} {} {} to {}",
            cast_opcode(*kind, from, to),
            type_str(from),
            value_str(value),
            type_str(to)
        ),
    }
}

// ============================================================================
// ITEMS
// ============================================================================

fn emit_item(item: &Item, out: &mut String) {
    match item {
        Item::TypeDef { name, ty } => {
            let body = match ty {
                Ty::Opaque(n) if n == name => "opaque".into(),
                other => type_str(other),
            };
            let _ = writeln!(out, "%\"{name}\" = type {body}");
        }
        Item::Global {
            name,
            public,
            ty,
            init,
        } => {
            let linkage = if *public { "" } else { "private " };
            let _ = writeln!(
                out,
                "@\"{name}\" = {linkage}global {} {}",
                type_str(ty),
                value_str(init)
            );
        }
        Item::FuncFwd { name, ret, params } => {
            let params = params.iter().map(type_str).collect::<Vec<_>>().join(", ");
            let _ = writeln!(out, "declare {} @\"{name}\"({params})", type_str(ret));
        }
        Item::Func {
            name,
            public,
            ret,
            params,
            body,
        } => {
            let linkage = if *public { "" } else { "private " };
            let params = params
                .iter()
                .map(|(n, t)| format!("{} %\"{n}\"", type_str(t)))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "define {linkage}{} @\"{name}\"({params}) {{",
                type_str(ret)
            );
            for (result, inst) in body {
                let line = inst_str(result, inst);
                if matches!(inst, Inst::Label(_)) {
                    let _ = writeln!(out, "{line}");
                } else {
                    let _ = writeln!(out, "  {line}");
                }
            }
            let _ = writeln!(out, "}}");
        }
    }
}

/// Serialise a whole module.
pub fn emit_module(items: &[Item]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        emit_item(item, &mut out);
    }
    out
}
