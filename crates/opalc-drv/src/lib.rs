//! opalc-drv - Backend Pipeline Driver
//!
//! Chains the backend passes over one compilation unit:
//!
//! ```text
//! parse tree -> [opalc-sem] scope tree -> [opalc-mir] mid-IR
//!            -> [opalc-lir] linear SSA -> [opalc-gen] textual module
//! ```
//!
//! Each pass consumes its input and either produces the next stage or
//! aborts with the first error; the emitter is never reached on an
//! ill-formed program. File handling and command-line concerns belong to
//! the front-end driver, not here.

use opalc_ast as ast;
use opalc_util::CompileResult;

#[cfg(test)]
mod tests;

/// Compile a typed parse tree into a textual IR module.
pub fn compile_module(module: &ast::Module) -> CompileResult<String> {
    let symtab = opalc_sem::construct_symtab(module)?;
    let ir = opalc_mir::construct_ir_tree(module, &symtab)?;
    let items = opalc_lir::codegen_module(&ir)?;
    Ok(opalc_gen::emit_module(&items))
}
