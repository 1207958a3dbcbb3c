//! IR builder facade: a thin, stateful wrapper over textual LLVM IR.
//!
//! This writes straight into a `String` buffer with `writeln!`, rather
//! than building an in-memory instruction graph: `fresh_temp`/`fresh_block` hand out
//! SSA names, and every `emit_*` call appends one line of IR. Locals are
//! always `alloca`'d in the function's entry block and accessed through
//! `load`/`store`, matching unoptimized `clang -O0` output — simpler to
//! get right than a mem2reg-style virtual register allocator, and
//! `opt`/`llc` downstream can promote them anyway.

use crate::types::{Kind, TypeId, TypeRegistry};
use std::collections::HashMap;
use std::fmt::Write as _;

pub struct Module {
    pub source_name: String,
    globals: String,
    functions: String,
    string_globals: HashMap<String, String>,
    next_string_id: u32,
}

impl Module {
    pub fn new(source_name: String) -> Self {
        Module {
            source_name,
            globals: String::new(),
            functions: String::new(),
            string_globals: HashMap::new(),
            next_string_id: 0,
        }
    }

    /// Intern a string literal as a global constant, returning its
    /// global name. Repeated literals share one global.
    pub fn get_string_global(&mut self, content: &str) -> String {
        if let Some(name) = self.string_globals.get(content) {
            return name.clone();
        }
        let name = format!("@.str.{}", self.next_string_id);
        self.next_string_id += 1;
        let escaped = escape_llvm_string(content);
        let len = content.len() + 1;
        writeln!(
            self.globals,
            "{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
            name, len, escaped
        )
        .unwrap();
        self.string_globals.insert(content.to_string(), name.clone());
        name
    }

    pub fn declare_global(&mut self, name: &str, llvm_ty: &str, is_extern: bool, init: Option<&str>) {
        if is_extern {
            writeln!(self.globals, "@{} = external global {}", mangle_name(name), llvm_ty).unwrap();
        } else {
            let init = init.unwrap_or("zeroinitializer");
            writeln!(self.globals, "@{} = global {} {}", mangle_name(name), llvm_ty, init).unwrap();
        }
    }

    pub fn declare_function(&mut self, signature: &str) {
        writeln!(self.functions, "declare {}", signature).unwrap();
    }

    pub fn push_function_body(&mut self, text: &str) {
        self.functions.push_str(text);
        self.functions.push('\n');
    }

    /// The full textual IR for this module.
    pub fn render(&self) -> String {
        let mut out = String::new();
        writeln!(out, "; ModuleID = '{}'", self.source_name).unwrap();
        writeln!(out, "source_filename = \"{}\"", self.source_name).unwrap();
        out.push('\n');
        out.push_str(&self.globals);
        out.push('\n');
        out.push_str(&self.functions);
        out
    }
}

/// Escapes a string for an LLVM `c"..."` constant: printable ASCII passes
/// through, everything else becomes a two-digit hex escape.
pub fn escape_llvm_string(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'\\' => out.push_str("\\5C"),
            b'"' => out.push_str("\\22"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                write!(out, "\\{:02X}", b).unwrap();
            }
        }
    }
    out
}

/// Escapes an identifier for use as an LLVM local/global name: safe
/// characters pass through, everything else becomes a hex-escaped
/// fragment so the result is still a valid (if ugly) LLVM identifier.
pub fn mangle_name(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            out.push(c);
        } else {
            write!(out, "_{:02x}", c as u32).unwrap();
        }
    }
    out
}

/// Lower a [`TypeId`] to its LLVM spelling. Struct/enum/array layouts are
/// expanded structurally; function types become pointer-to-function only
/// at call sites.
pub fn llvm_type(types: &TypeRegistry, t: TypeId) -> String {
    match types.kind(types.resolve_alias(t)) {
        Kind::Void => "void".to_string(),
        Kind::Nullptr => "ptr".to_string(),
        Kind::Auto => "ptr".to_string(),
        Kind::Int { width: 1, .. } => "i1".to_string(),
        Kind::Int { width, .. } => format!("i{}", width),
        Kind::Float { double: false } => "float".to_string(),
        Kind::Float { double: true } => "double".to_string(),
        Kind::Pointer { .. } => "ptr".to_string(),
        Kind::Array { of, len: Some(n) } => format!("[{} x {}]", n, llvm_type(types, of)),
        Kind::Array { len: None, .. } => "ptr".to_string(),
        Kind::Function { ret, params, varargs } => {
            let mut s = format!("{} (", llvm_type(types, ret));
            let parts: Vec<String> = params.iter().map(|p| llvm_type(types, *p)).collect();
            s.push_str(&parts.join(", "));
            if varargs {
                if !params.is_empty() {
                    s.push_str(", ");
                }
                s.push_str("...");
            }
            s.push(')');
            s
        }
        Kind::Struct { id, .. } => {
            let size = types.aggregate_size(t).unwrap_or(0);
            let mut fields = Vec::with_capacity(size);
            for i in 0..size {
                if let Some(fty) = types.aggregate_type(t, i) {
                    fields.push(llvm_type(types, fty));
                }
            }
            let _ = id;
            format!("{{ {} }}", fields.join(", "))
        }
        Kind::Enum { underlying, .. } => llvm_type(types, underlying),
        Kind::Alias { to, .. } => llvm_type(types, to),
    }
}

/// Per-function emission state: the counters and output buffer a single
/// function body is built from.
pub struct FunctionBuilder {
    pub name: String,
    out: String,
    next_temp: u32,
    next_block: u32,
    current_block_open: bool,
    current_block: String,
}

impl FunctionBuilder {
    pub fn new(name: String) -> Self {
        FunctionBuilder {
            name,
            out: String::new(),
            next_temp: 0,
            next_block: 0,
            current_block_open: false,
            current_block: String::new(),
        }
    }

    /// Name of the block most recently opened with [`FunctionBuilder::label`].
    /// Callers building `phi` nodes use this as the predecessor label rather
    /// than the label they branched to, since the value may have been
    /// produced several blocks further in (nested conditionals, short-circuit
    /// operators).
    pub fn current_block(&self) -> &str {
        &self.current_block
    }

    pub fn fresh_temp(&mut self) -> String {
        let n = self.next_temp;
        self.next_temp += 1;
        format!("%t{}", n)
    }

    pub fn fresh_block(&mut self, hint: &str) -> String {
        let n = self.next_block;
        self.next_block += 1;
        format!("{}.{}", hint, n)
    }

    pub fn emit(&mut self, line: impl AsRef<str>) {
        self.out.push_str("  ");
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    pub fn label(&mut self, name: &str) {
        if self.current_block_open {
            // A fallthrough into a new label needs an explicit branch;
            // the caller is responsible for emitting one before calling
            // `label` whenever control can still reach this point.
        }
        self.out.push_str(name);
        self.out.push_str(":\n");
        self.current_block_open = true;
        self.current_block = name.to_string();
    }

    pub fn alloca(&mut self, dest: &str, llvm_ty: &str) {
        self.emit(format!("{} = alloca {}", dest, llvm_ty));
    }

    pub fn store(&mut self, llvm_ty: &str, value: &str, ptr: &str) {
        self.emit(format!("store {} {}, ptr {}", llvm_ty, value, ptr));
    }

    pub fn load(&mut self, dest: &str, llvm_ty: &str, ptr: &str) {
        self.emit(format!("{} = load {}, ptr {}", dest, llvm_ty, ptr));
    }

    /// Branch to `target`, unless the current block already ended in a
    /// terminator (`ret`/`br`/`unreachable`) emitted earlier — e.g. a
    /// `return` inside an `if` arm or `switch` case already closed the
    /// block, and a literal second `br` would make it ill-formed.
    pub fn br(&mut self, target: &str) {
        if !self.current_block_open {
            return;
        }
        self.emit(format!("br label %{}", target));
        self.current_block_open = false;
    }

    pub fn cond_br(&mut self, cond: &str, then_label: &str, else_label: &str) {
        self.emit(format!("br i1 {}, label %{}, label %{}", cond, then_label, else_label));
        self.current_block_open = false;
    }

    pub fn ret(&mut self, llvm_ty: &str, value: Option<&str>) {
        match value {
            Some(v) => self.emit(format!("ret {} {}", llvm_ty, v)),
            None => self.emit("ret void".to_string()),
        }
        self.current_block_open = false;
    }

    pub fn unreachable(&mut self) {
        self.emit("unreachable".to_string());
        self.current_block_open = false;
    }

    pub fn binop(&mut self, dest: &str, op: &str, llvm_ty: &str, lhs: &str, rhs: &str) {
        self.emit(format!("{} = {} {} {}, {}", dest, op, llvm_ty, lhs, rhs));
    }

    pub fn icmp(&mut self, dest: &str, cond: &str, llvm_ty: &str, lhs: &str, rhs: &str) {
        self.emit(format!("{} = icmp {} {} {}, {}", dest, cond, llvm_ty, lhs, rhs));
    }

    pub fn fcmp(&mut self, dest: &str, cond: &str, llvm_ty: &str, lhs: &str, rhs: &str) {
        self.emit(format!("{} = fcmp {} {} {}, {}", dest, cond, llvm_ty, lhs, rhs));
    }

    pub fn cast(&mut self, dest: &str, op: &str, from_ty: &str, value: &str, to_ty: &str) {
        self.emit(format!("{} = {} {} {} to {}", dest, op, from_ty, value, to_ty));
    }

    pub fn gep(&mut self, dest: &str, elem_ty: &str, base: &str, indices: &[(&str, &str)]) {
        let idx: Vec<String> = indices.iter().map(|(ty, v)| format!("{} {}", ty, v)).collect();
        self.emit(format!("{} = getelementptr {}, ptr {}, {}", dest, elem_ty, base, idx.join(", ")));
    }

    pub fn call(
        &mut self,
        dest: Option<&str>,
        ret_ty: &str,
        callee: &str,
        args: &[(&str, &str)],
    ) {
        let args_s: Vec<String> = args.iter().map(|(ty, v)| format!("{} {}", ty, v)).collect();
        let call_expr = format!("call {} @{}({})", ret_ty, mangle_name(callee), args_s.join(", "));
        match dest {
            Some(d) => self.emit(format!("{} = {}", d, call_expr)),
            None => self.emit(call_expr),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_quotes_and_newlines() {
        assert_eq!(escape_llvm_string("a\"b"), "a\\22b");
        assert_eq!(escape_llvm_string("a\nb"), "a\\0Ab");
    }

    #[test]
    fn mangle_name_passes_safe_chars_through() {
        assert_eq!(mangle_name("b0.x"), "b0.x");
        assert_eq!(mangle_name("f?"), "f_3f");
    }

    #[test]
    fn string_globals_dedup() {
        let mut m = Module::new("t.abc".to_string());
        let a = m.get_string_global("hi");
        let b = m.get_string_global("hi");
        assert_eq!(a, b);
        let c = m.get_string_global("bye");
        assert_ne!(a, c);
    }

    #[test]
    fn llvm_type_lowers_primitives_and_pointers() {
        let reg = TypeRegistry::new();
        assert_eq!(llvm_type(&reg, reg.i32()), "i32");
        assert_eq!(llvm_type(&reg, reg.bool_type()), "i1");
        assert_eq!(llvm_type(&reg, reg.pointer(reg.i32())), "ptr");
        assert_eq!(llvm_type(&reg, reg.double()), "double");
    }

    #[test]
    fn function_builder_tracks_blocks_and_temps() {
        let mut f = FunctionBuilder::new("main".to_string());
        let t0 = f.fresh_temp();
        let t1 = f.fresh_temp();
        assert_ne!(t0, t1);
        f.alloca("%x", "i32");
        f.ret("i32", Some("0"));
        assert!(f.finish().contains("alloca i32"));
    }

    #[test]
    fn br_after_a_terminator_is_a_no_op() {
        let mut f = FunctionBuilder::new("main".to_string());
        f.label("entry");
        f.ret("i32", Some("0"));
        f.br("entry.unreachable");
        let text = f.finish();
        assert_eq!(text.matches("ret i32 0").count(), 1);
        assert!(!text.contains("br label %entry.unreachable"));
    }
}
