//! AST → IR emission.
//!
//! Walks the already-typed [`Program`] and drives a [`Module`]/
//! [`FunctionBuilder`] pair. Each statement/expression visit returns just
//! enough to let its caller keep going: statements return nothing (they
//! either fall through to the next line of IR or explicitly terminate the
//! block), expressions return an operand string plus the block it ended
//! in where that matters for control flow (`&&`/`||`/`?:`).
//!
//! Break/continue/goto are resolved against a small stack of active loop
//! labels carried on [`CodeGen`]; a `goto` into a not-yet-seen label is
//! legal (labels can appear anywhere in the enclosing function), so label
//! targets are pre-scanned per function body before statements are
//! emitted.

use crate::ast::{Block, FnDef, GlobalVar, Program, Stmt, TopLevel};
use crate::expr::{BinaryOp, Expr, ExprKind, Literal, SizeofOperand, UnaryOp};
use crate::ir::{llvm_type, mangle_name, FunctionBuilder, Module};
use crate::location::Location;
use crate::types::{Kind, TypeId, TypeRegistry};
use std::collections::HashMap;

/// Link-time contract for a failed `assert`: `__assert(msg, file, line)`.
/// Only the call site is this crate's concern; the definition is supplied
/// by the runtime linked against the compiler's output.
const ASSERT_SIGNATURE: &str = "i1 @__assert(ptr, ptr, i32)";

struct LoopLabels {
    continue_label: String,
    break_label: String,
}

pub struct CodeGen<'a> {
    types: &'a TypeRegistry,
    module: Module,
    loop_stack: Vec<LoopLabels>,
    /// Pre-scanned `label name:` → generated block name, filled once per
    /// function before statement emission begins.
    labels: HashMap<String, String>,
    /// Set once the first `assert` in the module has forced a declaration
    /// of the extern `__assert` it expands into.
    assert_declared: bool,
    /// Synthetic-local counter for compound literals that appear in a
    /// general expression position (`.compound0`, `.compound1`, ...).
    next_compound_local: u32,
}

impl<'a> CodeGen<'a> {
    pub fn new(types: &'a TypeRegistry, source_name: String) -> Self {
        CodeGen {
            types,
            module: Module::new(source_name),
            loop_stack: Vec::new(),
            labels: HashMap::new(),
            assert_declared: false,
            next_compound_local: 0,
        }
    }

    pub fn emit_program(mut self, program: &Program) -> String {
        for item in &program.items {
            match item {
                TopLevel::Global(g) => self.emit_global(g),
                TopLevel::FnDecl(d) => {
                    let ret = llvm_type(self.types, d.ret);
                    let params: Vec<String> = d.params.iter().map(|p| llvm_type(self.types, p.ty)).collect();
                    let mut sig = format!("{} @{}({}", ret, mangle_name(&d.mangled), params.join(", "));
                    if d.varargs {
                        if !d.params.is_empty() {
                            sig.push_str(", ");
                        }
                        sig.push_str("...");
                    }
                    sig.push(')');
                    self.module.declare_function(&sig);
                }
                TopLevel::FnDef(def) => self.emit_fn_def(def),
                TopLevel::Struct(_) | TopLevel::Enum(_) | TopLevel::Alias(_) => {}
            }
        }
        self.module.render()
    }

    fn emit_global(&mut self, g: &GlobalVar) {
        let llvm_ty = llvm_type(self.types, g.ty);
        if g.is_extern {
            self.module.declare_global(&g.mangled, &llvm_ty, true, None);
            return;
        }
        let init = g.init.as_ref().and_then(|e| self.const_operand(e));
        self.module.declare_global(&g.mangled, &llvm_ty, false, init.as_deref());
    }

    /// Render a constant-foldable expression as an LLVM constant operand.
    fn const_operand(&self, e: &Expr) -> Option<String> {
        match &e.kind {
            ExprKind::Literal(Literal::Int(v)) => Some(v.to_string()),
            ExprKind::Literal(Literal::Bool(b)) => Some(if *b { "1".to_string() } else { "0".to_string() }),
            ExprKind::Literal(Literal::Char(c)) => Some((*c as i64).to_string()),
            ExprKind::Literal(Literal::Float(v)) => Some(format!("{:?}", v)),
            ExprKind::Literal(Literal::Null) => Some("null".to_string()),
            _ => e.load_constant().map(|v| v.to_string()),
        }
    }

    fn scan_labels(&mut self, f: &mut FunctionBuilder, block: &Block) {
        for s in &block.stmts {
            self.scan_labels_stmt(f, s);
        }
    }

    fn scan_labels_stmt(&mut self, f: &mut FunctionBuilder, s: &Stmt) {
        match s {
            Stmt::Label { name, .. } => {
                let block_name = f.fresh_block(&format!("L.{}", name));
                self.labels.insert(name.as_str().to_string(), block_name);
            }
            Stmt::Block(b) => self.scan_labels(f, b),
            Stmt::If { then_branch, else_branch, .. } => {
                self.scan_labels_stmt(f, then_branch);
                if let Some(e) = else_branch {
                    self.scan_labels_stmt(f, e);
                }
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::For { body, .. } => {
                self.scan_labels_stmt(f, body);
            }
            Stmt::Switch { arms, .. } => {
                for (_, body) in arms {
                    for st in body {
                        self.scan_labels_stmt(f, st);
                    }
                }
            }
            _ => {}
        }
    }

    fn emit_fn_def(&mut self, def: &FnDef) {
        let mut f = FunctionBuilder::new(def.decl.mangled.clone());
        self.labels.clear();
        self.scan_labels(&mut f, &def.body);

        let ret_ty = llvm_type(self.types, def.decl.ret);
        let params: Vec<String> = def
            .decl
            .params
            .iter()
            .map(|p| format!("{} %arg.{}", llvm_type(self.types, p.ty), p.name))
            .collect();

        f.label("entry");
        for p in &def.decl.params {
            let pty = llvm_type(self.types, p.ty);
            let slot = format!("%{}", p.name);
            f.alloca(&slot, &pty);
            f.store(&pty, &format!("%arg.{}", p.name), &slot);
        }

        self.emit_block(&mut f, &def.body);
        if self.types.is_void(def.decl.ret) {
            f.ret(&ret_ty, None);
        } else {
            // A function that falls off its body without a `return` on
            // every path is an error the parser already should have
            // rejected in a stricter front end; here we terminate with an
            // `unreachable` so the IR stays well-formed even if that
            // check is ever relaxed.
            f.unreachable();
        }

        let body_text = f.finish();
        let header = format!(
            "define {} @{}({}) {{\n",
            ret_ty,
            mangle_name(&def.decl.mangled),
            params.join(", ")
        );
        self.module.push_function_body(&format!("{}{}}}\n", header, body_text));
    }

    fn emit_block(&mut self, f: &mut FunctionBuilder, block: &Block) {
        for s in &block.stmts {
            self.emit_stmt(f, s);
        }
    }

    fn emit_stmt(&mut self, f: &mut FunctionBuilder, s: &Stmt) {
        match s {
            Stmt::Local(local) => {
                let ty = llvm_type(self.types, local.ty);
                let slot = format!("%{}", local.mangled);
                f.alloca(&slot, &ty);
                if let Some(init) = &local.init {
                    if let ExprKind::CompoundLiteral(items) = &init.kind {
                        self.emit_compound_literal_into(f, &slot, local.ty, items);
                    } else {
                        let (val, _) = self.emit_expr(f, init);
                        f.store(&ty, &val, &slot);
                    }
                }
            }
            Stmt::Expr(e) => {
                self.emit_expr(f, e);
            }
            Stmt::Block(b) => self.emit_block(f, b),
            Stmt::If { cond, then_branch, else_branch } => {
                let then_label = f.fresh_block("if.then");
                let else_label = f.fresh_block("if.else");
                let end_label = f.fresh_block("if.end");
                let (cond_val, _) = self.emit_expr(f, cond);
                f.cond_br(&cond_val, &then_label, &else_label);
                f.label(&then_label);
                self.emit_stmt(f, then_branch);
                f.br(&end_label);
                f.label(&else_label);
                if let Some(e) = else_branch {
                    self.emit_stmt(f, e);
                }
                f.br(&end_label);
                f.label(&end_label);
            }
            Stmt::While { cond, body } => {
                let head = f.fresh_block("while.head");
                let body_label = f.fresh_block("while.body");
                let end = f.fresh_block("while.end");
                f.br(&head);
                f.label(&head);
                let (cond_val, _) = self.emit_expr(f, cond);
                f.cond_br(&cond_val, &body_label, &end);
                f.label(&body_label);
                self.loop_stack.push(LoopLabels { continue_label: head.clone(), break_label: end.clone() });
                self.emit_stmt(f, body);
                self.loop_stack.pop();
                f.br(&head);
                f.label(&end);
            }
            Stmt::DoWhile { body, cond } => {
                let body_label = f.fresh_block("do.body");
                let cond_label = f.fresh_block("do.cond");
                let end = f.fresh_block("do.end");
                f.br(&body_label);
                f.label(&body_label);
                self.loop_stack.push(LoopLabels { continue_label: cond_label.clone(), break_label: end.clone() });
                self.emit_stmt(f, body);
                self.loop_stack.pop();
                f.br(&cond_label);
                f.label(&cond_label);
                let (cond_val, _) = self.emit_expr(f, cond);
                f.cond_br(&cond_val, &body_label, &end);
                f.label(&end);
            }
            Stmt::For { init, cond, step, body } => {
                if let Some(init) = init {
                    self.emit_stmt(f, init);
                }
                let head = f.fresh_block("for.head");
                let body_label = f.fresh_block("for.body");
                let step_label = f.fresh_block("for.step");
                let end = f.fresh_block("for.end");
                f.br(&head);
                f.label(&head);
                match cond {
                    Some(c) => {
                        let (cond_val, _) = self.emit_expr(f, c);
                        f.cond_br(&cond_val, &body_label, &end);
                    }
                    None => f.br(&body_label),
                }
                f.label(&body_label);
                self.loop_stack.push(LoopLabels { continue_label: step_label.clone(), break_label: end.clone() });
                self.emit_stmt(f, body);
                self.loop_stack.pop();
                f.br(&step_label);
                f.label(&step_label);
                if let Some(step) = step {
                    self.emit_expr(f, step);
                }
                f.br(&head);
                f.label(&end);
            }
            Stmt::Switch { scrutinee, arms, .. } => self.emit_switch(f, scrutinee, arms),
            Stmt::Return { value, .. } => {
                match value {
                    Some(e) => {
                        let ty = llvm_type(self.types, e.ty);
                        let (val, _) = self.emit_expr(f, e);
                        f.ret(&ty, Some(val.as_str()));
                    }
                    None => f.ret("void", None),
                }
            }
            Stmt::Break(_) => {
                let target = self.loop_stack.last().expect("parser rejects break outside a loop").break_label.clone();
                f.br(&target);
            }
            Stmt::Continue(_) => {
                let target =
                    self.loop_stack.last().expect("parser rejects continue outside a loop").continue_label.clone();
                f.br(&target);
            }
            Stmt::Goto { label, .. } => {
                let target = self.labels.get(label.as_str()).cloned().unwrap_or_else(|| label.as_str().to_string());
                f.br(&target);
            }
            Stmt::Label { name, .. } => {
                let target = self.labels.get(name.as_str()).cloned().unwrap_or_else(|| name.as_str().to_string());
                f.br(&target);
                f.label(&target);
            }
        }
    }

    fn emit_switch(&mut self, f: &mut FunctionBuilder, scrutinee: &Expr, arms: &[(crate::ast::SwitchCase, Vec<Stmt>)]) {
        let (scrutinee_val, _) = self.emit_expr(f, scrutinee);
        let ty = llvm_type(self.types, scrutinee.ty);
        let end = f.fresh_block("switch.end");
        let arm_labels: Vec<String> = arms.iter().map(|(c, _)| {
            let hint = match c.value {
                Some(v) => format!("case.{}", v),
                None => "default".to_string(),
            };
            f.fresh_block(&hint)
        }).collect();
        let default_label = arms
            .iter()
            .position(|(c, _)| c.value.is_none())
            .map(|i| arm_labels[i].clone())
            .unwrap_or_else(|| end.clone());

        let mut table = String::new();
        for (i, (c, _)) in arms.iter().enumerate() {
            if let Some(v) = c.value {
                table.push_str(&format!("    {} {}, label %{}\n", ty, v, arm_labels[i]));
            }
        }
        f.emit(format!("switch {} {}, label %{} [\n{}  ]", ty, scrutinee_val, default_label, table));

        self.loop_stack.push(LoopLabels { continue_label: end.clone(), break_label: end.clone() });
        for (i, (_, body)) in arms.iter().enumerate() {
            f.label(&arm_labels[i]);
            for st in body {
                self.emit_stmt(f, st);
            }
            // Fall-through: if the arm didn't itself end in a terminator
            // (return/break/goto), flow continues into the next arm,
            // matching C switch semantics.
            let next = arm_labels.get(i + 1).cloned().unwrap_or_else(|| end.clone());
            f.br(&next);
        }
        self.loop_stack.pop();
        f.label(&end);
    }

    /// Emit an expression, returning its LLVM value operand and type.
    fn emit_expr(&mut self, f: &mut FunctionBuilder, e: &Expr) -> (String, String) {
        let ty = llvm_type(self.types, e.ty);
        match &e.kind {
            ExprKind::Literal(lit) => (self.emit_literal(f, lit), ty),
            ExprKind::Ident { mangled, .. } => {
                let t = f.fresh_temp();
                f.load(&t, &ty, &format!("%{}", mangled));
                (t, ty)
            }
            ExprKind::EnumConstant { value, .. } => (value.to_string(), ty),
            ExprKind::Unary { op, operand } => self.emit_unary(f, *op, operand, &ty),
            ExprKind::Binary { op, lhs, rhs } => self.emit_binary(f, *op, lhs, rhs, &ty),
            ExprKind::Call { callee, args } => self.emit_call(f, callee, args, &ty),
            ExprKind::Index { base, index } => {
                let ptr = self.emit_index_address(f, base, index);
                let t = f.fresh_temp();
                f.load(&t, &ty, &ptr);
                (t, ty)
            }
            ExprKind::Member(field) => {
                let ptr = self.emit_member_address(f, field);
                let t = f.fresh_temp();
                f.load(&t, &ty, &ptr);
                (t, ty)
            }
            ExprKind::Conditional { cond, then_branch, else_branch } => {
                self.emit_conditional(f, cond, then_branch, else_branch, &ty)
            }
            ExprKind::ImplicitCast(inner) | ExprKind::ExplicitCast(inner) => {
                self.emit_cast(f, inner, e.ty)
            }
            ExprKind::Sizeof(operand) => {
                // The operand is sized, not evaluated: no code is emitted
                // for an expression operand, only its static type is used.
                let size = match operand {
                    SizeofOperand::Type(target) => approximate_size(self.types, *target),
                    SizeofOperand::Value(inner) => approximate_size(self.types, inner.ty),
                };
                (size.to_string(), ty)
            }
            ExprKind::Assert { cond, .. } => {
                let (cond_val, _) = self.emit_expr(f, cond);
                let fail = f.fresh_block("assert.fail");
                let ok = f.fresh_block("assert.ok");
                f.cond_br(&cond_val, &ok, &fail);
                f.label(&fail);
                self.emit_assert_call(f, cond, e.loc);
                f.unreachable();
                f.label(&ok);
                ("0".to_string(), "void".to_string())
            }
            ExprKind::CompoundLiteral(items) => {
                // A compound literal outside a local's direct initializer
                // still needs somewhere to live: materialize it into a
                // hidden synthetic local, then read its value back out, so
                // the result composes with the rest of `emit_expr`'s
                // by-value contract (assignment, return, call arguments).
                let slot = self.materialize_compound_literal(f, e.ty, items);
                let t = f.fresh_temp();
                f.load(&t, &ty, &slot);
                (t, ty)
            }
            ExprKind::Comma(items) => {
                let mut last = ("0".to_string(), "void".to_string());
                for item in items {
                    last = self.emit_expr(f, item);
                }
                last
            }
        }
    }

    fn emit_literal(&mut self, f: &mut FunctionBuilder, lit: &Literal) -> String {
        match lit {
            Literal::Int(v) => v.to_string(),
            Literal::Float(v) => format!("{:?}", v),
            Literal::Bool(b) => if *b { "1".to_string() } else { "0".to_string() },
            Literal::Char(c) => (*c as i64).to_string(),
            Literal::Null => "null".to_string(),
            Literal::Str(s) => self.emit_string_operand(f, s.as_str()),
        }
    }

    /// Intern `content` as a global string constant and return a pointer
    /// operand to its first byte. Shared by string literals and the
    /// synthesized message/file operands of a failed `assert` call.
    fn emit_string_operand(&mut self, f: &mut FunctionBuilder, content: &str) -> String {
        let global = self.module.get_string_global(content);
        let t = f.fresh_temp();
        let len = content.len() + 1;
        f.emit(format!("{} = getelementptr [{} x i8], ptr {}, i64 0, i64 0", t, len, global));
        t
    }

    fn emit_unary(&mut self, f: &mut FunctionBuilder, op: UnaryOp, operand: &Expr, ty: &str) -> (String, String) {
        match op {
            UnaryOp::Neg => {
                let (v, vty) = self.emit_expr(f, operand);
                let t = f.fresh_temp();
                if is_float_ty(&vty) {
                    f.emit(format!("{} = fneg {} {}", t, vty, v));
                } else {
                    f.binop(&t, "sub", &vty, "0", &v);
                }
                (t, vty)
            }
            UnaryOp::Not => {
                let (v, vty) = self.emit_expr(f, operand);
                let t = f.fresh_temp();
                f.icmp(&t, "eq", &vty, &v, "0");
                (t, "i1".to_string())
            }
            UnaryOp::BitNot => {
                let (v, vty) = self.emit_expr(f, operand);
                let t = f.fresh_temp();
                f.binop(&t, "xor", &vty, &v, "-1");
                (t, vty)
            }
            UnaryOp::Deref => {
                let (ptr, _) = self.emit_expr(f, operand);
                let t = f.fresh_temp();
                f.load(&t, ty, &ptr);
                (t, ty.to_string())
            }
            UnaryOp::AddrOf => {
                let ptr = self.emit_lvalue_address(f, operand);
                (ptr, "ptr".to_string())
            }
            UnaryOp::PreIncr | UnaryOp::PreDecr => {
                let addr = self.emit_lvalue_address(f, operand);
                let opty = llvm_type(self.types, operand.ty);
                let cur = f.fresh_temp();
                f.load(&cur, &opty, &addr);
                let next = f.fresh_temp();
                let instr = if op == UnaryOp::PreIncr { "add" } else { "sub" };
                f.binop(&next, instr, &opty, &cur, "1");
                f.store(&opty, &next, &addr);
                (next, opty)
            }
            UnaryOp::PostIncr | UnaryOp::PostDecr => {
                let addr = self.emit_lvalue_address(f, operand);
                let opty = llvm_type(self.types, operand.ty);
                let cur = f.fresh_temp();
                f.load(&cur, &opty, &addr);
                let next = f.fresh_temp();
                let instr = if op == UnaryOp::PostIncr { "add" } else { "sub" };
                f.binop(&next, instr, &opty, &cur, "1");
                f.store(&opty, &next, &addr);
                (cur, opty)
            }
        }
    }

    fn emit_binary(&mut self, f: &mut FunctionBuilder, op: BinaryOp, lhs: &Expr, rhs: &Expr, ty: &str) -> (String, String) {
        use BinaryOp::*;
        if is_assignment(op) {
            return self.emit_assignment(f, op, lhs, rhs);
        }
        if op == And || op == Or {
            return self.emit_short_circuit(f, op, lhs, rhs);
        }
        let (l, lty) = self.emit_expr(f, lhs);
        let (r, _) = self.emit_expr(f, rhs);
        let t = f.fresh_temp();
        let float = is_float_ty(&lty);
        match op {
            Add => f.binop(&t, if float { "fadd" } else { "add" }, &lty, &l, &r),
            Sub => f.binop(&t, if float { "fsub" } else { "sub" }, &lty, &l, &r),
            Mul => f.binop(&t, if float { "fmul" } else { "mul" }, &lty, &l, &r),
            Div => f.binop(&t, if float { "fdiv" } else { "sdiv" }, &lty, &l, &r),
            Mod => f.binop(&t, if float { "frem" } else { "srem" }, &lty, &l, &r),
            BitAnd => f.binop(&t, "and", &lty, &l, &r),
            BitOr => f.binop(&t, "or", &lty, &l, &r),
            BitXor => f.binop(&t, "xor", &lty, &l, &r),
            Shl => f.binop(&t, "shl", &lty, &l, &r),
            Shr => f.binop(&t, "ashr", &lty, &l, &r),
            Eq => if float { f.fcmp(&t, "oeq", &lty, &l, &r) } else { f.icmp(&t, "eq", &lty, &l, &r) },
            Ne => if float { f.fcmp(&t, "one", &lty, &l, &r) } else { f.icmp(&t, "ne", &lty, &l, &r) },
            Lt => if float { f.fcmp(&t, "olt", &lty, &l, &r) } else { f.icmp(&t, "slt", &lty, &l, &r) },
            Le => if float { f.fcmp(&t, "ole", &lty, &l, &r) } else { f.icmp(&t, "sle", &lty, &l, &r) },
            Gt => if float { f.fcmp(&t, "ogt", &lty, &l, &r) } else { f.icmp(&t, "sgt", &lty, &l, &r) },
            Ge => if float { f.fcmp(&t, "oge", &lty, &l, &r) } else { f.icmp(&t, "sge", &lty, &l, &r) },
            _ => unreachable!("assignment/short-circuit handled above"),
        }
        let result_ty = if matches!(op, Eq | Ne | Lt | Le | Gt | Ge) { "i1".to_string() } else { ty.to_string() };
        (t, result_ty)
    }

    fn emit_short_circuit(&mut self, f: &mut FunctionBuilder, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> (String, String) {
        let (l, _) = self.emit_expr(f, lhs);
        let lhs_pred = f.current_block().to_string();
        let rhs_label = f.fresh_block("sc.rhs");
        let end_label = f.fresh_block("sc.end");
        let short_circuit_val = if op == BinaryOp::And { "0" } else { "1" };
        if op == BinaryOp::And {
            f.cond_br(&l, &rhs_label, &end_label);
        } else {
            f.cond_br(&l, &end_label, &rhs_label);
        }
        f.label(&rhs_label);
        let (r, _) = self.emit_expr(f, rhs);
        let rhs_pred = f.current_block().to_string();
        f.br(&end_label);
        f.label(&end_label);
        let t = f.fresh_temp();
        f.emit(format!(
            "{} = phi i1 [ {}, %{} ], [ {}, %{} ]",
            t, short_circuit_val, lhs_pred, r, rhs_pred
        ));
        (t, "i1".to_string())
    }

    fn emit_assignment(&mut self, f: &mut FunctionBuilder, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> (String, String) {
        let addr = self.emit_lvalue_address(f, lhs);
        let lty = llvm_type(self.types, lhs.ty);
        let (rhs_val, _) = self.emit_expr(f, rhs);
        let new_val = if op == BinaryOp::Assign {
            rhs_val
        } else {
            let cur = f.fresh_temp();
            f.load(&cur, &lty, &addr);
            let t = f.fresh_temp();
            let float = is_float_ty(&lty);
            let instr = match op {
                BinaryOp::AddAssign => if float { "fadd" } else { "add" },
                BinaryOp::SubAssign => if float { "fsub" } else { "sub" },
                BinaryOp::MulAssign => if float { "fmul" } else { "mul" },
                BinaryOp::DivAssign => if float { "fdiv" } else { "sdiv" },
                BinaryOp::ModAssign => if float { "frem" } else { "srem" },
                BinaryOp::AndAssign => "and",
                BinaryOp::OrAssign => "or",
                BinaryOp::XorAssign => "xor",
                BinaryOp::ShlAssign => "shl",
                BinaryOp::ShrAssign => "ashr",
                _ => unreachable!(),
            };
            f.binop(&t, instr, &lty, &cur, &rhs_val);
            t
        };
        f.store(&lty, &new_val, &addr);
        (new_val, lty)
    }

    fn emit_call(&mut self, f: &mut FunctionBuilder, callee: &Expr, args: &[Expr], ty: &str) -> (String, String) {
        let name = match &callee.kind {
            ExprKind::Ident { mangled, .. } => mangled.clone(),
            _ => {
                let (v, _) = self.emit_expr(f, callee);
                v
            }
        };
        let mut arg_vals = Vec::with_capacity(args.len());
        for a in args {
            let (v, vty) = self.emit_expr(f, a);
            arg_vals.push((vty, v));
        }
        let args_ref: Vec<(&str, &str)> = arg_vals.iter().map(|(t, v)| (t.as_str(), v.as_str())).collect();
        if ty == "void" {
            f.call(None, ty, &name, &args_ref);
            ("0".to_string(), "void".to_string())
        } else {
            let t = f.fresh_temp();
            f.call(Some(t.as_str()), ty, &name, &args_ref);
            (t, ty.to_string())
        }
    }

    fn emit_conditional(
        &mut self,
        f: &mut FunctionBuilder,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
        ty: &str,
    ) -> (String, String) {
        let (cond_val, _) = self.emit_expr(f, cond);
        let then_label = f.fresh_block("cond.then");
        let else_label = f.fresh_block("cond.else");
        let end_label = f.fresh_block("cond.end");
        f.cond_br(&cond_val, &then_label, &else_label);
        f.label(&then_label);
        let (then_val, _) = self.emit_expr(f, then_branch);
        let then_pred = f.current_block().to_string();
        f.br(&end_label);
        f.label(&else_label);
        let (else_val, _) = self.emit_expr(f, else_branch);
        let else_pred = f.current_block().to_string();
        f.br(&end_label);
        f.label(&end_label);
        let t = f.fresh_temp();
        f.emit(format!(
            "{} = phi {} [ {}, %{} ], [ {}, %{} ]",
            t, ty, then_val, then_pred, else_val, else_pred
        ));
        (t, ty.to_string())
    }

    fn emit_cast(&mut self, f: &mut FunctionBuilder, inner: &Expr, target: TypeId) -> (String, String) {
        let (v, from_ty) = self.emit_expr(f, inner);
        let to_ty = llvm_type(self.types, target);
        if from_ty == to_ty {
            return (v, to_ty);
        }
        let from_kind = self.types.kind(self.types.resolve_alias(inner.ty));
        let to_kind = self.types.kind(self.types.resolve_alias(target));
        let t = f.fresh_temp();
        let op = match (&from_kind, &to_kind) {
            (Kind::Int { width: fw, signed: fs }, Kind::Int { width: tw, .. }) => {
                if tw > fw {
                    if *fs { "sext" } else { "zext" }
                } else if tw < fw {
                    "trunc"
                } else {
                    "bitcast"
                }
            }
            (Kind::Float { double: false }, Kind::Float { double: true }) => "fpext",
            (Kind::Float { double: true }, Kind::Float { double: false }) => "fptrunc",
            (Kind::Int { signed: true, .. }, Kind::Float { .. }) => "sitofp",
            (Kind::Int { signed: false, .. }, Kind::Float { .. }) => "uitofp",
            (Kind::Float { .. }, Kind::Int { signed: true, .. }) => "fptosi",
            (Kind::Float { .. }, Kind::Int { signed: false, .. }) => "fptoui",
            (Kind::Pointer { .. }, Kind::Int { .. }) => "ptrtoint",
            (Kind::Int { .. }, Kind::Pointer { .. }) => "inttoptr",
            _ => "bitcast",
        };
        f.cast(&t, op, &from_ty, &v, &to_ty);
        (t, to_ty)
    }

    /// Address-of for an expression known to `has_address()`. Used by
    /// assignment, `&`, and pre/post inc/dec.
    fn emit_lvalue_address(&mut self, f: &mut FunctionBuilder, e: &Expr) -> String {
        match &e.kind {
            ExprKind::Ident { mangled, .. } => format!("%{}", mangled),
            ExprKind::Unary { op: UnaryOp::Deref, operand } => self.emit_expr(f, operand).0,
            ExprKind::Index { base, index } => self.emit_index_address(f, base, index),
            ExprKind::Member(field) => self.emit_member_address(f, field),
            ExprKind::ImplicitCast(inner) | ExprKind::ExplicitCast(inner) => self.emit_lvalue_address(f, inner),
            ExprKind::CompoundLiteral(items) => self.materialize_compound_literal(f, e.ty, items),
            _ => unreachable!("parser only allows has_address() expressions here"),
        }
    }

    /// Allocate a hidden synthetic local (`.compoundN`), zero-fill and
    /// overwrite it per `emit_compound_literal_into`, and return its
    /// address. Used whenever a `{ ... }` literal appears somewhere other
    /// than a local's own direct initializer.
    fn materialize_compound_literal(&mut self, f: &mut FunctionBuilder, declared: TypeId, items: &[Expr]) -> String {
        let n = self.next_compound_local;
        self.next_compound_local += 1;
        let slot = format!("%.compound{}", n);
        let llvm_ty = llvm_type(self.types, declared);
        f.alloca(&slot, &llvm_ty);
        self.emit_compound_literal_into(f, &slot, declared, items);
        slot
    }

    /// Lower a failed `assert`'s condition to the extern call its
    /// expansion is defined in terms of: `__assert(stringify(cond), file,
    /// line)`. The callee's return value is unconditionally discarded —
    /// the control-flow effect of a failed assertion is the `unreachable`
    /// the caller emits right after this call, not anything `__assert`
    /// returns.
    fn emit_assert_call(&mut self, f: &mut FunctionBuilder, cond: &Expr, loc: Location) {
        if !self.assert_declared {
            self.module.declare_function(ASSERT_SIGNATURE);
            self.assert_declared = true;
        }
        let msg = self.emit_string_operand(f, &cond.flat_print());
        let file = self.emit_string_operand(f, loc.file.as_str());
        let line = loc.start.line.to_string();
        f.call(
            None,
            "i1",
            "__assert",
            &[("ptr", msg.as_str()), ("ptr", file.as_str()), ("i32", line.as_str())],
        );
    }

    fn emit_index_address(&mut self, f: &mut FunctionBuilder, base: &Expr, index: &Expr) -> String {
        let elem_ty = match self.types.kind(self.types.resolve_alias(base.ty)) {
            Kind::Array { of, .. } => of,
            Kind::Pointer { to } => to,
            _ => unreachable!("parser rejects indexing non-array, non-pointer values"),
        };
        let llvm_elem = llvm_type(self.types, elem_ty);
        let base_ptr = if matches!(self.types.kind(self.types.resolve_alias(base.ty)), Kind::Array { .. }) {
            self.emit_lvalue_address(f, base)
        } else {
            self.emit_expr(f, base).0
        };
        let (index_val, index_ty) = self.emit_expr(f, index);
        let t = f.fresh_temp();
        f.gep(&t, &llvm_elem, &base_ptr, &[(index_ty.as_str(), index_val.as_str())]);
        t
    }

    fn emit_member_address(&mut self, f: &mut FunctionBuilder, field: &crate::expr::Field) -> String {
        let base_struct_ty = if field.arrow {
            match self.types.kind(self.types.resolve_alias(field.base.ty)) {
                Kind::Pointer { to } => to,
                _ => unreachable!("parser requires a pointer for '->'"),
            }
        } else {
            field.base.ty
        };
        let index = self
            .types
            .member_index(base_struct_ty, field.name.clone())
            .expect("parser already validated this member name");
        let base_ptr = if field.arrow {
            self.emit_expr(f, &field.base).0
        } else {
            self.emit_lvalue_address(f, &field.base)
        };
        let struct_llvm_ty = llvm_type(self.types, base_struct_ty);
        let index_str = index.to_string();
        let t = f.fresh_temp();
        f.gep(&t, &struct_llvm_ty, &base_ptr, &[("i32", "0"), ("i32", index_str.as_str())]);
        t
    }

    /// Zero the whole aggregate first, then overwrite each specified leading
    /// member/element with its given value. Members past the last specified
    /// item are left at the zero the initial store already gave them.
    fn emit_compound_literal_into(
        &mut self,
        f: &mut FunctionBuilder,
        slot: &str,
        declared: TypeId,
        items: &[Expr],
    ) {
        let llvm_ty = llvm_type(self.types, declared);
        f.store(&llvm_ty, "zeroinitializer", slot);
        match self.types.kind(self.types.resolve_alias(declared)) {
            Kind::Struct { .. } => {
                for (i, item) in items.iter().enumerate() {
                    let member_ty = self
                        .types
                        .aggregate_type(declared, i)
                        .expect("parser already validated the item count");
                    let member_llvm_ty = llvm_type(self.types, member_ty);
                    let (val, _) = self.emit_expr(f, item);
                    let addr = f.fresh_temp();
                    let idx = i.to_string();
                    f.gep(&addr, &llvm_ty, slot, &[("i32", "0"), ("i32", &idx)]);
                    f.store(&member_llvm_ty, &val, &addr);
                }
            }
            Kind::Array { of, .. } => {
                let elem_llvm_ty = llvm_type(self.types, of);
                for (i, item) in items.iter().enumerate() {
                    let (val, _) = self.emit_expr(f, item);
                    let addr = f.fresh_temp();
                    let idx = i.to_string();
                    f.gep(&addr, &elem_llvm_ty, slot, &[("i32", &idx)]);
                    f.store(&elem_llvm_ty, &val, &addr);
                }
            }
            _ => unreachable!("parser rejects compound literals against non-aggregate declared types"),
        }
    }
}

fn is_assignment(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Assign
            | BinaryOp::AddAssign
            | BinaryOp::SubAssign
            | BinaryOp::MulAssign
            | BinaryOp::DivAssign
            | BinaryOp::ModAssign
            | BinaryOp::AndAssign
            | BinaryOp::OrAssign
            | BinaryOp::XorAssign
            | BinaryOp::ShlAssign
            | BinaryOp::ShrAssign
    )
}

fn is_float_ty(llvm_ty: &str) -> bool {
    llvm_ty == "float" || llvm_ty == "double"
}

/// Best-effort `sizeof` in bytes; good enough for diagnostics and for
/// `malloc`-style call sites, not a promise of target-exact layout.
fn approximate_size(types: &TypeRegistry, t: TypeId) -> u64 {
    match types.kind(types.resolve_alias(t)) {
        Kind::Void => 0,
        Kind::Int { width, .. } => (width as u64).div_ceil(8),
        Kind::Float { double } => if double { 8 } else { 4 },
        Kind::Pointer { .. } | Kind::Nullptr | Kind::Auto => 8,
        Kind::Array { of, len: Some(n) } => approximate_size(types, of) * n,
        Kind::Array { len: None, .. } => 8,
        Kind::Function { .. } => 8,
        Kind::Struct { .. } => {
            let count = types.aggregate_size(t).unwrap_or(0);
            (0..count).map(|i| approximate_size(types, types.aggregate_type(t, i).unwrap())).sum()
        }
        Kind::Enum { underlying, .. } => approximate_size(types, underlying),
        Kind::Alias { to, .. } => approximate_size(types, to),
    }
}
