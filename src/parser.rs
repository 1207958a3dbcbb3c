//! Recursive-descent parser with on-the-fly semantic resolution.
//!
//! Declarations are entered into the [`SymbolTable`] and [`TypeRegistry`]
//! as they are parsed rather than in a later pass: by the time the parser
//! reaches the body of a function, every earlier top-level declaration is
//! already resolvable, and a local's initializer is type-checked against
//! its declared type the moment both are in hand. Types and symbols are
//! resolved while walking the token stream, rather than building an
//! untyped tree first and resolving it afterward.

use crate::ast::{
    Block, EnumDecl, FnDecl, FnDef, GlobalVar, Param, Program, Stmt, StructDecl, SwitchCase,
    TopLevel, TypeAlias,
};
use crate::diagnostics::Diagnostics;
use crate::expr::{BinaryOp, Expr, ExprKind, Literal, SizeofOperand, UnaryOp};
use crate::lexer::Lexer;
use crate::location::Location;
use crate::strings::{Interner, Sym};
use crate::symtab::{EntryKind, Lookup, SymbolTable};
use crate::token::{Token, TokenKind};
use crate::types::{Kind, StructMember, TypeId, TypeRegistry};
use std::collections::VecDeque;
use std::rc::Rc;

pub struct Parser {
    lexer: Lexer,
    diags: Rc<Diagnostics>,
    interner: Rc<Interner>,
    pub types: TypeRegistry,
    pub symtab: SymbolTable,
    lookahead: VecDeque<Token>,
    current_fn_ret: Option<TypeId>,
    loop_depth: u32,
    switch_depth: u32,
}

impl Parser {
    pub fn new(lexer: Lexer, interner: Rc<Interner>, diags: Rc<Diagnostics>) -> Self {
        let mut p = Parser {
            lexer,
            diags,
            interner,
            types: TypeRegistry::new(),
            symtab: SymbolTable::new(),
            lookahead: VecDeque::new(),
            current_fn_ret: None,
            loop_depth: 0,
            switch_depth: 0,
        };
        p.register_builtin_types();
        p
    }

    fn register_builtin_types(&mut self) {
        let pairs: Vec<(&str, TypeId)> = vec![
            ("void", self.types.void()),
            ("bool", self.types.bool_type()),
            ("char", self.types.char_type()),
            ("i8", self.types.int(8, true)),
            ("u8", self.types.int(8, false)),
            ("i16", self.types.int(16, true)),
            ("u16", self.types.int(16, false)),
            ("i32", self.types.i32()),
            ("u32", self.types.int(32, false)),
            ("i64", self.types.i64()),
            ("u64", self.types.int(64, false)),
            ("f32", self.types.float()),
            ("f64", self.types.double()),
            ("auto", self.types.auto()),
        ];
        for (name, ty) in pairs {
            let sym = self.interner.intern(name);
            let _ = self.symtab.declare(sym, ty, EntryKind::Type, |_, _, _| true);
        }
    }

    // ---- token plumbing -------------------------------------------------

    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            let t = self.lexer.next_token();
            self.lookahead.push_back(t);
        }
    }

    fn peek(&mut self) -> &Token {
        self.fill(0);
        &self.lookahead[0]
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.peek().kind
    }

    fn peek2_kind(&mut self) -> TokenKind {
        self.fill(1);
        self.lookahead[1].kind
    }

    fn bump(&mut self) -> Token {
        self.fill(0);
        self.lookahead.pop_front().unwrap()
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Token {
        if self.check(kind) {
            self.bump()
        } else {
            let tok = self.peek().clone();
            self.diags.fatal(tok.loc, format!("expected {}, found '{}'", what, tok.text()));
        }
    }

    fn loc_since(&mut self, start: Location) -> Location {
        let end = self.peek().loc;
        Location::new(start.file, start.start, end.start)
    }

    // ---- top level --------------------------------------------------

    pub fn parse_program(&mut self) -> Program {
        let mut items = Vec::new();
        while !self.check(TokenKind::Eof) {
            items.push(self.parse_top_level_item());
        }
        Program { items }
    }

    /// Every file actually opened for this compilation unit (root plus
    /// every `@include` that wasn't skipped as already-included), for the
    /// dependency-file writer.
    pub fn opened_files(&self) -> &[std::path::PathBuf] {
        self.lexer.reader().opened_files()
    }

    fn parse_top_level_item(&mut self) -> TopLevel {
        match self.peek_kind() {
            TokenKind::KwStruct => self.parse_struct_decl(),
            TokenKind::KwEnum => self.parse_enum_decl(),
            TokenKind::KwType => self.parse_type_alias(),
            TokenKind::KwExtern => self.parse_extern_item(),
            TokenKind::KwGlobal | TokenKind::KwStatic => self.parse_global_var(),
            TokenKind::KwFn => self.parse_fn(),
            _ => {
                let tok = self.peek().clone();
                self.diags.fatal(tok.loc, format!("expected a top-level declaration, found '{}'", tok.text()));
            }
        }
    }

    fn parse_struct_decl(&mut self) -> TopLevel {
        let start = self.peek().loc;
        self.bump();
        let name_tok = self.expect(TokenKind::Ident, "a struct name");
        let name = name_tok.cooked.clone();

        let existing = self.symtab.find(name.as_str(), Lookup::Any).map(|e| e.ty);
        let struct_ty = existing.unwrap_or_else(|| self.types.struct_incomplete(name.clone()));
        if existing.is_none() {
            let _ = self.symtab.declare(name.clone(), struct_ty, EntryKind::Type, |_, _, _| true);
        }

        if self.eat(TokenKind::Semicolon) {
            return TopLevel::Struct(StructDecl { name, loc: self.loc_since(start) });
        }

        self.expect(TokenKind::LBrace, "'{' to begin struct body");
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let member_name = self.expect(TokenKind::Ident, "a member name").cooked;
            self.expect(TokenKind::Colon, "':' after member name");
            let member_ty = self.parse_type();
            self.expect(TokenKind::Semicolon, "';' after struct member");
            members.push(StructMember { name: member_name, ty: member_ty });
        }
        self.expect(TokenKind::RBrace, "'}' to close struct body");
        self.eat(TokenKind::Semicolon);

        let id = match self.types.kind(struct_ty) {
            Kind::Struct { id, .. } => id,
            _ => unreachable!("struct_ty always denotes a struct"),
        };
        if let Err(msg) = self.types.complete_struct(id, members) {
            self.diags.fatal(self.loc_since(start), msg);
        }
        TopLevel::Struct(StructDecl { name, loc: self.loc_since(start) })
    }

    fn parse_enum_decl(&mut self) -> TopLevel {
        let start = self.peek().loc;
        self.bump();
        let name_tok = self.expect(TokenKind::Ident, "an enum name");
        let name = name_tok.cooked.clone();

        let underlying = self.types.i32();
        let existing = self.symtab.find(name.as_str(), Lookup::Any).map(|e| e.ty);
        let enum_ty = existing.unwrap_or_else(|| self.types.enum_incomplete(name.clone(), underlying));
        if existing.is_none() {
            let _ = self.symtab.declare(name.clone(), enum_ty, EntryKind::Type, |_, _, _| true);
        }

        if self.eat(TokenKind::Semicolon) {
            return TopLevel::Enum(EnumDecl { name, loc: self.loc_since(start) });
        }

        self.expect(TokenKind::LBrace, "'{' to begin enum body");
        let mut variants = Vec::new();
        let mut next_value: i64 = 0;
        while !self.check(TokenKind::RBrace) {
            let variant_name = self.expect(TokenKind::Ident, "a variant name").cooked;
            let value = if self.eat(TokenKind::Eq) {
                let e = self.parse_assignment_expr();
                e.load_constant().unwrap_or_else(|| {
                    self.diags.fatal(e.loc, "enum variant value must be a constant expression")
                })
            } else {
                next_value
            };
            next_value = value + 1;
            let _ = self.symtab.declare(
                variant_name.clone(),
                enum_ty,
                EntryKind::Constant(value),
                |_, _, _| true,
            );
            variants.push((variant_name, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' to close enum body");
        self.eat(TokenKind::Semicolon);

        let id = match self.types.kind(enum_ty) {
            Kind::Enum { id, .. } => id,
            _ => unreachable!("enum_ty always denotes an enum"),
        };
        if let Err(msg) = self.types.complete_enum(id, variants) {
            self.diags.fatal(self.loc_since(start), msg);
        }
        TopLevel::Enum(EnumDecl { name, loc: self.loc_since(start) })
    }

    fn parse_type_alias(&mut self) -> TopLevel {
        let start = self.peek().loc;
        self.bump();
        let name = self.expect(TokenKind::Ident, "an alias name").cooked;
        self.expect(TokenKind::Eq, "'=' in type alias");
        let target = self.parse_type();
        self.expect(TokenKind::Semicolon, "';' after type alias");
        let aliased = self.types.alias(name.clone(), target);
        let _ = self.symtab.declare(name.clone(), aliased, EntryKind::Type, |_, _, _| true);
        TopLevel::Alias(TypeAlias { name, aliased, loc: self.loc_since(start) })
    }

    fn parse_extern_item(&mut self) -> TopLevel {
        self.bump(); // 'extern'
        if self.check(TokenKind::KwFn) {
            let decl = self.parse_fn_decl(true);
            self.expect(TokenKind::Semicolon, "';' after extern function declaration");
            TopLevel::FnDecl(decl)
        } else {
            self.parse_var_decl_tail(true, false)
        }
    }

    fn parse_global_var(&mut self) -> TopLevel {
        let is_static = self.check(TokenKind::KwStatic);
        self.bump(); // 'global' or 'static'
        self.parse_var_decl_tail(false, is_static)
    }

    fn parse_var_decl_tail(&mut self, is_extern: bool, is_static: bool) -> TopLevel {
        let start = self.peek().loc;
        let name = self.expect(TokenKind::Ident, "a variable name").cooked;
        self.expect(TokenKind::Colon, "':' after variable name");
        let ty = self.parse_type();
        let init = if self.eat(TokenKind::Eq) {
            let e = self.parse_assignment_expr();
            if !e.has_constant_address() && !e.is_const() {
                self.diags.fatal(e.loc, "global initializer must be a constant expression");
            }
            Some(e)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';' after variable declaration");
        let mangled = name.as_str().to_string();
        let _ = self.symtab.declare(name.clone(), ty, EntryKind::Variable, |_, _, _| true);
        TopLevel::Global(GlobalVar {
            name,
            mangled,
            ty,
            init,
            is_extern,
            is_static,
            loc: self.loc_since(start),
        })
    }

    fn parse_fn(&mut self) -> TopLevel {
        let decl = self.parse_fn_decl(false);
        if self.eat(TokenKind::Semicolon) {
            return TopLevel::FnDecl(decl);
        }
        self.current_fn_ret = Some(decl.ret);
        self.symtab.push_scope("f");
        for p in &decl.params {
            let _ = self.symtab.declare(p.name.clone(), p.ty, EntryKind::Variable, |_, _, _| true);
        }
        let body = self.parse_block();
        self.symtab.pop_scope();
        self.current_fn_ret = None;
        TopLevel::FnDef(FnDef { decl, body })
    }

    fn parse_fn_decl(&mut self, is_extern: bool) -> FnDecl {
        let start = self.peek().loc;
        self.expect(TokenKind::KwFn, "'fn'");
        let name = self.expect(TokenKind::Ident, "a function name").cooked;
        self.expect(TokenKind::LParen, "'(' after function name");
        let mut params = Vec::new();
        let mut varargs = false;
        if !self.check(TokenKind::RParen) {
            loop {
                if self.check(TokenKind::Ellipsis) {
                    self.bump();
                    varargs = true;
                    break;
                }
                let pname = self.expect(TokenKind::Ident, "a parameter name").cooked;
                self.expect(TokenKind::Colon, "':' after parameter name");
                let pty = self.parse_type();
                params.push(Param { name: pname, ty: pty });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' to close parameter list");
        let ret = if self.eat(TokenKind::Arrow) {
            self.parse_type()
        } else {
            self.types.void()
        };
        let loc = self.loc_since(start);
        let mangled = name.as_str().to_string();
        let param_tys: Vec<TypeId> = params.iter().map(|p| p.ty).collect();
        let fn_ty = self.types.function(ret, param_tys, varargs);
        let _ = self.symtab.declare(name.clone(), fn_ty, EntryKind::Function, |_, _, _| true);
        let _ = is_extern;
        FnDecl { name, mangled, params, varargs, ret, loc }
    }

    // ---- types ------------------------------------------------------

    pub fn parse_type(&mut self) -> TypeId {
        let is_const = self.eat(TokenKind::KwConst) || self.eat(TokenKind::KwReadonly);

        let base = if self.eat(TokenKind::Arrow) {
            let inner = self.parse_type();
            self.types.pointer(inner)
        } else if self.check(TokenKind::KwArray) {
            self.bump();
            let len = if self.eat(TokenKind::LBracket) {
                let e = self.parse_assignment_expr();
                let n = e
                    .load_constant()
                    .unwrap_or_else(|| self.diags.fatal(e.loc, "array length must be a constant expression"));
                self.expect(TokenKind::RBracket, "']' after array length");
                Some(n as u64)
            } else {
                None
            };
            self.expect(TokenKind::KwOf, "'of' in array type");
            let elem = self.parse_type();
            self.types.array(elem, len)
        } else if self.check(TokenKind::KwStruct) || self.check(TokenKind::KwEnum) {
            self.bump();
            let name_tok = self.expect(TokenKind::Ident, "a type name");
            self.lookup_type_or_fatal(&name_tok)
        } else {
            let tok = self.expect(TokenKind::Ident, "a type name");
            self.lookup_type_or_fatal(&tok)
        };

        if is_const {
            self.types.get_const(base)
        } else {
            base
        }
    }

    fn lookup_type_or_fatal(&mut self, tok: &Token) -> TypeId {
        match self.symtab.find(tok.text(), Lookup::Any) {
            Some(e) if e.kind == EntryKind::Type => e.ty,
            _ => self.diags.fatal(tok.loc, format!("'{}' does not name a type", tok.text())),
        }
    }

    // ---- statements ---------------------------------------------------

    fn parse_block(&mut self) -> Block {
        self.expect(TokenKind::LBrace, "'{' to begin a block");
        self.symtab.push_scope("b");
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            stmts.push(self.parse_stmt());
        }
        self.expect(TokenKind::RBrace, "'}' to close a block");
        self.symtab.pop_scope();
        Block { stmts }
    }

    fn parse_stmt(&mut self) -> Stmt {
        match self.peek_kind() {
            TokenKind::LBrace => Stmt::Block(self.parse_block()),
            TokenKind::KwLocal => self.parse_local(),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwDo => self.parse_do_while(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwSwitch => self.parse_switch(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwBreak => {
                let loc = self.bump().loc;
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.diags.fatal(loc, "'break' outside a loop or switch");
                }
                self.expect(TokenKind::Semicolon, "';' after 'break'");
                Stmt::Break(loc)
            }
            TokenKind::KwContinue => {
                let loc = self.bump().loc;
                if self.loop_depth == 0 {
                    self.diags.fatal(loc, "'continue' outside a loop");
                }
                self.expect(TokenKind::Semicolon, "';' after 'continue'");
                Stmt::Continue(loc)
            }
            TokenKind::KwGoto => {
                let loc = self.bump().loc;
                let label = self.expect(TokenKind::Ident, "a label name").cooked;
                self.expect(TokenKind::Semicolon, "';' after 'goto'");
                Stmt::Goto { label, loc }
            }
            TokenKind::KwLabel => {
                let loc = self.bump().loc;
                let name = self.expect(TokenKind::Ident, "a label name").cooked;
                self.expect(TokenKind::Colon, "':' after label name");
                Stmt::Label { name, loc }
            }
            TokenKind::Ident if self.peek2_kind() == TokenKind::Colon => {
                let loc = self.peek().loc;
                let name = self.bump().cooked;
                self.bump(); // ':'
                Stmt::Label { name, loc }
            }
            _ => {
                let e = self.parse_expr();
                self.expect(TokenKind::Semicolon, "';' after expression statement");
                Stmt::Expr(e)
            }
        }
    }

    fn parse_local(&mut self) -> Stmt {
        let start = self.peek().loc;
        self.bump();
        let name = self.expect(TokenKind::Ident, "a local variable name").cooked;
        self.expect(TokenKind::Colon, "':' after local variable name");
        let declared = self.parse_type();
        let (ty, init) = if self.eat(TokenKind::Eq) {
            let mut e = self.parse_assignment_expr();
            let final_ty = if self.types.is_auto(declared) {
                e.ty
            } else {
                self.resolve_compound_literal(&mut e, declared);
                if self.types.convert(e.ty, declared).is_some() {
                    declared
                } else {
                    self.diags.fatal(
                        e.loc,
                        format!(
                            "cannot initialize '{}' from a value of type '{}'",
                            self.types.display_name(declared),
                            self.types.display_name(e.ty)
                        ),
                    );
                }
            };
            (final_ty, Some(e))
        } else {
            (declared, None)
        };
        self.expect(TokenKind::Semicolon, "';' after local variable declaration");
        let entry = self
            .symtab
            .declare(name.clone(), ty, EntryKind::Variable, |_, _, _| true)
            .unwrap_or_else(|e| e);
        let mangled = entry.mangled.clone();
        Stmt::Local(crate::ast::LocalVar { name, mangled, ty, init, loc: self.loc_since(start) })
    }

    /// Match a `{ ... }` compound literal's items against `declared`
    /// member-by-member (struct) or element-by-element (array), fatal on a
    /// count or type mismatch. Items left unspecified at the tail are the
    /// codegen side's job to zero-fill.
    fn check_compound_literal(&mut self, loc: Location, items: &[Expr], declared: TypeId) {
        match self.types.kind(self.types.resolve_alias(declared)) {
            Kind::Struct { complete: true, .. } => {
                let capacity = self.types.aggregate_size(declared).unwrap_or(0);
                if items.len() > capacity {
                    self.diags.fatal(
                        loc,
                        format!("too many initializers for '{}'", self.types.display_name(declared)),
                    );
                }
                for (i, item) in items.iter().enumerate() {
                    let member_ty = self.types.aggregate_type(declared, i).expect("count checked above");
                    if self.types.convert(item.ty, member_ty).is_none() {
                        self.diags.fatal(
                            item.loc,
                            format!(
                                "cannot initialize member {} of '{}' from a value of type '{}'",
                                i,
                                self.types.display_name(declared),
                                self.types.display_name(item.ty)
                            ),
                        );
                    }
                }
            }
            Kind::Array { of, len } => {
                let capacity = len.unwrap_or(items.len() as u64);
                if items.len() as u64 > capacity {
                    self.diags.fatal(
                        loc,
                        format!("too many initializers for '{}'", self.types.display_name(declared)),
                    );
                }
                for item in items {
                    if self.types.convert(item.ty, of).is_none() {
                        self.diags.fatal(
                            item.loc,
                            format!(
                                "cannot initialize array element of type '{}' from a value of type '{}'",
                                self.types.display_name(of),
                                self.types.display_name(item.ty)
                            ),
                        );
                    }
                }
            }
            _ => {
                self.diags.fatal(
                    loc,
                    format!(
                        "compound literal cannot initialize non-aggregate type '{}'",
                        self.types.display_name(declared)
                    ),
                );
            }
        }
    }

    fn parse_if(&mut self) -> Stmt {
        self.bump();
        self.expect(TokenKind::LParen, "'(' after 'if'");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "')' after if-condition");
        let then_branch = Box::new(self.parse_stmt());
        let else_branch = if self.eat(TokenKind::KwElse) {
            Some(Box::new(self.parse_stmt()))
        } else {
            None
        };
        Stmt::If { cond, then_branch, else_branch }
    }

    fn parse_while(&mut self) -> Stmt {
        self.bump();
        self.expect(TokenKind::LParen, "'(' after 'while'");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "')' after while-condition");
        self.loop_depth += 1;
        let body = Box::new(self.parse_stmt());
        self.loop_depth -= 1;
        Stmt::While { cond, body }
    }

    fn parse_do_while(&mut self) -> Stmt {
        self.bump();
        self.loop_depth += 1;
        let body = Box::new(self.parse_stmt());
        self.loop_depth -= 1;
        self.expect(TokenKind::KwWhile, "'while' after 'do' body");
        self.expect(TokenKind::LParen, "'(' after 'while'");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "')' after do-while condition");
        self.expect(TokenKind::Semicolon, "';' after do-while statement");
        Stmt::DoWhile { body, cond }
    }

    fn parse_for(&mut self) -> Stmt {
        self.bump();
        self.expect(TokenKind::LParen, "'(' after 'for'");
        self.symtab.push_scope("b");
        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if self.check(TokenKind::KwLocal) {
            Some(Box::new(self.parse_local()))
        } else {
            let e = self.parse_expr();
            self.expect(TokenKind::Semicolon, "';' after for-init");
            Some(Box::new(Stmt::Expr(e)))
        };
        if init.is_none() {
            self.bump(); // consume the empty-init ';'
        }
        let cond = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()) };
        self.expect(TokenKind::Semicolon, "';' after for-condition");
        let step = if self.check(TokenKind::RParen) { None } else { Some(self.parse_expr()) };
        self.expect(TokenKind::RParen, "')' after for-clauses");
        self.loop_depth += 1;
        let body = Box::new(self.parse_stmt());
        self.loop_depth -= 1;
        self.symtab.pop_scope();
        Stmt::For { init, cond, step, body }
    }

    fn parse_switch(&mut self) -> Stmt {
        let start = self.peek().loc;
        self.bump();
        self.expect(TokenKind::LParen, "'(' after 'switch'");
        let scrutinee = self.parse_expr();
        self.expect(TokenKind::RParen, "')' after switch scrutinee");
        self.expect(TokenKind::LBrace, "'{' to begin switch body");
        self.switch_depth += 1;
        let mut arms = Vec::new();
        let mut seen_values: Vec<i64> = Vec::new();
        let mut seen_default = false;
        while !self.check(TokenKind::RBrace) {
            let arm_loc = self.peek().loc;
            let value = if self.eat(TokenKind::KwCase) {
                let e = self.parse_assignment_expr();
                let v = e
                    .load_constant()
                    .unwrap_or_else(|| self.diags.fatal(e.loc, "case label must be a constant expression"));
                if seen_values.contains(&v) {
                    self.diags.fatal(arm_loc, format!("duplicate case value {}", v));
                }
                seen_values.push(v);
                self.expect(TokenKind::Colon, "':' after case label");
                Some(v)
            } else {
                self.expect(TokenKind::KwDefault, "'case' or 'default'");
                if seen_default {
                    self.diags.fatal(arm_loc, "duplicate 'default' label");
                }
                seen_default = true;
                self.expect(TokenKind::Colon, "':' after 'default'");
                None
            };
            let mut body = Vec::new();
            while !matches!(self.peek_kind(), TokenKind::KwCase | TokenKind::KwDefault | TokenKind::RBrace) {
                body.push(self.parse_stmt());
            }
            arms.push((SwitchCase { value, loc: arm_loc }, body));
        }
        self.expect(TokenKind::RBrace, "'}' to close switch body");
        self.switch_depth -= 1;
        Stmt::Switch { scrutinee, arms, loc: self.loc_since(start) }
    }

    /// If `e` is a bare `{ ... }` compound literal (still typed `auto`),
    /// validate and coerce it against `target` in place. A no-op for every
    /// other expression kind, leaving the caller's own `convert`-based
    /// check to judge the ordinary case.
    fn resolve_compound_literal(&mut self, e: &mut Expr, target: TypeId) {
        if let ExprKind::CompoundLiteral(items) = &e.kind {
            self.check_compound_literal(e.loc, items, target);
            e.ty = target;
        }
    }

    fn parse_return(&mut self) -> Stmt {
        let loc = self.bump().loc;
        let ret_ty = self.current_fn_ret.unwrap_or_else(|| self.types.void());
        let value = if self.check(TokenKind::Semicolon) {
            if !self.types.is_void(ret_ty) {
                self.diags.fatal(loc, "missing return value in a non-void function");
            }
            None
        } else {
            let mut e = self.parse_expr();
            self.resolve_compound_literal(&mut e, ret_ty);
            if self.types.convert(e.ty, ret_ty).is_none() {
                self.diags.fatal(
                    e.loc,
                    format!(
                        "cannot return a value of type '{}' from a function returning '{}'",
                        self.types.display_name(e.ty),
                        self.types.display_name(ret_ty)
                    ),
                );
            }
            Some(e)
        };
        self.expect(TokenKind::Semicolon, "';' after 'return'");
        Stmt::Return { value, loc }
    }

    // ---- expressions (precedence climbing) -------------------------------

    pub fn parse_expr(&mut self) -> Expr {
        let first = self.parse_assignment_expr();
        if self.check(TokenKind::Comma) {
            let mut items = vec![first];
            while self.eat(TokenKind::Comma) {
                items.push(self.parse_assignment_expr());
            }
            let ty = items.last().unwrap().ty;
            let loc = items[0].loc;
            Expr::new(ty, loc, ExprKind::Comma(items))
        } else {
            first
        }
    }

    fn parse_assignment_expr(&mut self) -> Expr {
        let lhs = self.parse_conditional_expr();
        let op = match self.peek_kind() {
            TokenKind::Eq => Some(BinaryOp::Assign),
            TokenKind::PlusEq => Some(BinaryOp::AddAssign),
            TokenKind::MinusEq => Some(BinaryOp::SubAssign),
            TokenKind::StarEq => Some(BinaryOp::MulAssign),
            TokenKind::SlashEq => Some(BinaryOp::DivAssign),
            TokenKind::PercentEq => Some(BinaryOp::ModAssign),
            TokenKind::AmpEq => Some(BinaryOp::AndAssign),
            TokenKind::PipeEq => Some(BinaryOp::OrAssign),
            TokenKind::CaretEq => Some(BinaryOp::XorAssign),
            TokenKind::ShlEq => Some(BinaryOp::ShlAssign),
            TokenKind::ShrEq => Some(BinaryOp::ShrAssign),
            _ => None,
        };
        let Some(op) = op else { return lhs };
        let loc = self.bump().loc;
        if !lhs.is_lvalue() {
            self.diags.fatal(loc, "left-hand side of assignment is not assignable");
        }
        if self.types.is_const(lhs.ty) {
            self.diags.fatal(loc, "cannot assign to a const-qualified location");
        }
        let mut rhs = self.parse_assignment_expr();
        self.resolve_compound_literal(&mut rhs, lhs.ty);
        if self.types.convert(rhs.ty, lhs.ty).is_none() {
            self.diags.fatal(
                rhs.loc,
                format!(
                    "cannot assign a value of type '{}' to a location of type '{}'",
                    self.types.display_name(rhs.ty),
                    self.types.display_name(lhs.ty)
                ),
            );
        }
        let ty = lhs.ty;
        Expr::new(ty, loc, ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn parse_conditional_expr(&mut self) -> Expr {
        let cond = self.parse_binary_expr(1);
        if !self.eat(TokenKind::Question) {
            return cond;
        }
        let then_branch = self.parse_assignment_expr();
        self.expect(TokenKind::Colon, "':' in conditional expression");
        let else_branch = self.parse_assignment_expr();
        let ty = self.types.common(then_branch.ty, else_branch.ty).unwrap_or_else(|| {
            self.diags.fatal(
                cond.loc,
                format!(
                    "incompatible branch types '{}' and '{}' in conditional expression",
                    self.types.display_name(then_branch.ty),
                    self.types.display_name(else_branch.ty)
                ),
            )
        });
        let loc = cond.loc;
        Expr::new(
            ty,
            loc,
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
        )
    }

    /// Precedence levels, loosest to tightest: `||`(1) `&&`(2) `|`(3)
    /// `^`(4) `&`(5) `==`/`!=`(6) relational(7) shift(8) additive(9)
    /// multiplicative(10). Levels above 10 are handled by
    /// [`Parser::parse_unary_expr`]/[`Parser::parse_postfix_expr`].
    fn parse_binary_expr(&mut self, min_prec: u8) -> Expr {
        let mut lhs = self.parse_unary_expr();
        loop {
            let (op, prec) = match self.binop_at_current(min_prec) {
                Some(x) => x,
                None => break,
            };
            self.bump();
            let rhs = self.parse_binary_expr(prec + 1);
            let ty = self.binary_result_type(op, &lhs, &rhs);
            let loc = lhs.loc;
            lhs = Expr::new(ty, loc, ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) });
        }
        lhs
    }

    fn binop_at_current(&mut self, min_prec: u8) -> Option<(BinaryOp, u8)> {
        let (op, prec) = match self.peek_kind() {
            TokenKind::PipePipe => (BinaryOp::Or, 1),
            TokenKind::AmpAmp => (BinaryOp::And, 2),
            TokenKind::Pipe => (BinaryOp::BitOr, 3),
            TokenKind::Caret => (BinaryOp::BitXor, 4),
            TokenKind::Amp => (BinaryOp::BitAnd, 5),
            TokenKind::EqEq => (BinaryOp::Eq, 6),
            TokenKind::BangEq => (BinaryOp::Ne, 6),
            TokenKind::Lt => (BinaryOp::Lt, 7),
            TokenKind::LtEq => (BinaryOp::Le, 7),
            TokenKind::Gt => (BinaryOp::Gt, 7),
            TokenKind::GtEq => (BinaryOp::Ge, 7),
            TokenKind::Shl => (BinaryOp::Shl, 8),
            TokenKind::Shr => (BinaryOp::Shr, 8),
            TokenKind::Plus => (BinaryOp::Add, 9),
            TokenKind::Minus => (BinaryOp::Sub, 9),
            TokenKind::Star => (BinaryOp::Mul, 10),
            TokenKind::Slash => (BinaryOp::Div, 10),
            TokenKind::Percent => (BinaryOp::Mod, 10),
            _ => return None,
        };
        if prec < min_prec {
            None
        } else {
            Some((op, prec))
        }
    }

    fn binary_result_type(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> TypeId {
        use BinaryOp::*;
        match op {
            And | Or | Eq | Ne | Lt | Le | Gt | Ge => self.types.bool_type(),
            _ => self.types.common(lhs.ty, rhs.ty).unwrap_or_else(|| {
                self.diags.fatal(
                    lhs.loc,
                    format!(
                        "no common type between '{}' and '{}'",
                        self.types.display_name(lhs.ty),
                        self.types.display_name(rhs.ty)
                    ),
                )
            }),
        }
    }

    fn parse_unary_expr(&mut self) -> Expr {
        let loc = self.peek().loc;
        match self.peek_kind() {
            TokenKind::Minus => {
                self.bump();
                let operand = self.parse_unary_expr();
                let ty = operand.ty;
                Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(operand) })
            }
            TokenKind::Bang => {
                self.bump();
                let operand = self.parse_unary_expr();
                let ty = self.types.bool_type();
                Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) })
            }
            TokenKind::Tilde => {
                self.bump();
                let operand = self.parse_unary_expr();
                let ty = operand.ty;
                Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::BitNot, operand: Box::new(operand) })
            }
            TokenKind::PlusPlus => {
                self.bump();
                let operand = self.parse_unary_expr();
                self.require_lvalue(&operand, loc);
                let ty = operand.ty;
                Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::PreIncr, operand: Box::new(operand) })
            }
            TokenKind::MinusMinus => {
                self.bump();
                let operand = self.parse_unary_expr();
                self.require_lvalue(&operand, loc);
                let ty = operand.ty;
                Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::PreDecr, operand: Box::new(operand) })
            }
            TokenKind::Star => {
                self.bump();
                let operand = self.parse_unary_expr();
                let ty = match self.types.kind(self.types.resolve_alias(operand.ty)) {
                    Kind::Pointer { to } => to,
                    _ => self.diags.fatal(operand.loc, "cannot dereference a non-pointer value"),
                };
                Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::Deref, operand: Box::new(operand) })
            }
            TokenKind::Amp => {
                self.bump();
                let operand = self.parse_unary_expr();
                if !operand.has_address() {
                    self.diags.fatal(operand.loc, "cannot take the address of this expression");
                }
                let ty = self.types.pointer(operand.ty);
                Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::AddrOf, operand: Box::new(operand) })
            }
            TokenKind::KwSizeof => {
                self.bump();
                self.expect(TokenKind::LParen, "'(' after 'sizeof'");
                let operand = if self.sizeof_operand_is_type() {
                    SizeofOperand::Type(self.parse_type())
                } else {
                    SizeofOperand::Value(Box::new(self.parse_assignment_expr()))
                };
                self.expect(TokenKind::RParen, "')' after sizeof operand");
                Expr::new(self.types.i64(), loc, ExprKind::Sizeof(operand))
            }
            TokenKind::KwAssert => {
                self.bump();
                self.expect(TokenKind::LParen, "'(' after 'assert'");
                let cond = self.parse_assignment_expr();
                let message = if self.eat(TokenKind::Comma) {
                    let tok = self.expect(TokenKind::StringLiteral, "a string literal message");
                    Some(tok.cooked)
                } else {
                    None
                };
                self.expect(TokenKind::RParen, "')' after assert arguments");
                Expr::new(
                    self.types.void(),
                    loc,
                    ExprKind::Assert { cond: Box::new(cond), message },
                )
            }
            TokenKind::LParen if self.is_cast_ahead() => self.parse_explicit_cast(),
            _ => self.parse_postfix_expr(),
        }
    }

    fn require_lvalue(&self, e: &Expr, loc: Location) {
        if !e.is_lvalue() {
            self.diags.fatal(loc, "operand must be an assignable location");
        }
    }

    /// `( type-name ) expr` is a cast iff the parenthesized content
    /// resolves to a known type name rather than an expression; the
    /// common ambiguity is `(x)` where `x` is both a type alias and,
    /// elsewhere, unreachable as a value, so the disambiguation only
    /// needs to check whether the identifier names a type in scope.
    fn is_cast_ahead(&mut self) -> bool {
        if self.peek_kind() != TokenKind::LParen {
            return false;
        }
        self.fill(1);
        match self.lookahead[1].kind {
            TokenKind::KwConst
            | TokenKind::KwReadonly
            | TokenKind::Arrow
            | TokenKind::KwArray
            | TokenKind::KwStruct
            | TokenKind::KwEnum => true,
            TokenKind::Ident => {
                let name = self.lookahead[1].text().to_string();
                matches!(self.symtab.find(&name, Lookup::Any), Some(e) if e.kind == EntryKind::Type)
            }
            _ => false,
        }
    }

    /// Disambiguates `sizeof`'s parenthesized operand the same way
    /// [`Parser::is_cast_ahead`] disambiguates a cast: a type keyword or an
    /// identifier already declared as a type name means `sizeof(type)`,
    /// anything else starts an expression.
    fn sizeof_operand_is_type(&mut self) -> bool {
        match self.peek_kind() {
            TokenKind::KwConst
            | TokenKind::KwReadonly
            | TokenKind::Arrow
            | TokenKind::KwArray
            | TokenKind::KwStruct
            | TokenKind::KwEnum => true,
            TokenKind::Ident => {
                let name = self.peek().text().to_string();
                matches!(self.symtab.find(&name, Lookup::Any), Some(e) if e.kind == EntryKind::Type)
            }
            _ => false,
        }
    }

    fn parse_explicit_cast(&mut self) -> Expr {
        let loc = self.peek().loc;
        self.bump();
        let target = self.parse_type();
        self.expect(TokenKind::RParen, "')' after cast type");
        let operand = self.parse_unary_expr();
        if self.types.explicit_cast(operand.ty, target).is_none() {
            self.diags.fatal(
                loc,
                format!(
                    "cannot cast a value of type '{}' to '{}'",
                    self.types.display_name(operand.ty),
                    self.types.display_name(target)
                ),
            );
        }
        Expr::new(target, loc, ExprKind::ExplicitCast(Box::new(operand)))
    }

    fn parse_postfix_expr(&mut self) -> Expr {
        let mut e = self.parse_primary_expr();
        loop {
            match self.peek_kind() {
                TokenKind::LBracket => {
                    let loc = self.bump().loc;
                    let index = self.parse_expr();
                    self.expect(TokenKind::RBracket, "']' after array index");
                    let ty = match self.types.kind(self.types.resolve_alias(e.ty)) {
                        Kind::Array { of, .. } => of,
                        Kind::Pointer { to } => to,
                        _ => self.diags.fatal(e.loc, "cannot index a non-array, non-pointer value"),
                    };
                    e = Expr::new(ty, loc, ExprKind::Index { base: Box::new(e), index: Box::new(index) });
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let arrow = self.check(TokenKind::Arrow);
                    let loc = self.bump().loc;
                    let name = self.expect(TokenKind::Ident, "a member name").cooked;
                    let base_struct_ty = if arrow {
                        match self.types.kind(self.types.resolve_alias(e.ty)) {
                            Kind::Pointer { to } => to,
                            _ => self.diags.fatal(e.loc, "'->' requires a pointer operand"),
                        }
                    } else {
                        e.ty
                    };
                    let ty = self.types.member_type(base_struct_ty, name.clone()).unwrap_or_else(|| {
                        self.diags.fatal(loc, format!("no member named '{}'", name))
                    });
                    e = Expr::new(
                        ty,
                        loc,
                        ExprKind::Member(crate::expr::Field { base: Box::new(e), name, arrow }),
                    );
                }
                TokenKind::LParen => {
                    let loc = self.bump().loc;
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_assignment_expr());
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "')' to close call arguments");
                    let (ret, params, varargs) = match self.types.kind(self.types.resolve_alias(e.ty)) {
                        Kind::Function { ret, params, varargs } => (ret, params, varargs),
                        _ => self.diags.fatal(e.loc, "called value is not a function"),
                    };
                    if args.len() < params.len() || (args.len() > params.len() && !varargs) {
                        self.diags.fatal(
                            loc,
                            format!("expected {} argument(s), found {}", params.len(), args.len()),
                        );
                    }
                    for (i, p) in params.iter().enumerate() {
                        self.resolve_compound_literal(&mut args[i], *p);
                        if self.types.convert(args[i].ty, *p).is_none() {
                            self.diags.fatal(
                                args[i].loc,
                                format!(
                                    "argument {} has type '{}', expected '{}'",
                                    i + 1,
                                    self.types.display_name(args[i].ty),
                                    self.types.display_name(*p)
                                ),
                            );
                        }
                    }
                    e = Expr::new(ret, loc, ExprKind::Call { callee: Box::new(e), args });
                }
                TokenKind::PlusPlus => {
                    let loc = self.bump().loc;
                    self.require_lvalue(&e, loc);
                    let ty = e.ty;
                    e = Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::PostIncr, operand: Box::new(e) });
                }
                TokenKind::MinusMinus => {
                    let loc = self.bump().loc;
                    self.require_lvalue(&e, loc);
                    let ty = e.ty;
                    e = Expr::new(ty, loc, ExprKind::Unary { op: UnaryOp::PostDecr, operand: Box::new(e) });
                }
                _ => return e,
            }
        }
    }

    /// An integer literal is `i32` unless its value doesn't fit, in which
    /// case it widens to `i64` and a warning is issued at the literal's
    /// location.
    fn int_literal_type(&mut self, tok: &Token, v: i64) -> TypeId {
        if v > i32::MAX as i64 || v < i32::MIN as i64 {
            self.diags.warning(tok.loc, format!("literal '{}' does not fit in i32", tok.text()));
            self.types.i64()
        } else {
            self.types.i32()
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::IntLiteral => {
                self.bump();
                let v: i64 = tok.text().parse().unwrap_or(0);
                Expr::new(self.int_literal_type(&tok, v), tok.loc, ExprKind::Literal(Literal::Int(v)))
            }
            TokenKind::HexLiteral => {
                self.bump();
                let v = i64::from_str_radix(tok.text().trim_start_matches("0x").trim_start_matches("0X"), 16)
                    .unwrap_or(0);
                Expr::new(self.int_literal_type(&tok, v), tok.loc, ExprKind::Literal(Literal::Int(v)))
            }
            TokenKind::OctalLiteral => {
                self.bump();
                let v = i64::from_str_radix(tok.text(), 8).unwrap_or(0);
                Expr::new(self.int_literal_type(&tok, v), tok.loc, ExprKind::Literal(Literal::Int(v)))
            }
            TokenKind::StringLiteral => {
                self.bump();
                let ty = self.types.pointer(self.types.get_const(self.types.char_type()));
                Expr::new(ty, tok.loc, ExprKind::Literal(Literal::Str(tok.cooked)))
            }
            TokenKind::CharLiteral => {
                self.bump();
                let c = tok.text().chars().next().unwrap_or('\0');
                Expr::new(self.types.char_type(), tok.loc, ExprKind::Literal(Literal::Char(c)))
            }
            TokenKind::KwNullptr => {
                self.bump();
                Expr::new(self.types.nullptr_type(), tok.loc, ExprKind::Literal(Literal::Null))
            }
            TokenKind::LParen => {
                self.bump();
                let e = self.parse_expr();
                self.expect(TokenKind::RParen, "')' to close parenthesized expression");
                e
            }
            TokenKind::Ident => {
                self.bump();
                let name = tok.cooked.clone();
                match self.symtab.find(name.as_str(), Lookup::Any) {
                    Some(entry) if matches!(entry.kind, EntryKind::Constant(_)) => {
                        let ty = entry.ty;
                        let value = match entry.kind {
                            EntryKind::Constant(v) => v,
                            _ => unreachable!(),
                        };
                        Expr::new(ty, tok.loc, ExprKind::EnumConstant { name, value })
                    }
                    Some(entry) if entry.kind != EntryKind::Type => {
                        let ty = entry.ty;
                        let mangled = entry.mangled.clone();
                        Expr::new(ty, tok.loc, ExprKind::Ident { name, mangled })
                    }
                    _ => self.diags.fatal(tok.loc, format!("use of undeclared identifier '{}'", name)),
                }
            }
            TokenKind::LBrace => self.parse_compound_literal(),
            _ => self.diags.fatal(tok.loc, format!("unexpected token '{}' in expression", tok.text())),
        }
    }

    fn parse_compound_literal(&mut self) -> Expr {
        let loc = self.bump().loc;
        let mut items = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                items.push(self.parse_assignment_expr());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}' to close compound literal");
        let ty = self.types.auto();
        Expr::new(ty, loc, ExprKind::CompoundLiteral(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    fn parse_src(text: &str) -> Parser {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.abc");
        std::fs::write(&path, text).unwrap();
        let interner = Rc::new(Interner::new());
        let diags = Rc::new(Diagnostics::new());
        let mut reader = Reader::new(interner.clone(), vec![dir.path().to_path_buf()]);
        reader.open_root(&path).unwrap();
        let lexer = Lexer::new(reader, interner.clone(), diags.clone());
        Parser::new(lexer, interner, diags)
    }

    #[test]
    fn struct_forward_declaration_then_completion_resolves_members() {
        let mut parser = parse_src(
            r#"
            struct S;
            struct S { x: i32; y: i32; };
            "#,
        );
        let _ = parser.parse_program();
        let s = parser
            .symtab
            .find("S", Lookup::Any)
            .expect("S registered as a type");
        assert_eq!(parser.types.member_index(s.ty, parser.interner.intern("x")), Some(0));
        assert_eq!(parser.types.member_index(s.ty, parser.interner.intern("y")), Some(1));
    }

    #[test]
    fn int_literal_widens_to_i64_when_it_overflows_i32() {
        let mut parser = parse_src("global g: i64 = 2147483648;\n");
        let program = parser.parse_program();
        match &program.items[0] {
            TopLevel::Global(g) => {
                let init = g.init.as_ref().expect("initializer present");
                assert_eq!(init.ty, parser.types.i64());
            }
            _ => panic!("expected a global"),
        }
    }

    #[test]
    fn compound_literal_validates_member_by_member_against_declared_struct() {
        let mut parser = parse_src(
            r#"
            struct Pair { a: i32; b: i32; };
            fn main(): i32 {
                local p: Pair = { 1, 2 };
                return 0;
            }
            "#,
        );
        let program = parser.parse_program();
        let body = match &program.items[1] {
            TopLevel::FnDef(def) => &def.body,
            _ => panic!("expected a function definition"),
        };
        let pair_ty = parser.symtab.find("Pair", Lookup::Any).expect("Pair registered as a type").ty;
        match &body.stmts[0] {
            Stmt::Local(local) => assert_eq!(local.ty, pair_ty),
            _ => panic!("expected a local statement"),
        }
    }

    #[test]
    fn compound_literal_returned_from_a_function_resolves_its_type() {
        let mut parser = parse_src(
            r#"
            struct Pair { a: i32; b: i32; };
            fn make(): Pair {
                return { 1, 2 };
            }
            "#,
        );
        let program = parser.parse_program();
        let body = match &program.items[1] {
            TopLevel::FnDef(def) => &def.body,
            _ => panic!("expected a function definition"),
        };
        let pair_ty = parser.symtab.find("Pair", Lookup::Any).expect("Pair registered as a type").ty;
        match &body.stmts[0] {
            Stmt::Return { value: Some(e), .. } => {
                assert_eq!(e.ty, pair_ty);
                assert!(matches!(e.kind, ExprKind::CompoundLiteral(_)));
            }
            other => panic!("expected a return with a value, got {:?}", other),
        }
    }

    #[test]
    fn binary_precedence_groups_multiplication_tighter_than_addition() {
        let mut parser = parse_src("global g: i32 = 1 + 2 * 3;\n");
        let program = parser.parse_program();
        match &program.items[0] {
            TopLevel::Global(g) => match &g.init.as_ref().unwrap().kind {
                ExprKind::Binary { op: BinaryOp::Add, rhs, .. } => {
                    assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
                }
                other => panic!("expected top-level '+', got {:?}", other),
            },
            _ => panic!("expected a global"),
        }
    }

    #[test]
    fn enum_variant_resolves_as_a_constant_expression() {
        let mut parser = parse_src(
            r#"
            enum Color { Red, Green, Blue = 5 };
            global g: i32 = Blue;
            "#,
        );
        let program = parser.parse_program();
        match &program.items[1] {
            TopLevel::Global(g) => {
                let init = g.init.as_ref().expect("initializer present");
                assert_eq!(init.load_constant(), Some(5));
                assert!(matches!(init.kind, ExprKind::EnumConstant { value: 5, .. }));
            }
            _ => panic!("expected a global"),
        }
    }

    #[test]
    fn sizeof_accepts_a_type_name() {
        let mut parser = parse_src("global g: i64 = sizeof(i32);\n");
        let program = parser.parse_program();
        match &program.items[0] {
            TopLevel::Global(g) => {
                let init = g.init.as_ref().expect("initializer present");
                match &init.kind {
                    ExprKind::Sizeof(SizeofOperand::Type(t)) => assert_eq!(*t, parser.types.i32()),
                    other => panic!("expected a type operand, got {:?}", other),
                }
            }
            _ => panic!("expected a global"),
        }
    }

    #[test]
    fn sizeof_accepts_an_arbitrary_expression() {
        let mut parser = parse_src(
            r#"
            fn main(): i32 {
                local n: i32 = 0;
                local s: i64 = sizeof(n + 1);
                return 0;
            }
            "#,
        );
        let program = parser.parse_program();
        let body = match &program.items[0] {
            TopLevel::FnDef(def) => &def.body,
            _ => panic!("expected a function definition"),
        };
        match &body.stmts[1] {
            Stmt::Local(local) => match &local.init.as_ref().unwrap().kind {
                ExprKind::Sizeof(SizeofOperand::Value(inner)) => {
                    assert!(matches!(inner.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
                }
                other => panic!("expected an expression operand, got {:?}", other),
            },
            other => panic!("expected a local statement, got {:?}", other),
        }
    }
}
