//! Typed statement and declaration tree.
//!
//! Nodes are produced already resolved: a [`Stmt::Local`] carries the
//! [`TypeId`] the initializer was checked against, a [`Stmt::Goto`] already
//! knows which [`Stmt::Label`] it targets. The parser builds this tree
//! while it parses; nothing here
//! re-derives facts the parser already established.

use crate::expr::Expr;
use crate::location::Location;
use crate::strings::Sym;
use crate::types::TypeId;

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Sym,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: Sym,
    pub mangled: String,
    pub params: Vec<Param>,
    pub varargs: bool,
    pub ret: TypeId,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct FnDef {
    pub decl: FnDecl,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: Sym,
    pub mangled: String,
    pub ty: TypeId,
    pub init: Option<Expr>,
    pub is_extern: bool,
    pub is_static: bool,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: Sym,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Sym,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct TypeAlias {
    pub name: Sym,
    pub aliased: TypeId,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: Sym,
    pub mangled: String,
    pub ty: TypeId,
    pub init: Option<Expr>,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` marks the `default:` arm. Case values are already evaluated
    /// to a constant `i64` by the parser.
    pub value: Option<i64>,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Local(LocalVar),
    Expr(Expr),
    Block(Block),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    /// Case arms and the body statements that follow each, in source
    /// order; fall-through is simply "no implicit break" and is left to
    /// the IR builder's linear emission of the arm bodies.
    Switch {
        scrutinee: Expr,
        arms: Vec<(SwitchCase, Vec<Stmt>)>,
        loc: Location,
    },
    Return {
        value: Option<Expr>,
        loc: Location,
    },
    Break(Location),
    Continue(Location),
    Goto {
        label: Sym,
        loc: Location,
    },
    Label {
        name: Sym,
        loc: Location,
    },
}

#[derive(Debug, Clone)]
pub enum TopLevel {
    FnDecl(FnDecl),
    FnDef(FnDef),
    Global(GlobalVar),
    Struct(StructDecl),
    Enum(EnumDecl),
    Alias(TypeAlias),
}

#[derive(Debug, Default)]
pub struct Program {
    pub items: Vec<TopLevel>,
}

impl Program {
    pub fn find_fn(&self, name: &str) -> Option<&FnDecl> {
        self.items.iter().find_map(|item| match item {
            TopLevel::FnDecl(d) if d.name.as_str() == name => Some(d),
            TopLevel::FnDef(d) if d.decl.name.as_str() == name => Some(&d.decl),
            _ => None,
        })
    }
}
