//! Typed expression tree.
//!
//! Every [`Expr`] already carries its [`TypeId`] (filled in during
//! parsing, not a later pass). The `has_address`/`is_lvalue`/`is_const`
//! family answers the questions the IR builder needs to decide whether an
//! expression can be assigned to, whether it needs a `load` at all, or
//! whether it can be folded to an immediate instead of emitted as code
//!.

use crate::location::Location;
use crate::strings::Sym;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreIncr,
    PreDecr,
    PostIncr,
    PostDecr,
    Deref,
    AddrOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(Sym),
    Null,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub base: Box<Expr>,
    pub name: Sym,
    /// `true` for `->`, `false` for `.`.
    pub arrow: bool,
}

#[derive(Debug, Clone)]
pub struct ExprData {
    pub ty: TypeId,
    pub loc: Location,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Ident {
        name: Sym,
        mangled: String,
    },
    /// A reference to an enum variant, resolved at parse time to its
    /// already-computed discriminant rather than to a storage location.
    EnumConstant {
        name: Sym,
        value: i64,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Member(Field),
    Conditional {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    ImplicitCast(Box<Expr>),
    ExplicitCast(Box<Expr>),
    Sizeof(SizeofOperand),
    Assert {
        cond: Box<Expr>,
        message: Option<Sym>,
    },
    /// A `{ ... }` compound literal, already structurally matched against
    /// its target struct/array type member-by-member.
    CompoundLiteral(Vec<Expr>),
    Comma(Vec<Expr>),
}

/// `sizeof`'s operand: a bare type name (`sizeof(i32)`) or an arbitrary
/// expression, sized by its own type without being evaluated
/// (`sizeof(x + 1)`).
#[derive(Debug, Clone)]
pub enum SizeofOperand {
    Type(TypeId),
    Value(Box<Expr>),
}

pub type Expr = ExprData;

impl Expr {
    pub fn new(ty: TypeId, loc: Location, kind: ExprKind) -> Self {
        Expr { ty, loc, kind }
    }

    /// Does this expression denote a memory location (as opposed to only
    /// a value)? An lvalue, a `*p` dereference, and `a[i]` all have an
    /// address even when the language forbids assigning through them
    ///.
    pub fn has_address(&self) -> bool {
        match &self.kind {
            ExprKind::Ident { .. } => true,
            ExprKind::Unary { op: UnaryOp::Deref, .. } => true,
            ExprKind::Index { .. } => true,
            ExprKind::Member(_) => true,
            // A `{ ... }` compound literal materializes into a hidden local
            // wherever it appears, so it is addressable just like a named
            // variable of the same aggregate type.
            ExprKind::CompoundLiteral(_) => true,
            ExprKind::ImplicitCast(inner) | ExprKind::ExplicitCast(inner) => inner.has_address(),
            _ => false,
        }
    }

    /// An lvalue is simply an addressable expression; callers that need to
    /// reject assignment through a `const`-qualified referent check
    /// `TypeRegistry::is_const` on `self.ty` separately (the two checks are
    /// reported as distinct diagnostics: "not an lvalue" versus "assignment
    /// to const").
    pub fn is_lvalue(&self) -> bool {
        self.has_address()
    }

    /// True when the value is known at compile time: literals and
    /// `sizeof` of a complete type.
    pub fn is_const(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) => true,
            ExprKind::EnumConstant { .. } => true,
            ExprKind::Sizeof(_) => true,
            ExprKind::ImplicitCast(inner) | ExprKind::ExplicitCast(inner) => inner.is_const(),
            ExprKind::Unary { op: UnaryOp::Neg | UnaryOp::Not | UnaryOp::BitNot, operand } => {
                operand.is_const()
            }
            ExprKind::Binary { op, lhs, rhs } if !is_assignment(*op) => {
                lhs.is_const() && rhs.is_const()
            }
            _ => false,
        }
    }

    /// A constant expression whose address is itself constant (a global,
    /// not a local): the only initializer form legal for a `global`/
    /// `static` declarator.
    pub fn has_constant_address(&self) -> bool {
        matches!(&self.kind, ExprKind::Ident { .. }) && self.has_address()
    }

    /// Fold to an `i64`, for contexts that require a constant expression
    /// (`case` labels, array bounds). `None` if not foldable.
    pub fn load_constant(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::Literal(Literal::Int(v)) => Some(*v),
            ExprKind::Literal(Literal::Char(c)) => Some(*c as i64),
            ExprKind::Literal(Literal::Bool(b)) => Some(*b as i64),
            ExprKind::EnumConstant { value, .. } => Some(*value),
            ExprKind::Unary { op: UnaryOp::Neg, operand } => operand.load_constant().map(|v| -v),
            ExprKind::Unary { op: UnaryOp::BitNot, operand } => operand.load_constant().map(|v| !v),
            ExprKind::ImplicitCast(inner) | ExprKind::ExplicitCast(inner) => inner.load_constant(),
            ExprKind::Binary { op, lhs, rhs } => {
                let (a, b) = (lhs.load_constant()?, rhs.load_constant()?);
                match op {
                    BinaryOp::Add => Some(a + b),
                    BinaryOp::Sub => Some(a - b),
                    BinaryOp::Mul => Some(a * b),
                    BinaryOp::Div if b != 0 => Some(a / b),
                    BinaryOp::Mod if b != 0 => Some(a % b),
                    BinaryOp::BitAnd => Some(a & b),
                    BinaryOp::BitOr => Some(a | b),
                    BinaryOp::BitXor => Some(a ^ b),
                    BinaryOp::Shl => Some(a << b),
                    BinaryOp::Shr => Some(a >> b),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// `true` when evaluating this expression as a branch condition needs
    /// no extra comparison-to-zero (it is already a boolean-producing
    /// form): `&&`, `||`, `!`, and the relational/equality operators.
    pub fn is_condition_ready(&self) -> bool {
        matches!(
            &self.kind,
            ExprKind::Binary {
                op: BinaryOp::And
                    | BinaryOp::Or
                    | BinaryOp::Eq
                    | BinaryOp::Ne
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge,
                ..
            } | ExprKind::Unary { op: UnaryOp::Not, .. }
        )
    }

    /// One-line rendering of this expression, parenthesizing sub-expressions
    /// whose precedence is lower than the caller's. Used to embed the
    /// failing condition's source text in an `assert` call.
    pub fn flat_print(&self) -> String {
        self.flat_print_prec(0)
    }

    fn flat_print_prec(&self, min_prec: u8) -> String {
        let (text, prec) = self.flat_print_inner();
        if prec < min_prec {
            format!("({})", text)
        } else {
            text
        }
    }

    fn flat_print_inner(&self) -> (String, u8) {
        match &self.kind {
            ExprKind::Literal(lit) => (flat_print_literal(lit), 13),
            ExprKind::Ident { name, .. } => (name.to_string(), 13),
            ExprKind::EnumConstant { name, .. } => (name.to_string(), 13),
            ExprKind::Unary { op, operand } => {
                let sym = unary_symbol(*op);
                let inner = operand.flat_print_prec(11);
                let text = match op {
                    UnaryOp::PostIncr | UnaryOp::PostDecr => format!("{}{}", inner, sym),
                    _ => format!("{}{}", sym, inner),
                };
                (text, 11)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let prec = binary_precedence(*op);
                let sym = binary_symbol(*op);
                let lhs_text = lhs.flat_print_prec(prec);
                let rhs_text = rhs.flat_print_prec(prec + 1);
                (format!("{} {} {}", lhs_text, sym, rhs_text), prec)
            }
            ExprKind::Call { callee, args } => {
                let callee_text = callee.flat_print_prec(12);
                let args_text: Vec<String> = args.iter().map(|a| a.flat_print_prec(0)).collect();
                (format!("{}({})", callee_text, args_text.join(", ")), 12)
            }
            ExprKind::Index { base, index } => {
                (format!("{}[{}]", base.flat_print_prec(12), index.flat_print_prec(0)), 12)
            }
            ExprKind::Member(field) => {
                let sep = if field.arrow { "->" } else { "." };
                (format!("{}{}{}", field.base.flat_print_prec(12), sep, field.name), 12)
            }
            ExprKind::Conditional { cond, then_branch, else_branch } => (
                format!(
                    "{} ? {} : {}",
                    cond.flat_print_prec(2),
                    then_branch.flat_print_prec(0),
                    else_branch.flat_print_prec(1)
                ),
                1,
            ),
            ExprKind::ImplicitCast(inner) => inner.flat_print_inner(),
            ExprKind::ExplicitCast(inner) => (format!("(cast){}", inner.flat_print_prec(11)), 11),
            ExprKind::Sizeof(_) => ("sizeof(...)".to_string(), 13),
            ExprKind::Assert { cond, .. } => (format!("assert {}", cond.flat_print_prec(0)), 0),
            ExprKind::CompoundLiteral(items) => {
                let items_text: Vec<String> = items.iter().map(|i| i.flat_print_prec(0)).collect();
                (format!("{{ {} }}", items_text.join(", ")), 13)
            }
            ExprKind::Comma(items) => {
                let items_text: Vec<String> = items.iter().map(|i| i.flat_print_prec(0)).collect();
                (items_text.join(", "), 0)
            }
        }
    }
}

fn flat_print_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => v.to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Char(c) => format!("'{}'", c),
        Literal::Str(s) => format!("\"{}\"", s),
        Literal::Null => "nullptr".to_string(),
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::PreIncr | UnaryOp::PostIncr => "++",
        UnaryOp::PreDecr | UnaryOp::PostDecr => "--",
        UnaryOp::Deref => "*",
        UnaryOp::AddrOf => "&",
    }
}

/// Matches the precedence levels `Parser::binop_at_current` assigns,
/// plus 0 for the assignment family (handled separately by the parser).
fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::BitOr => 3,
        BinaryOp::BitXor => 4,
        BinaryOp::BitAnd => 5,
        BinaryOp::Eq | BinaryOp::Ne => 6,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 7,
        BinaryOp::Shl | BinaryOp::Shr => 8,
        BinaryOp::Add | BinaryOp::Sub => 9,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 10,
        _ => 0,
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Assign => "=",
        BinaryOp::AddAssign => "+=",
        BinaryOp::SubAssign => "-=",
        BinaryOp::MulAssign => "*=",
        BinaryOp::DivAssign => "/=",
        BinaryOp::ModAssign => "%=",
        BinaryOp::AndAssign => "&=",
        BinaryOp::OrAssign => "|=",
        BinaryOp::XorAssign => "^=",
        BinaryOp::ShlAssign => "<<=",
        BinaryOp::ShrAssign => ">>=",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::types::TypeRegistry;

    fn lit_int(reg: &TypeRegistry, v: i64) -> Expr {
        Expr::new(reg.i64(), Location::synthetic(), ExprKind::Literal(Literal::Int(v)))
    }

    #[test]
    fn literal_is_const_and_foldable() {
        let reg = TypeRegistry::new();
        let e = lit_int(&reg, 41);
        assert!(e.is_const());
        assert_eq!(e.load_constant(), Some(41));
    }

    #[test]
    fn binary_const_folds_through_arithmetic() {
        let reg = TypeRegistry::new();
        let lhs = lit_int(&reg, 2);
        let rhs = lit_int(&reg, 3);
        let e = Expr::new(
            reg.i64(),
            Location::synthetic(),
            ExprKind::Binary { op: BinaryOp::Mul, lhs: Box::new(lhs), rhs: Box::new(rhs) },
        );
        assert!(e.is_const());
        assert_eq!(e.load_constant(), Some(6));
    }

    #[test]
    fn assignment_is_never_const() {
        let reg = TypeRegistry::new();
        let lhs = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Ident { name: Sym::empty(), mangled: "x".into() },
        );
        let rhs = lit_int(&reg, 1);
        let e = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Binary { op: BinaryOp::Assign, lhs: Box::new(lhs), rhs: Box::new(rhs) },
        );
        assert!(!e.is_const());
    }

    #[test]
    fn flat_print_parenthesizes_lower_precedence_subexpression() {
        let reg = TypeRegistry::new();
        // (1 + 2) * 3
        let sum = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(lit_int(&reg, 1)),
                rhs: Box::new(lit_int(&reg, 2)),
            },
        );
        let e = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Binary { op: BinaryOp::Mul, lhs: Box::new(sum), rhs: Box::new(lit_int(&reg, 3)) },
        );
        assert_eq!(e.flat_print(), "(1 + 2) * 3");
    }

    #[test]
    fn flat_print_renders_comparison_without_extra_parens() {
        let reg = TypeRegistry::new();
        let interner = crate::strings::Interner::new();
        let lhs = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Ident { name: interner.intern("n"), mangled: "n".into() },
        );
        let e = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Binary { op: BinaryOp::Gt, lhs: Box::new(lhs), rhs: Box::new(lit_int(&reg, 0)) },
        );
        assert_eq!(e.flat_print(), "n > 0");
    }

    #[test]
    fn identifier_has_address_but_deref_result_also_does() {
        let reg = TypeRegistry::new();
        let id = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Ident { name: Sym::empty(), mangled: "x".into() },
        );
        assert!(id.has_address());
        let deref = Expr::new(
            reg.i32(),
            Location::synthetic(),
            ExprKind::Unary { op: UnaryOp::Deref, operand: Box::new(id) },
        );
        assert!(deref.has_address());
    }
}
