//! Expression tree produced by the parser.
//!
//! `Display` renders the tree as an s-expression, which is what the CLI
//! `parse` subcommand prints and what the parser tests compare against.

use std::fmt;

use crate::lexer::format_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    None,
    True,
    False,
}

impl Constant {
    pub fn text(self) -> &'static str {
        match self {
            Constant::None => "None",
            Constant::True => "True",
            Constant::False => "False",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
}

impl UnaryOp {
    pub fn text(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitXor,
    BitOr,
}

impl BinaryOp {
    pub fn text(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
        }
    }
}

/// Operators allowed in a comparison chain. `<>` parses to [`CompareOp::Ne`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    In,
    NotIn,
    Is,
    IsNot,
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
    Eq,
}

impl CompareOp {
    pub fn text(self) -> &'static str {
        match self {
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Ne => "!=",
            CompareOp::Eq => "==",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Number(f64),
    /// Undecoded string literal content.
    Str { raw: String, unicode: bool },
    Constant(Constant),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Not(Box<Expr>),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// `expressions` has exactly one more element than `operators`.
    Compare { expressions: Vec<Expr>, operators: Vec<CompareOp> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `name=value`, only meaningful inside call arguments.
    KeywordArg { name: String, value: Box<Expr> },
    Attribute { object: Box<Expr>, name: String },
    Subscript { object: Box<Expr>, index: Box<Expr> },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    /// `body if test else orelse`
    Conditional { body: Box<Expr>, test: Box<Expr>, orelse: Box<Expr> },
    Lambda { params: Vec<String>, body: Box<Expr> },
}

fn write_all(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for item in items {
        write!(f, " {item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => write!(f, "(name {name})"),
            Expr::Number(n) => write!(f, "(number {})", format_number(*n)),
            Expr::Str { raw, .. } => write!(f, "(string {raw})"),
            Expr::Constant(c) => write!(f, "(constant {})", c.text()),
            Expr::Unary { op, operand } => write!(f, "({} {operand})", op.text()),
            Expr::Not(operand) => write!(f, "(not {operand})"),
            Expr::Binary { op, left, right } => write!(f, "({} {left} {right})", op.text()),
            Expr::And(left, right) => write!(f, "(and {left} {right})"),
            Expr::Or(left, right) => write!(f, "(or {left} {right})"),
            Expr::Compare {
                expressions,
                operators,
            } => {
                f.write_str("(comparator")?;
                for (i, expr) in expressions.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {}", operators[i - 1].text())?;
                    }
                    write!(f, " {expr}")?;
                }
                f.write_str(")")
            }
            Expr::Call { callee, args } => {
                write!(f, "(call {callee}")?;
                write_all(f, args)?;
                f.write_str(")")
            }
            Expr::KeywordArg { name, value } => write!(f, "(= {name} {value})"),
            Expr::Attribute { object, name } => write!(f, "(. {object} {name})"),
            Expr::Subscript { object, index } => write!(f, "([ {object} {index})"),
            Expr::Tuple(items) => {
                f.write_str("(tuple")?;
                write_all(f, items)?;
                f.write_str(")")
            }
            Expr::List(items) => {
                f.write_str("(list")?;
                write_all(f, items)?;
                f.write_str(")")
            }
            Expr::Dict(entries) => {
                f.write_str("(dict")?;
                for (key, value) in entries {
                    write!(f, " ({key} {value})")?;
                }
                f.write_str(")")
            }
            Expr::Conditional { body, test, orelse } => {
                write!(f, "(if {test} {body} {orelse})")
            }
            Expr::Lambda { params, body } => {
                write!(f, "(lambda ({}) {body})", params.join(" "))
            }
        }
    }
}
