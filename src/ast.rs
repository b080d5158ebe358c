//! Abstract syntax tree consumed by the resolver and the evaluator.
//!
//! Both node sets are closed enums; every pass matches them exhaustively.
//! Nodes are immutable once the parser has built them. Function
//! declarations sit behind an [`Rc`] because runtime closures keep their
//! declaration alive long after the statement that introduced them has run.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::token::Token;

/// Identity of a name‑referencing expression node (`Variable`, `Assign`,
/// `This`). The resolver's distance table is keyed by it, so two references
/// to the same name in different places never share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    /// Allocate a fresh id. Unique for the life of the process, so separate
    /// parses (one per REPL line) can feed a single interpreter.
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A literal constant that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of expression in Lox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(LiteralValue),

    /// Prefix operator: `!ready`, `-42`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix arithmetic, comparison or equality operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Read of a named variable.
    Variable { id: ExprId, name: Token },

    /// `name = value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Function, method or class call.
    Call {
        callee: Box<Expr>,
        /// The closing `)`, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },
}

impl Expr {
    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }

    pub fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign {
            id: ExprId::fresh(),
            name,
            value: Box::new(value),
        }
    }

    pub fn this(keyword: Token) -> Self {
        Expr::This {
            id: ExprId::fresh(),
            keyword,
        }
    }
}

/// A named function: top‑level, nested, or a class method.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// Every kind of statement in Lox. `for` loops never reach this tree; the
/// parser lowers them to `While` inside a `Block`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    /// `var name (= initializer)?;`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword, for error locations.
        keyword: Token,
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,
        methods: Vec<Rc<FunctionDecl>>,
    },
}

/// Ids of every reference in `statements` that lies outside a function or
/// method body. Such references are evaluated only while the statements
/// themselves run; nothing can reach them afterwards.
pub fn transient_ids(statements: &[Stmt]) -> Vec<ExprId> {
    let mut ids = Vec::new();
    for stmt in statements {
        stmt.collect_transient_ids(&mut ids);
    }
    ids
}

impl Stmt {
    fn collect_transient_ids(&self, ids: &mut Vec<ExprId>) {
        match self {
            Stmt::Expression(expr) | Stmt::Print(expr) => expr.collect_ids(ids),
            Stmt::Var { initializer, .. } => {
                if let Some(expr) = initializer {
                    expr.collect_ids(ids);
                }
            }
            Stmt::Block(statements) => {
                for stmt in statements {
                    stmt.collect_transient_ids(ids);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.collect_ids(ids);
                then_branch.collect_transient_ids(ids);
                if let Some(else_branch) = else_branch {
                    else_branch.collect_transient_ids(ids);
                }
            }
            Stmt::While { condition, body } => {
                condition.collect_ids(ids);
                body.collect_transient_ids(ids);
            }
            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    expr.collect_ids(ids);
                }
            }
            // Bodies outlive the statement through their closures.
            Stmt::Function(_) | Stmt::Class { .. } => {}
        }
    }
}

impl Expr {
    fn collect_ids(&self, ids: &mut Vec<ExprId>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable { id, .. } | Expr::This { id, .. } => ids.push(*id),
            Expr::Assign { id, value, .. } => {
                ids.push(*id);
                value.collect_ids(ids);
            }
            Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => inner.collect_ids(ids),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.collect_ids(ids);
                right.collect_ids(ids);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                callee.collect_ids(ids);
                for arg in arguments {
                    arg.collect_ids(ids);
                }
            }
            Expr::Get { object, .. } => object.collect_ids(ids),
            Expr::Set { object, value, .. } => {
                object.collect_ids(ids);
                value.collect_ids(ids);
            }
        }
    }
}
