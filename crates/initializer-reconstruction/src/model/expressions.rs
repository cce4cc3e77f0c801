// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::model::{SlotId, TypeRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// `default(T)`: the zero value of a type.
    Default(TypeRef),
}

impl Literal {
    /// Whether the literal equals the implicit zero-initialized value.
    pub fn is_zero_value(&self) -> bool {
        match self {
            Literal::Null | Literal::Default(_) => true,
            Literal::Bool(b) => !*b,
            Literal::Int(i) => *i == 0,
            Literal::Str(_) => false,
        }
    }
}

/// A resolved call target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callee {
    /// Qualified display name, e.g. `Guid.NewGuid`.
    pub name: String,
    /// The front end proved the callee has no observable effects and cannot throw.
    pub pure: bool,
}

impl Callee {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), pure: false }
    }

    pub fn pure(name: impl Into<String>) -> Self {
        Self { name: name.into(), pure: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add, Sub, Mul, Div, Rem,
    BitAnd, BitOr,
    And, Or,
    Eq, Ne, Lt, Le, Gt, Ge,
}

impl BinOp {
    /// Operators that can raise an exception on some operand values.
    pub fn may_throw(self) -> bool {
        matches!(self, BinOp::Div | BinOp::Rem)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    Neg,
}

/// Expression tree. The `Select` variant is the front end's value-producing branch;
/// `Conditional`, `Coalesce` and `ConditionalAccess` are the canonical shapes the
/// expression shape inferencer rewrites it into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// Constructor parameter by position.
    Param(usize),

    /// The instance under construction, escaping as a value.
    This,

    /// Read of a member slot of the instance under construction.
    Member(SlotId),

    /// Member access on another value.
    Field {
        target: Box<Expr>,
        name: String,
        /// The member has a non-nullable value type, so reading it never yields null.
        non_null: bool,
    },

    Call {
        callee: Callee,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },

    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },

    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },

    Convert {
        ty: TypeRef,
        value: Box<Expr>,
    },

    /// Value-level branch as produced by the front end.
    Select {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },

    /// `cond ? when_true : when_false`
    Conditional {
        cond: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },

    /// `value ?? fallback`
    Coalesce {
        value: Box<Expr>,
        fallback: Box<Expr>,
    },

    /// `target?.member`
    ConditionalAccess {
        target: Box<Expr>,
        member: String,
    },

    /// Throw expression.
    Throw(Box<Expr>),
}

impl Expr {
    pub fn null() -> Expr {
        Expr::Literal(Literal::Null)
    }

    pub fn int(value: i64) -> Expr {
        Expr::Literal(Literal::Int(value))
    }

    pub fn boolean(value: bool) -> Expr {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn str(value: impl Into<String>) -> Expr {
        Expr::Literal(Literal::Str(value.into()))
    }

    pub fn call(callee: Callee, args: Vec<Expr>) -> Expr {
        Expr::Call { callee, receiver: None, args }
    }

    pub fn method(receiver: Expr, callee: Callee, args: Vec<Expr>) -> Expr {
        Expr::Call { callee, receiver: Some(Box::new(receiver)), args }
    }

    pub fn field(target: Expr, name: impl Into<String>) -> Expr {
        Expr::Field { target: Box::new(target), name: name.into(), non_null: false }
    }

    pub fn value_field(target: Expr, name: impl Into<String>) -> Expr {
        Expr::Field { target: Box::new(target), name: name.into(), non_null: true }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn select(cond: Expr, then_value: Expr, else_value: Expr) -> Expr {
        Expr::Select {
            cond: Box::new(cond),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        }
    }

    pub fn conditional(cond: Expr, when_true: Expr, when_false: Expr) -> Expr {
        Expr::Conditional {
            cond: Box::new(cond),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_param(&self) -> Option<usize> {
        match self {
            Expr::Param(index) => Some(*index),
            _ => None,
        }
    }

    /// Direct sub-expressions, in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Param(_) | Expr::This | Expr::Member(_) => vec![],
            Expr::Field { target, .. } | Expr::ConditionalAccess { target, .. } => vec![&**target],
            Expr::Call { receiver, args, .. } => {
                receiver.iter().map(|r| &**r).chain(args.iter()).collect()
            }
            Expr::New { args, .. } => args.iter().collect(),
            Expr::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            Expr::Unary { operand, .. } => vec![&**operand],
            Expr::Convert { value, .. } | Expr::Throw(value) => vec![&**value],
            Expr::Select { cond, then_value, else_value } => {
                vec![&**cond, &**then_value, &**else_value]
            }
            Expr::Conditional { cond, when_true, when_false } => {
                vec![&**cond, &**when_true, &**when_false]
            }
            Expr::Coalesce { value, fallback } => vec![&**value, &**fallback],
        }
    }

    /// Rebuild the expression bottom-up, applying `f` to every node after its
    /// children have been rewritten.
    pub fn rewrite_bottom_up(self, f: &mut impl FnMut(Expr) -> Expr) -> Expr {
        let rebuilt = match self {
            leaf @ (Expr::Literal(_) | Expr::Param(_) | Expr::This | Expr::Member(_)) => leaf,
            Expr::Field { target, name, non_null } => Expr::Field {
                target: Box::new((*target).rewrite_bottom_up(f)),
                name,
                non_null,
            },
            Expr::ConditionalAccess { target, member } => Expr::ConditionalAccess {
                target: Box::new((*target).rewrite_bottom_up(f)),
                member,
            },
            Expr::Call { callee, receiver, args } => Expr::Call {
                callee,
                receiver: receiver.map(|r| Box::new((*r).rewrite_bottom_up(f))),
                args: args.into_iter().map(|a| a.rewrite_bottom_up(f)).collect(),
            },
            Expr::New { ty, args } => Expr::New {
                ty,
                args: args.into_iter().map(|a| a.rewrite_bottom_up(f)).collect(),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op,
                lhs: Box::new((*lhs).rewrite_bottom_up(f)),
                rhs: Box::new((*rhs).rewrite_bottom_up(f)),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op,
                operand: Box::new((*operand).rewrite_bottom_up(f)),
            },
            Expr::Convert { ty, value } => Expr::Convert {
                ty,
                value: Box::new((*value).rewrite_bottom_up(f)),
            },
            Expr::Throw(value) => Expr::Throw(Box::new((*value).rewrite_bottom_up(f))),
            Expr::Select { cond, then_value, else_value } => Expr::Select {
                cond: Box::new((*cond).rewrite_bottom_up(f)),
                then_value: Box::new((*then_value).rewrite_bottom_up(f)),
                else_value: Box::new((*else_value).rewrite_bottom_up(f)),
            },
            Expr::Conditional { cond, when_true, when_false } => Expr::Conditional {
                cond: Box::new((*cond).rewrite_bottom_up(f)),
                when_true: Box::new((*when_true).rewrite_bottom_up(f)),
                when_false: Box::new((*when_false).rewrite_bottom_up(f)),
            },
            Expr::Coalesce { value, fallback } => Expr::Coalesce {
                value: Box::new((*value).rewrite_bottom_up(f)),
                fallback: Box::new((*fallback).rewrite_bottom_up(f)),
            },
        };
        f(rebuilt)
    }

    /// Number of nodes in `self` structurally equal to `needle`.
    pub fn count_occurrences(&self, needle: &Expr) -> usize {
        if self == needle {
            return 1;
        }
        self.children().into_iter().map(|c| c.count_occurrences(needle)).sum()
    }
}
