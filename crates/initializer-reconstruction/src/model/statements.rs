// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::model::{CtorId, Expr, SlotId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationTarget {
    /// The base type's constructor.
    Base,
    /// Another constructor of the same type.
    This(CtorId),
}

/// A `base(...)` or `this(...)` call with its bound arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationCall {
    pub target: DelegationTarget,
    pub args: Vec<Expr>,
}

/// A low-level constructor statement, as resolved by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Store into a member slot of the instance under construction.
    Assign { slot: SlotId, value: Expr },

    Delegate(DelegationCall),

    /// Expression evaluated for its effects.
    Eval(Expr),

    If {
        cond: Expr,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },

    Throw(Expr),
}

impl Statement {
    pub fn assign(slot: SlotId, value: Expr) -> Statement {
        Statement::Assign { slot, value }
    }

    pub fn base(args: Vec<Expr>) -> Statement {
        Statement::Delegate(DelegationCall { target: DelegationTarget::Base, args })
    }

    pub fn this(target: CtorId, args: Vec<Expr>) -> Statement {
        Statement::Delegate(DelegationCall { target: DelegationTarget::This(target), args })
    }

    pub fn assigned_slot(&self) -> Option<SlotId> {
        match self {
            Statement::Assign { slot, .. } => Some(*slot),
            _ => None,
        }
    }

    /// Whether this statement stores to `slot`, directly or inside a branch.
    pub fn stores(&self, slot: SlotId) -> bool {
        match self {
            Statement::Assign { slot: target, .. } => *target == slot,
            Statement::If { then_branch, else_branch, .. } => {
                then_branch.iter().chain(else_branch.iter()).any(|s| s.stores(slot))
            }
            _ => false,
        }
    }

    /// Whether `slot` is stored to on some but not necessarily all paths through
    /// this statement. A two-way branch storing the slot once on each side is an
    /// unconditional store (see [`Statement::conditional_store`]).
    pub fn assigns_conditionally(&self, slot: SlotId) -> bool {
        match self {
            Statement::If { .. } if self.conditional_store().map(|(s, _)| s) == Some(slot) => false,
            Statement::If { .. } => self.stores(slot),
            _ => false,
        }
    }

    /// `if (c) s = a; else s = b;` as the single store `s = select(c, a, b)`.
    pub fn conditional_store(&self) -> Option<(SlotId, Expr)> {
        let Statement::If { cond, then_branch, else_branch } = self else {
            return None;
        };
        match (then_branch.as_slice(), else_branch.as_slice()) {
            (
                [Statement::Assign { slot, value: then_value }],
                [Statement::Assign { slot: other, value: else_value }],
            ) if slot == other => Some((
                *slot,
                Expr::select(cond.clone(), then_value.clone(), else_value.clone()),
            )),
            _ => None,
        }
    }

    /// Whether a delegation call occurs nested inside this statement.
    pub fn contains_nested_delegation(&self) -> bool {
        match self {
            Statement::If { then_branch, else_branch, .. } => then_branch
                .iter()
                .chain(else_branch.iter())
                .any(|s| matches!(s, Statement::Delegate(_)) || s.contains_nested_delegation()),
            _ => false,
        }
    }

    /// Apply `f` to every expression of this statement, recursing into branches.
    pub fn map_expressions(self, f: &mut impl FnMut(Expr) -> Expr) -> Statement {
        match self {
            Statement::Assign { slot, value } => Statement::Assign { slot, value: f(value) },
            Statement::Delegate(DelegationCall { target, args }) => {
                Statement::Delegate(DelegationCall {
                    target,
                    args: args.into_iter().map(|a| f(a)).collect(),
                })
            }
            Statement::Eval(expr) => Statement::Eval(f(expr)),
            Statement::If { cond, then_branch, else_branch } => Statement::If {
                cond: f(cond),
                then_branch: then_branch.into_iter().map(|s| s.map_expressions(f)).collect(),
                else_branch: else_branch.into_iter().map(|s| s.map_expressions(f)).collect(),
            },
            Statement::Throw(expr) => Statement::Throw(f(expr)),
        }
    }
}
