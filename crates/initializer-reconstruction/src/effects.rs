// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Read and effect analysis for expressions
//!
//! Hoisting and shape inference both need to know what an expression observes and
//! what it can do when evaluated:
//! 1. Which constructor parameters and member slots it reads
//! 2. Whether `this` escapes as a value
//! 3. Whether evaluation has side effects (impure calls, allocations, throws)
//! 4. Whether evaluation may raise an exception
//!
//! Calls are effectful unless the front end marked the callee pure.

use crate::model::{Expr, SlotId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExprInfo {
    pub parameters: BTreeSet<usize>,
    pub members: BTreeSet<SlotId>,
    pub reads_this: bool,
    pub side_effects: bool,
    pub may_throw: bool,
}

impl ExprInfo {
    pub fn of(expr: &Expr) -> Self {
        let mut info = ExprInfo::default();
        collect(expr, &mut info);
        info
    }

    pub fn reads_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// Evaluation can be observed: moving it relative to another observable
    /// evaluation changes behavior.
    pub fn is_observable(&self) -> bool {
        self.side_effects || self.may_throw
    }
}

fn collect(expr: &Expr, info: &mut ExprInfo) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Param(index) => {
            info.parameters.insert(*index);
        }
        Expr::This => info.reads_this = true,
        Expr::Member(slot) => {
            info.members.insert(*slot);
        }
        // Dereferencing another value throws on null.
        Expr::Field { .. } => info.may_throw = true,
        Expr::Call { callee, receiver, .. } => {
            if !callee.pure {
                info.side_effects = true;
                info.may_throw = true;
            } else if receiver.is_some() {
                info.may_throw = true;
            }
        }
        Expr::New { .. } => {
            info.side_effects = true;
            info.may_throw = true;
        }
        Expr::Binary { op, .. } => {
            if op.may_throw() {
                info.may_throw = true;
            }
        }
        Expr::Convert { .. } => info.may_throw = true,
        Expr::Throw(_) => {
            info.side_effects = true;
            info.may_throw = true;
        }
        Expr::Unary { .. }
        | Expr::Select { .. }
        | Expr::Conditional { .. }
        | Expr::Coalesce { .. }
        | Expr::ConditionalAccess { .. } => {}
    }

    for child in expr.children() {
        collect(child, info);
    }
}

/// Whether `expr` evaluates to the implicit zero value of its type.
pub fn is_zero_value(expr: &Expr) -> bool {
    expr.as_literal().map_or(false, |lit| lit.is_zero_value())
}

/// Whether `expr` can be evaluated twice with the same result and no extra effects.
pub fn is_duplicable(expr: &Expr) -> bool {
    let info = ExprInfo::of(expr);
    !info.side_effects && !info.reads_this
}
