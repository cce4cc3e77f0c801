// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Equivalence of candidate initializers across delegation entry points.
//!
//! Parameters are compared by logical role (position and declared type), not by
//! name, so `C(Guid id)` and `C(Guid other)` storing their first argument agree.
//! How deep compound expressions are compared is a policy decision, so it sits
//! behind [`ExprEquivalence`].

use crate::model::{Expr, Parameter};

/// An expression together with the parameter list its `Param` nodes refer to.
#[derive(Debug, Clone, Copy)]
pub struct ExprSite<'a> {
    pub expr: &'a Expr,
    pub parameters: &'a [Parameter],
}

pub trait ExprEquivalence: Send + Sync {
    fn equivalent(&self, lhs: ExprSite<'_>, rhs: ExprSite<'_>) -> bool;
}

/// Structural equality up to parameter renaming. Trees deeper than `max_depth`
/// compare as not equivalent.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralEquivalence {
    pub max_depth: Option<usize>,
}

impl StructuralEquivalence {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self { max_depth }
    }

    fn compare(&self, lhs: ExprSite<'_>, rhs: ExprSite<'_>, depth: usize) -> bool {
        if self.max_depth.map_or(false, |max| depth > max) {
            return false;
        }
        match (lhs.expr, rhs.expr) {
            (Expr::Param(a), Expr::Param(b)) => {
                a == b
                    && match (lhs.parameters.get(*a), rhs.parameters.get(*b)) {
                        (Some(pa), Some(pb)) => pa.ty == pb.ty && pa.passing == pb.passing,
                        _ => false,
                    }
            }
            (Expr::Literal(a), Expr::Literal(b)) => a == b,
            (Expr::This, Expr::This) => true,
            (Expr::Member(a), Expr::Member(b)) => a == b,
            (a, b) => {
                if !same_node(a, b) {
                    return false;
                }
                let (lc, rc) = (a.children(), b.children());
                lc.len() == rc.len()
                    && lc.into_iter().zip(rc).all(|(l, r)| {
                        self.compare(
                            ExprSite { expr: l, parameters: lhs.parameters },
                            ExprSite { expr: r, parameters: rhs.parameters },
                            depth + 1,
                        )
                    })
            }
        }
    }
}

impl ExprEquivalence for StructuralEquivalence {
    fn equivalent(&self, lhs: ExprSite<'_>, rhs: ExprSite<'_>) -> bool {
        self.compare(lhs, rhs, 0)
    }
}

/// Compare the non-expression payload of two nodes.
fn same_node(a: &Expr, b: &Expr) -> bool {
    match (a, b) {
        (
            Expr::Field { name: n1, non_null: v1, .. },
            Expr::Field { name: n2, non_null: v2, .. },
        ) => n1 == n2 && v1 == v2,
        (
            Expr::ConditionalAccess { member: m1, .. },
            Expr::ConditionalAccess { member: m2, .. },
        ) => m1 == m2,
        (
            Expr::Call { callee: c1, receiver: r1, .. },
            Expr::Call { callee: c2, receiver: r2, .. },
        ) => c1 == c2 && r1.is_some() == r2.is_some(),
        (Expr::New { ty: t1, .. }, Expr::New { ty: t2, .. }) => t1 == t2,
        (Expr::Binary { op: o1, .. }, Expr::Binary { op: o2, .. }) => o1 == o2,
        (Expr::Unary { op: o1, .. }, Expr::Unary { op: o2, .. }) => o1 == o2,
        (Expr::Convert { ty: t1, .. }, Expr::Convert { ty: t2, .. }) => t1 == t2,
        (Expr::Select { .. }, Expr::Select { .. })
        | (Expr::Conditional { .. }, Expr::Conditional { .. })
        | (Expr::Coalesce { .. }, Expr::Coalesce { .. })
        | (Expr::Throw(_), Expr::Throw(_)) => true,
        _ => false,
    }
}
