// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Expression shape inference
//!
//! Rewrites the front end's value-level branches into the canonical source shapes.
//! The condition and both operands are carried through exactly as found: a branch
//! is never swapped and a condition is never negated to reach a preferred form.

use log::debug;

use crate::{
    effects::is_duplicable,
    model::{BinOp, CompiledType, Expr, Literal, Statement},
    options::ReconstructionOptions,
    pipeline::{TypeData, TypeProcessor},
};

/// Closed set of shapes a value-level branch can take.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectShape {
    /// `value ?? fallback`
    Coalesce { value: Expr, fallback: Expr },
    /// `target?.member`, or `target?.member ?? fallback`
    ConditionalAccess {
        target: Expr,
        member: String,
        fallback: Option<Expr>,
    },
    /// `cond ? when_true : when_false`
    Conditional {
        cond: Expr,
        when_true: Expr,
        when_false: Expr,
    },
}

impl SelectShape {
    pub fn into_expr(self) -> Expr {
        match self {
            SelectShape::Coalesce { value, fallback } => Expr::Coalesce {
                value: Box::new(value),
                fallback: Box::new(fallback),
            },
            SelectShape::ConditionalAccess { target, member, fallback } => {
                let access = Expr::ConditionalAccess { target: Box::new(target), member };
                match fallback {
                    Some(fallback) => Expr::Coalesce {
                        value: Box::new(access),
                        fallback: Box::new(fallback),
                    },
                    None => access,
                }
            }
            SelectShape::Conditional { cond, when_true, when_false } => {
                Expr::conditional(cond, when_true, when_false)
            }
        }
    }
}

/// The value compared against null by `cond`, and whether the test is `!=`.
fn null_test(cond: &Expr) -> Option<(&Expr, bool)> {
    let Expr::Binary { op, lhs, rhs } = cond else {
        return None;
    };
    let non_null = match op {
        BinOp::Ne => true,
        BinOp::Eq => false,
        _ => return None,
    };
    match (lhs.as_literal(), rhs.as_literal()) {
        (_, Some(Literal::Null)) => Some((&**lhs, non_null)),
        (Some(Literal::Null), _) => Some((&**rhs, non_null)),
        _ => None,
    }
}

fn coalesce(cond: &Expr, then_value: &Expr, else_value: &Expr) -> Option<SelectShape> {
    let (value, non_null) = null_test(cond)?;
    let (kept, fallback) = if non_null {
        (then_value, else_value)
    } else {
        (else_value, then_value)
    };
    if kept != value || !is_duplicable(value) || fallback.count_occurrences(value) > 1 {
        return None;
    }
    Some(SelectShape::Coalesce { value: value.clone(), fallback: fallback.clone() })
}

fn conditional_access(cond: &Expr, then_value: &Expr, else_value: &Expr) -> Option<SelectShape> {
    let (value, non_null) = null_test(cond)?;
    let (access, fallback) = if non_null {
        (then_value, else_value)
    } else {
        (else_value, then_value)
    };
    let Expr::Field { target, name, non_null: member_non_null } = access else {
        return None;
    };
    if &**target != value || !is_duplicable(value) {
        return None;
    }
    if fallback.as_literal() == Some(&Literal::Null) {
        return Some(SelectShape::ConditionalAccess {
            target: value.clone(),
            member: name.clone(),
            fallback: None,
        });
    }
    // `x?.M ?? F` also takes the fallback when `x.M` itself is null.
    if !*member_non_null || fallback.count_occurrences(value) > 1 {
        return None;
    }
    Some(SelectShape::ConditionalAccess {
        target: value.clone(),
        member: name.clone(),
        fallback: Some(fallback.clone()),
    })
}

pub fn classify_select(
    cond: Expr,
    then_value: Expr,
    else_value: Expr,
    options: &ReconstructionOptions,
) -> SelectShape {
    let shaped = options
        .infer_null_coalescing
        .then(|| coalesce(&cond, &then_value, &else_value))
        .flatten()
        .or_else(|| {
            options
                .infer_conditional_access
                .then(|| conditional_access(&cond, &then_value, &else_value))
                .flatten()
        });
    shaped.unwrap_or(SelectShape::Conditional {
        cond,
        when_true: then_value,
        when_false: else_value,
    })
}

/// Rewrites every value-level branch in `expr`, innermost first.
pub fn infer_shapes(expr: Expr, options: &ReconstructionOptions) -> Expr {
    expr.rewrite_bottom_up(&mut |e| match e {
        Expr::Select { cond, then_value, else_value } => {
            classify_select(*cond, *then_value, *else_value, options).into_expr()
        }
        other => other,
    })
}

fn into_block(branch: Result<[Statement; 1], Vec<Statement>>) -> Vec<Statement> {
    match branch {
        Ok(single) => single.into(),
        Err(block) => block,
    }
}

/// Shapes the expressions of `stmt`, and turns a two-way branch storing the same
/// slot on both sides into one store of a shaped value.
pub fn shape_statement(stmt: Statement, options: &ReconstructionOptions) -> Statement {
    let Statement::If { cond, then_branch, else_branch } = stmt else {
        return stmt.map_expressions(&mut |e| infer_shapes(e, options));
    };
    let cond = infer_shapes(cond, options);
    let then_branch = shape_block(then_branch, options);
    let else_branch = shape_block(else_branch, options);

    match (<[Statement; 1]>::try_from(then_branch), <[Statement; 1]>::try_from(else_branch)) {
        (
            Ok([Statement::Assign { slot, value: then_value }]),
            Ok([Statement::Assign { slot: other, value: else_value }]),
        ) if slot == other => Statement::Assign {
            slot,
            value: classify_select(cond, then_value, else_value, options).into_expr(),
        },
        (then_branch, else_branch) => Statement::If {
            cond,
            then_branch: into_block(then_branch),
            else_branch: into_block(else_branch),
        },
    }
}

pub fn shape_block(block: Vec<Statement>, options: &ReconstructionOptions) -> Vec<Statement> {
    block.into_iter().map(|s| shape_statement(s, options)).collect()
}

pub fn shape_type(ty: &mut CompiledType, options: &ReconstructionOptions) {
    for slot in &mut ty.slots {
        if let Some(value) = slot.initializer.take() {
            slot.initializer = Some(infer_shapes(value, options));
        }
    }
    for ctor in &mut ty.constructors {
        let body = std::mem::take(&mut ctor.body);
        ctor.body = shape_block(body, options);
    }
}

/// Stage 5: canonical expression shapes for initializers and remaining bodies.
pub struct ExpressionShapeProcessor();

impl ExpressionShapeProcessor {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

impl TypeProcessor for ExpressionShapeProcessor {
    fn process(&self, mut data: TypeData, options: &ReconstructionOptions) -> TypeData {
        shape_type(&mut data.ty, options);
        debug!("{}: expression shapes inferred", data.ty.name);
        data
    }

    fn name(&self) -> String {
        "expression_shapes".to_string()
    }
}
