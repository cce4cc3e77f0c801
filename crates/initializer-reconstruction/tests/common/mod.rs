// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use initializer_reconstruction::{
    effects::{is_zero_value, ExprInfo},
    model::{Accessibility, BinOp, Callee, Mutability},
    reconstruct_type, CompiledType, Expr, MemberSlot, Parameter, ReconstructedType,
    ReconstructionOptions, SlotId, Statement, TypeDump, TypeRef,
};
use simplelog::{Config, LevelFilter, TestLogger};
use std::collections::BTreeMap;

pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

pub fn param(name: &str, ty: &str) -> Parameter {
    Parameter::new(name, TypeRef::new(ty))
}

pub fn field(name: &str, ty: &str) -> MemberSlot {
    let mut slot = MemberSlot::field(name, TypeRef::new(ty));
    slot.accessibility = Accessibility::Private;
    slot
}

pub fn readonly_field(name: &str, ty: &str) -> MemberSlot {
    let mut slot = field(name, ty);
    slot.mutability = Mutability::Immutable;
    slot
}

pub fn property(name: &str, ty: &str, mutability: Mutability) -> MemberSlot {
    let mut slot = MemberSlot::property(name, TypeRef::new(ty));
    slot.mutability = mutability;
    slot
}

pub fn new_guid() -> Expr {
    Expr::call(Callee::new("Guid.NewGuid"), vec![])
}

pub fn ne_null(value: Expr) -> Expr {
    Expr::binary(BinOp::Ne, value, Expr::null())
}

pub fn eq_null(value: Expr) -> Expr {
    Expr::binary(BinOp::Eq, value, Expr::null())
}

pub fn reconstruct(ty: CompiledType) -> ReconstructedType {
    reconstruct_with(ty, &ReconstructionOptions::default())
}

pub fn reconstruct_with(ty: CompiledType, options: &ReconstructionOptions) -> ReconstructedType {
    init_logger();
    let result = reconstruct_type(ty.clone(), options);
    assert_preserves_evaluation(&ty, &result);
    result
}

pub fn dump(result: &ReconstructedType) -> String {
    TypeDump(&result.ty).to_string()
}

/// Feeds the output back in and checks nothing changes.
pub fn assert_idempotent(result: &ReconstructedType, options: &ReconstructionOptions) {
    let again = reconstruct_type(result.ty.clone(), options);
    assert_preserves_evaluation(&result.ty, &again);
    assert_eq!(again.ty, result.ty, "second run changed `{}`", result.ty.name);
}

/// Lowers both types back to imperative constructors (initializers first, in
/// declaration order, in every constructor that runs them) and checks each
/// constructor evaluates the same observable expressions in the same order and
/// stores the same values into every slot.
pub fn assert_preserves_evaluation(input: &CompiledType, result: &ReconstructedType) {
    let before = lowered(input);
    let after = lowered(&result.ty);
    for (index, (expected, actual)) in before.iter().zip(&after).enumerate() {
        assert_eq!(
            trace(actual),
            trace(expected),
            "constructor {} of `{}` evaluates differently",
            index,
            input.name
        );
    }
}

fn lowered(ty: &CompiledType) -> Vec<Vec<Statement>> {
    ty.constructors
        .iter()
        .map(|ctor| {
            let mut body = vec![];
            if ctor.is_declared() && ctor.delegation_target().is_none() {
                for (index, slot) in ty.slots.iter().enumerate() {
                    if let Some(value) = &slot.initializer {
                        body.push(Statement::assign(SlotId(index), value.clone()));
                    }
                }
            }
            body.extend(ctor.body.iter().cloned());
            body
        })
        .collect()
}

#[derive(Debug, PartialEq)]
struct Trace {
    observable: Vec<String>,
    /// Values stored per slot, flagged with whether the store follows the
    /// delegation call.
    stores: BTreeMap<SlotId, Vec<(bool, Expr)>>,
}

fn trace(body: &[Statement]) -> Trace {
    let mut observable = vec![];
    let mut stores: BTreeMap<SlotId, Vec<(bool, Expr)>> = BTreeMap::new();
    let mut delegated = false;
    for stmt in body.iter().cloned().map(canonical_statement) {
        match stmt {
            Statement::Assign { slot, value } => {
                if ExprInfo::of(&value).is_observable() {
                    observable.push(format!("{:?} = {:?}", slot, value));
                }
                stores.entry(slot).or_default().push((delegated, value));
            }
            Statement::Delegate(_) => {
                delegated = true;
                observable.push(format!("{:?}", stmt));
            }
            other => observable.push(format!("{:?}", other)),
        }
    }
    // Every slot starts out zeroed.
    for values in stores.values_mut() {
        if values.first().map_or(false, |(_, value)| is_zero_value(value)) {
            values.remove(0);
        }
    }
    stores.retain(|_, values| !values.is_empty());
    Trace { observable, stores }
}

fn canonical_statement(stmt: Statement) -> Statement {
    if let Some((slot, value)) = stmt.conditional_store() {
        return Statement::assign(slot, canonical(value));
    }
    match stmt {
        Statement::If { cond, then_branch, else_branch } => Statement::If {
            cond: canonical(cond),
            then_branch: then_branch.into_iter().map(canonical_statement).collect(),
            else_branch: else_branch.into_iter().map(canonical_statement).collect(),
        },
        other => other.map_expressions(&mut canonical),
    }
}

/// Rewrites the source shapes back into the branch form the front end produces.
fn canonical(expr: Expr) -> Expr {
    expr.rewrite_bottom_up(&mut |e| match e {
        Expr::Field { target, name, .. } => Expr::Field { target, name, non_null: false },
        Expr::Binary { op: op @ (BinOp::Eq | BinOp::Ne), lhs, rhs } if *lhs == Expr::null() => {
            Expr::Binary { op, lhs: rhs, rhs: lhs }
        }
        Expr::Conditional { cond, when_true, when_false } => null_test_first(Expr::Select {
            cond,
            then_value: when_true,
            else_value: when_false,
        }),
        Expr::Coalesce { value, fallback } => match *value {
            // `t?.m ?? f`, where `t?.m` was already rewritten below.
            Expr::Select { cond, then_value, else_value }
                if *else_value == Expr::null() && matches!(*then_value, Expr::Field { .. }) =>
            {
                Expr::Select { cond, then_value, else_value: fallback }
            }
            value => Expr::select(ne_null(value.clone()), value, *fallback),
        },
        Expr::ConditionalAccess { target, member } => Expr::select(
            ne_null((*target).clone()),
            Expr::field(*target, member),
            Expr::null(),
        ),
        select @ Expr::Select { .. } => null_test_first(select),
        other => other,
    })
}

/// `x == null ? a : b` as `x != null ? b : a`.
fn null_test_first(select: Expr) -> Expr {
    match select {
        Expr::Select { cond, then_value, else_value } => match *cond {
            Expr::Binary { op: BinOp::Eq, lhs, rhs } if *rhs == Expr::null() => Expr::Select {
                cond: Box::new(Expr::Binary { op: BinOp::Ne, lhs, rhs }),
                then_value: else_value,
                else_value: then_value,
            },
            cond => Expr::Select { cond: Box::new(cond), then_value, else_value },
        },
        other => other,
    }
}
