// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Primary constructor synthesis
//!
//! Moves the root constructor's parameter list to the type declaration. The root
//! must be left with nothing but its base call once its stores are hoisted, and
//! every other constructor must reduce to a single `this(...)` call that becomes a
//! forwarding overload. Any constructor that cannot be expressed that way rejects
//! synthesis for the whole type, which then keeps all constructors explicit.
//!
//! This stage also applies the hoist plan matching its decision.

use itertools::Itertools;
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::{
    aggregate_classification::AggregateClassification,
    constructor_chain::ConstructorChain,
    effects::{is_zero_value, ExprInfo},
    error::{ReconstructionError, RejectionReason},
    initializer_extraction::{HoistPlan, InitializerExtraction},
    model::{
        AggregateKind, CompiledType, ConstructorForm, CtorId, DelegationCall, DelegationTarget,
        Expr, SlotDisposition, SlotKind, Statement,
    },
    options::ReconstructionOptions,
    pipeline::{TypeData, TypeProcessor},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisDecision {
    Synthesized {
        root: CtorId,
        /// Final form of every other participating constructor.
        overloads: BTreeMap<CtorId, ConstructorForm>,
    },
    NotApplicable,
    Rejected(RejectionReason),
}

/// Arguments that observe the instance, through `this` or through a member.
fn reads_instance(args: &[Expr]) -> bool {
    args.iter().map(ExprInfo::of).any(|info| info.reads_this || !info.members.is_empty())
}

/// A value-layout type storing its parameters only counts as primary when the
/// constructors forward into a root or the type has value semantics.
fn has_value_layout_evidence(
    ty: &CompiledType,
    chain: &ConstructorChain,
    roots: &[CtorId],
    kind: Option<AggregateKind>,
) -> bool {
    !ty.is_value_layout()
        || roots.iter().any(|root| !chain.delegates_of(*root).is_empty())
        || matches!(kind, Some(AggregateKind::ValueSemanticAggregate { .. }))
}

/// Whether the type shows that its root's parameters were authored at the
/// declaration site.
fn has_primary_evidence(
    ty: &CompiledType,
    chain: &ConstructorChain,
    root: CtorId,
    plan: &HoistPlan,
    kind: Option<AggregateKind>,
) -> bool {
    let already_primary = ty.constructor(root).form == ConstructorForm::Primary;
    let reads_parameters = plan.reads_parameters()
        || ty
            .slots
            .iter()
            .filter_map(|s| s.initializer.as_ref())
            .any(|v| ExprInfo::of(v).reads_parameters());
    if !(already_primary || reads_parameters) {
        return false;
    }
    // A struct constructor storing its parameters looks the same either way.
    already_primary || has_value_layout_evidence(ty, chain, &[root], kind)
}

fn check_root(ty: &CompiledType, root: CtorId, plan: &HoistPlan) -> Result<(), RejectionReason> {
    let remaining = plan.remaining(ty, root).collect_vec();
    let ok = match remaining.as_slice() {
        [] => ty.is_value_layout(),
        [Statement::Delegate(DelegationCall { target: DelegationTarget::Base, args })] => {
            !ty.is_value_layout() && !reads_instance(args)
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(RejectionReason::RootRetainsLogic)
    }
}

fn overload_form(
    ty: &CompiledType,
    id: CtorId,
    options: &ReconstructionOptions,
) -> Result<ConstructorForm, RejectionReason> {
    let ctor = ty.constructor(id);
    let Some((index, call)) = ctor.delegation() else {
        return Err(RejectionReason::OverloadHasBody(id));
    };
    let DelegationTarget::This(target) = call.target else {
        return Err(RejectionReason::OverloadHasBody(id));
    };
    let form = if ctor.body.len() == 1 {
        ConstructorForm::Forwarding
    } else if options.keep_bodied_overloads && index == 0 {
        ConstructorForm::Explicit
    } else {
        return Err(RejectionReason::OverloadHasBody(id));
    };
    if call.args.len() != ty.constructor(target).parameters.len() {
        return Err(RejectionReason::OverloadArityMismatch(id));
    }
    if reads_instance(&call.args) {
        return Err(RejectionReason::OverloadReadsInstance(id));
    }
    Ok(form)
}

pub fn decide_synthesis(
    ty: &CompiledType,
    chain: &ConstructorChain,
    extraction: &InitializerExtraction,
    kind: Option<AggregateKind>,
    options: &ReconstructionOptions,
) -> SynthesisDecision {
    let Some(root) = chain.root() else {
        let reads_parameters = extraction
            .candidates
            .values()
            .flatten()
            .any(|c| c.info.reads_parameters());
        return if reads_parameters && has_value_layout_evidence(ty, chain, chain.roots(), kind) {
            SynthesisDecision::Rejected(RejectionReason::MultipleRoots)
        } else {
            SynthesisDecision::NotApplicable
        };
    };
    let plan = &extraction.with_primary;
    if ty.constructor(root).parameters.is_empty()
        || !has_primary_evidence(ty, chain, root, plan, kind)
    {
        return SynthesisDecision::NotApplicable;
    }
    if let Err(reason) = check_root(ty, root, plan) {
        return SynthesisDecision::Rejected(reason);
    }

    let mut overloads = BTreeMap::new();
    for &id in chain.topological_order().iter().filter(|id| **id != root) {
        match overload_form(ty, id, options) {
            Ok(form) => {
                overloads.insert(id, form);
            }
            Err(reason) => return SynthesisDecision::Rejected(reason),
        }
    }
    SynthesisDecision::Synthesized { root, overloads }
}

/// Compiler-generated fields holding a parameter unchanged are the parameter's
/// captured state.
fn mark_captured_parameters(ty: &mut CompiledType) {
    for slot in &mut ty.slots {
        if slot.kind != SlotKind::Field || !slot.compiler_generated {
            continue;
        }
        if let Some(Expr::Param(index)) = slot.initializer {
            slot.disposition = SlotDisposition::CapturedParameter(index);
        }
    }
}

fn drop_zero_initializers(ty: &mut CompiledType, plan: &HoistPlan) {
    for (slot, value) in &plan.hoisted {
        if is_zero_value(value) {
            ty.slot_mut(*slot).initializer = None;
        }
    }
}

/// Stage 4: decides primary constructor synthesis, then applies the matching hoist
/// plan and constructor forms.
pub struct PrimaryConstructorProcessor();

impl PrimaryConstructorProcessor {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

impl TypeProcessor for PrimaryConstructorProcessor {
    fn process(&self, mut data: TypeData, options: &ReconstructionOptions) -> TypeData {
        let (Some(chain), Some(extraction), Some(classification)) = (
            data.annotations.get::<ConstructorChain>(),
            data.annotations.get::<InitializerExtraction>(),
            data.annotations.get::<AggregateClassification>(),
        ) else {
            return data;
        };
        let decision =
            decide_synthesis(&data.ty, chain, extraction, Some(classification.kind), options);
        debug!("{}: primary constructor {:?}", data.ty.name, decision);

        let plan = match &decision {
            SynthesisDecision::Synthesized { .. } => extraction.with_primary.clone(),
            _ => extraction.without_primary.clone(),
        };
        let drop_zero = classification.drop_zero_initializers;

        plan.apply(&mut data.ty);
        if drop_zero {
            drop_zero_initializers(&mut data.ty, &plan);
        }

        match &decision {
            SynthesisDecision::Synthesized { root, overloads } => {
                data.ty.constructor_mut(*root).form = ConstructorForm::Primary;
                data.ty.primary_constructor = Some(*root);
                for (id, form) in overloads {
                    data.ty.constructor_mut(*id).form = *form;
                }
                mark_captured_parameters(&mut data.ty);
            }
            SynthesisDecision::NotApplicable | SynthesisDecision::Rejected(_) => {
                data.ty.primary_constructor = None;
                for ctor in &mut data.ty.constructors {
                    if matches!(ctor.form, ConstructorForm::Primary | ConstructorForm::Forwarding) {
                        ctor.form = ConstructorForm::Explicit;
                    }
                }
                for slot in &mut data.ty.slots {
                    slot.disposition = SlotDisposition::Declared;
                }
            }
        }

        if let SynthesisDecision::Rejected(reason) = &decision {
            let err = ReconstructionError::SynthesisRejected {
                type_name: data.ty.name.clone(),
                reason: reason.clone(),
            };
            warn!("{}", err);
            data.diagnostics.push(err);
        }
        data.annotations.set(decision);
        data
    }

    fn name(&self) -> String {
        "primary_constructor".to_string()
    }
}
