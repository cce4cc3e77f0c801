// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Aggregate classification
//!
//! Picks the syntax family of a type from its compiler-synthesized members and its
//! layout, and decides whether a parameterless constructor can be left to the
//! language to supply.

use itertools::Itertools;
use log::debug;

use crate::{
    constructor_chain::ConstructorChain,
    effects::is_zero_value,
    initializer_extraction::{HoistPlan, InitializerExtraction},
    model::{
        Accessibility, AggregateKind, CompiledType, ConstructorForm, ConstructorOrigin, CtorId,
        DelegationCall, DelegationTarget, Layout, SlotId, Statement,
    },
    options::ReconstructionOptions,
    pipeline::{TypeData, TypeProcessor},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateClassification {
    pub kind: AggregateKind,
    /// Compiler copy constructor, when the type has one.
    pub copy_constructor: Option<CtorId>,
    /// Parameterless constructor the renderer omits.
    pub elided_default: Option<CtorId>,
    /// Zero-valued initializers hoisted by this run are redundant with implicit
    /// zeroing and are dropped.
    pub drop_zero_initializers: bool,
}

/// Slot order shared by equality, hashing, deconstruction and copying, if these
/// members exist and agree on one.
pub fn canonical_member_order(ty: &CompiledType) -> Option<Vec<SlotId>> {
    let equality = ty.synthesized.equality.as_ref()?;
    let hash_code = ty.synthesized.hash_code.as_ref()?;
    let deconstruct = ty.synthesized.deconstruct.as_ref()?;

    let increasing = |slots: &[SlotId]| slots.iter().tuple_windows().all(|(a, b)| a < b);
    if equality != hash_code
        || !increasing(equality.as_slice())
        || !increasing(deconstruct.as_slice())
    {
        return None;
    }
    if !deconstruct.iter().all(|slot| equality.contains(slot)) {
        return None;
    }
    if !ty.is_value_layout() {
        let copied = copy_constructor(ty).map(|id| {
            ty.constructor(id)
                .body
                .iter()
                .filter_map(Statement::assigned_slot)
                .collect_vec()
        })?;
        if &copied != equality {
            return None;
        }
    }
    Some(equality.clone())
}

/// The compiler copy constructor: a single parameter of the type itself.
pub fn copy_constructor(ty: &CompiledType) -> Option<CtorId> {
    ty.constructor_ids().find(|id| {
        let ctor = ty.constructor(*id);
        ctor.origin == ConstructorOrigin::CopyConstructor
            && matches!(ctor.parameters.as_slice(), [p] if p.ty.name() == ty.name)
    })
}

pub fn classify(ty: &CompiledType) -> AggregateKind {
    match (canonical_member_order(ty), ty.layout) {
        (Some(_), layout) => AggregateKind::ValueSemanticAggregate { layout },
        (None, Layout::ByValue) => AggregateKind::ValueType,
        (None, Layout::ByReference) => AggregateKind::ReferenceAggregate,
    }
}

/// Whether what is left of `ctor` under `plan` is what the implicit parameterless
/// constructor would do anyway.
fn is_trivial_remainder(ty: &CompiledType, ctor: CtorId, plan: &HoistPlan) -> bool {
    let remaining = plan.remaining(ty, ctor).collect_vec();
    if ty.is_value_layout() {
        return remaining.is_empty();
    }
    matches!(
        remaining.as_slice(),
        [Statement::Delegate(DelegationCall { target: DelegationTarget::Base, args })]
            if args.is_empty()
    )
}

fn elision(
    ty: &CompiledType,
    chain: &ConstructorChain,
    plan: &HoistPlan,
) -> (Option<CtorId>, bool) {
    let Some(root) = chain.root() else {
        return (None, false);
    };
    let ctor = ty.constructor(root);
    if !ctor.parameters.is_empty()
        || ctor.accessibility != Accessibility::Public
        || !is_trivial_remainder(ty, root, plan)
    {
        return (None, false);
    }
    let sole = chain.topological_order().len() == 1;
    if !ty.is_value_layout() {
        return (sole.then_some(root), false);
    }

    // Authored non-default values are observable through `new S()`.
    let zero_or_none = ty.slot_ids().all(|slot| {
        match plan.hoisted.get(&slot).or(ty.slot(slot).initializer.as_ref()) {
            None => true,
            Some(value) => is_zero_value(value),
        }
    });
    if zero_or_none {
        (Some(root), sole)
    } else {
        (None, false)
    }
}

pub fn classify_aggregate(
    ty: &CompiledType,
    chain: &ConstructorChain,
    extraction: &InitializerExtraction,
    options: &ReconstructionOptions,
) -> AggregateClassification {
    let kind = classify(ty);
    let (elided_default, drop_zero_initializers) = if options.elide_default_constructors {
        elision(ty, chain, &extraction.without_primary)
    } else {
        (None, false)
    };
    AggregateClassification {
        kind,
        copy_constructor: copy_constructor(ty),
        elided_default,
        drop_zero_initializers,
    }
}

/// Stage 3: tags the type with its [`AggregateKind`] and marks constructors the
/// renderer omits.
pub struct AggregateClassificationProcessor();

impl AggregateClassificationProcessor {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

impl TypeProcessor for AggregateClassificationProcessor {
    fn process(&self, mut data: TypeData, options: &ReconstructionOptions) -> TypeData {
        let (Some(chain), Some(extraction)) = (
            data.annotations.get::<ConstructorChain>(),
            data.annotations.get::<InitializerExtraction>(),
        ) else {
            return data;
        };
        let classification = classify_aggregate(&data.ty, chain, extraction, options);
        debug!(
            "{}: {:?}, elided default {:?}",
            data.ty.name, classification.kind, classification.elided_default
        );

        data.ty.aggregate_kind = Some(classification.kind);
        if options.elide_default_constructors {
            for id in data.ty.constructor_ids().collect_vec() {
                let ctor = data.ty.constructor_mut(id);
                if ctor.form == ConstructorForm::Elided && ctor.is_declared() {
                    ctor.form = ConstructorForm::Explicit;
                }
            }
        }
        if let Some(id) = classification.elided_default {
            data.ty.constructor_mut(id).form = ConstructorForm::Elided;
        }
        if let (AggregateKind::ValueSemanticAggregate { .. }, Some(id)) =
            (classification.kind, classification.copy_constructor)
        {
            data.ty.constructor_mut(id).form = ConstructorForm::Elided;
        }
        data.annotations.set(classification);
        data
    }

    fn name(&self) -> String {
        "aggregate_classification".to_string()
    }
}
