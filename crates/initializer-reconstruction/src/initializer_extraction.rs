// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Initializer extraction
//!
//! Decides which member stores can move to declaration-site initializers.
//!
//! Only the delegation entry points (chain roots) run initializers, and they run them
//! before the base constructor call. The candidate region of a root is therefore the
//! statements before its `base(...)` call, or its whole body when it has none (value
//! layout). Scanning a region stops at the first statement that is not a single store
//! to a slot without an initializer.
//!
//! A slot is hoisted when:
//! 1. every root stores it in its candidate region, exactly once;
//! 2. all those stores are equivalent under the configured predicate;
//! 3. no constructor body assigns it inside a branch;
//! 4. its expression does not let `this` escape and reads only members declared
//!    before it that are hoisted ahead of it or already initialized;
//! 5. nothing that stays imperative precedes it in any root;
//! 6. it commutes with every initializer declared after it that would now run
//!    before it: a hoisted store earlier in the same root, or an initializer the
//!    type already carries. Initializers run in declaration order, so these two
//!    evaluations swap.
//!
//! Rules 4 to 6 depend on the hoisted set itself and are iterated to a fixpoint.
//!
//! Stores reading constructor parameters can only become initializers of a primary
//! constructor. Two plans are computed, one allowing them and one treating them as
//! barriers; the primary constructor stage applies the matching one.

use itertools::Itertools;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    constructor_chain::ConstructorChain,
    effects::ExprInfo,
    equivalence::{ExprEquivalence, ExprSite},
    error::{AmbiguityReason, ReconstructionError},
    model::{CompiledType, CtorId, Expr, SlotId, Statement},
    options::ReconstructionOptions,
    pipeline::{TypeData, TypeProcessor},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateInitializer {
    pub slot: SlotId,
    pub ctor: CtorId,
    /// Statement index in the constructor body.
    pub index: usize,
    pub value: Expr,
    pub info: ExprInfo,
}

/// Slots to turn into initializers and the statements that go away with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoistPlan {
    pub hoisted: BTreeMap<SlotId, Expr>,
    pub removals: BTreeMap<CtorId, BTreeSet<usize>>,
}

impl HoistPlan {
    /// Statements of `ctor` that stay in its body under this plan.
    pub fn remaining<'a>(
        &'a self,
        ty: &'a CompiledType,
        ctor: CtorId,
    ) -> impl Iterator<Item = &'a Statement> + 'a {
        let removed = self.removals.get(&ctor);
        ty.constructor(ctor)
            .body
            .iter()
            .enumerate()
            .filter(move |(i, _)| removed.map_or(true, |r| !r.contains(i)))
            .map(|(_, s)| s)
    }

    pub fn reads_parameters(&self) -> bool {
        self.hoisted.values().any(|v| ExprInfo::of(v).reads_parameters())
    }

    /// Move the hoisted stores into initializers.
    pub fn apply(&self, ty: &mut CompiledType) {
        for (slot, value) in &self.hoisted {
            ty.slot_mut(*slot).initializer = Some(value.clone());
        }
        for (ctor, removed) in &self.removals {
            let body = std::mem::take(&mut ty.constructor_mut(*ctor).body);
            ty.constructor_mut(*ctor).body = body
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !removed.contains(i))
                .map(|(_, s)| s)
                .collect();
        }
    }
}

/// Annotation produced by [`InitializerExtractionProcessor`].
#[derive(Debug, Clone, Default)]
pub struct InitializerExtraction {
    /// Candidates per root, in statement order.
    pub candidates: BTreeMap<CtorId, Vec<CandidateInitializer>>,
    pub with_primary: HoistPlan,
    pub without_primary: HoistPlan,
    pub ambiguities: Vec<(SlotId, AmbiguityReason)>,
}

pub fn extract_initializers(
    ty: &CompiledType,
    chain: &ConstructorChain,
    equivalence: &dyn ExprEquivalence,
) -> InitializerExtraction {
    let roots = chain.roots();
    let candidates: BTreeMap<CtorId, Vec<CandidateInitializer>> = roots
        .iter()
        .map(|&root| (root, candidate_region(ty, root)))
        .collect();

    let blocked = conditionally_assigned(ty, chain);
    let (agreed, ambiguities) = agree_across_roots(ty, roots, &candidates, &blocked, equivalence);

    let existing: BTreeMap<SlotId, ExprInfo> = ty
        .slot_ids()
        .filter_map(|slot| ty.slot(slot).initializer.as_ref().map(|v| (slot, ExprInfo::of(v))))
        .collect();
    let with_primary = settle(&candidates, roots, &agreed, &existing, true);
    let without_primary = settle(&candidates, roots, &agreed, &existing, false);
    debug!(
        "{}: hoistable {:?} (without primary {:?})",
        ty.name,
        with_primary.hoisted.keys().collect_vec(),
        without_primary.hoisted.keys().collect_vec()
    );

    InitializerExtraction { candidates, with_primary, without_primary, ambiguities }
}

/// Leading run of single stores before the root's delegation call.
fn candidate_region(ty: &CompiledType, root: CtorId) -> Vec<CandidateInitializer> {
    let ctor = ty.constructor(root);
    let end = ctor.delegation().map_or(ctor.body.len(), |(index, _)| index);
    let region = &ctor.body[..end];
    let store_counts = ty
        .slot_ids()
        .map(|slot| (slot, region.iter().filter(|s| s.stores(slot)).count()))
        .collect::<BTreeMap<_, _>>();

    let mut result = vec![];
    for (index, stmt) in region.iter().enumerate() {
        let (slot, value) = match stmt {
            Statement::Assign { slot, value } => (*slot, value.clone()),
            _ => match stmt.conditional_store() {
                Some(store) => store,
                None => break,
            },
        };
        let stored_once = store_counts.get(&slot).map_or(true, |count| *count <= 1);
        if ty.slot(slot).initializer.is_some() || !stored_once {
            break;
        }
        result.push(CandidateInitializer {
            slot,
            ctor: root,
            index,
            info: ExprInfo::of(&value),
            value,
        });
    }
    result
}

/// Slots some participating constructor assigns inside a branch.
fn conditionally_assigned(ty: &CompiledType, chain: &ConstructorChain) -> BTreeMap<SlotId, CtorId> {
    let mut blocked = BTreeMap::new();
    for &ctor in chain.topological_order() {
        for slot in ty.slot_ids() {
            if ty.constructor(ctor).body.iter().any(|s| s.assigns_conditionally(slot)) {
                blocked.entry(slot).or_insert(ctor);
            }
        }
    }
    blocked
}

fn agree_across_roots(
    ty: &CompiledType,
    roots: &[CtorId],
    candidates: &BTreeMap<CtorId, Vec<CandidateInitializer>>,
    blocked: &BTreeMap<SlotId, CtorId>,
    equivalence: &dyn ExprEquivalence,
) -> (BTreeSet<SlotId>, Vec<(SlotId, AmbiguityReason)>) {
    let mut agreed = BTreeSet::new();
    let mut ambiguities = vec![];

    let candidate_slots: BTreeSet<SlotId> = candidates
        .values()
        .flat_map(|cands| cands.iter().map(|c| c.slot))
        .collect();

    'slots: for slot in candidate_slots {
        if let Some(&ctor) = blocked.get(&slot) {
            ambiguities.push((slot, AmbiguityReason::ConditionalAssignment(ctor)));
            continue;
        }
        let mut first: Option<&CandidateInitializer> = None;
        for &root in roots {
            let Some(candidate) = candidates[&root].iter().find(|c| c.slot == slot) else {
                ambiguities.push((slot, AmbiguityReason::MissingAtEntryPoint(root)));
                continue 'slots;
            };
            match first {
                None => first = Some(candidate),
                Some(reference) => {
                    let lhs = ExprSite {
                        expr: &reference.value,
                        parameters: &ty.constructor(reference.ctor).parameters,
                    };
                    let rhs = ExprSite {
                        expr: &candidate.value,
                        parameters: &ty.constructor(root).parameters,
                    };
                    if !equivalence.equivalent(lhs, rhs) {
                        ambiguities.push((slot, AmbiguityReason::ConflictingCandidates));
                        continue 'slots;
                    }
                }
            }
        }
        agreed.insert(slot);
    }
    (agreed, ambiguities)
}

/// Whether the initializers of `a` and `b` may run in either order.
fn commutes((a, a_info): (SlotId, &ExprInfo), (b, b_info): (SlotId, &ExprInfo)) -> bool {
    !(a_info.is_observable() && b_info.is_observable())
        && !a_info.reads_this
        && !b_info.reads_this
        && !a_info.members.contains(&b)
        && !b_info.members.contains(&a)
}

/// Shrink the agreed set until every root hoists a clean prefix of its candidates,
/// and build the plan. `existing` holds the initializers the type already has.
fn settle(
    candidates: &BTreeMap<CtorId, Vec<CandidateInitializer>>,
    roots: &[CtorId],
    agreed: &BTreeSet<SlotId>,
    existing: &BTreeMap<SlotId, ExprInfo>,
    allow_parameters: bool,
) -> HoistPlan {
    let mut hoisted: BTreeSet<SlotId> = agreed
        .iter()
        .copied()
        .filter(|slot| {
            allow_parameters
                || candidates
                    .values()
                    .flatten()
                    .filter(|c| c.slot == *slot)
                    .all(|c| !c.info.reads_parameters())
        })
        .collect();

    loop {
        let mut changed = false;
        for root in roots {
            let mut prefix: BTreeMap<SlotId, &ExprInfo> = BTreeMap::new();
            let mut stopped = false;
            for candidate in &candidates[root] {
                let slot = candidate.slot;
                let current = (slot, &candidate.info);
                let clean = !stopped
                    && hoisted.contains(&slot)
                    && !candidate.info.reads_this
                    && candidate.info.members.iter().all(|m| {
                        *m < slot && (prefix.contains_key(m) || existing.contains_key(m))
                    })
                    && prefix
                        .iter()
                        .map(|(s, info)| (*s, *info))
                        .chain(existing.iter().map(|(s, info)| (*s, info)))
                        .filter(|(later, _)| *later > slot)
                        .all(|later| commutes(later, current));
                if clean {
                    prefix.insert(slot, &candidate.info);
                } else {
                    stopped = true;
                    changed |= hoisted.remove(&slot);
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut plan = HoistPlan::default();
    for root in roots {
        for candidate in candidates[root].iter().filter(|c| hoisted.contains(&c.slot)) {
            plan.hoisted.entry(candidate.slot).or_insert_with(|| candidate.value.clone());
            plan.removals.entry(*root).or_default().insert(candidate.index);
        }
    }
    plan
}

/// Stage 2: attaches [`InitializerExtraction`] and reports slots left imperative
/// because their candidates disagree.
pub struct InitializerExtractionProcessor();

impl InitializerExtractionProcessor {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

impl TypeProcessor for InitializerExtractionProcessor {
    fn process(&self, mut data: TypeData, options: &ReconstructionOptions) -> TypeData {
        let Some(chain) = data.annotations.get::<ConstructorChain>() else {
            return data;
        };
        let extraction = extract_initializers(&data.ty, chain, &options.equivalence());
        for (slot, reason) in &extraction.ambiguities {
            let err = ReconstructionError::AmbiguousInitializer {
                type_name: data.ty.name.clone(),
                slot: data.ty.slot(*slot).name.clone(),
                reason: reason.clone(),
            };
            debug!("{}", err);
            data.diagnostics.push(err);
        }
        data.annotations.set(extraction);
        data
    }

    fn name(&self) -> String {
        "initializer_extraction".to_string()
    }
}
