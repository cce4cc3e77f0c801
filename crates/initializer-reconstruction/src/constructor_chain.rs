// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Constructor chain model
//!
//! Declared constructors form a directed graph through their `this(...)` calls. The
//! graph is stored with petgraph over constructor ids; an edge runs from the
//! delegation target to the delegating constructor, so a topological order starts
//! at the roots. Compiler-provided copy constructors never run initializers and are
//! left out of the graph.

use log::{debug, warn};
use petgraph::{
    algo::toposort,
    graph::{DiGraph, NodeIndex},
    Direction,
};
use std::collections::BTreeMap;

use crate::{
    error::{ChainDefect, ReconstructionError},
    model::{CompiledType, Constructor, ConstructorForm, CtorId, DelegationTarget, Statement},
    options::ReconstructionOptions,
    pipeline::{TypeData, TypeProcessor},
};

#[derive(Debug, Clone)]
pub struct ConstructorChain {
    graph: DiGraph<CtorId, ()>,
    nodes: BTreeMap<CtorId, NodeIndex>,
    roots: Vec<CtorId>,
    order: Vec<CtorId>,
}

impl ConstructorChain {
    pub fn build(ty: &CompiledType) -> Result<Self, ReconstructionError> {
        let malformed = |reason| ReconstructionError::MalformedChain {
            type_name: ty.name.clone(),
            reason,
        };

        let mut graph = DiGraph::new();
        let mut nodes = BTreeMap::new();
        for id in ty.constructor_ids().filter(|id| ty.constructor(*id).is_declared()) {
            nodes.insert(id, graph.add_node(id));
        }

        let mut roots = vec![];
        for (&id, &node) in &nodes {
            let ctor = ty.constructor(id);
            let delegations = ctor
                .body
                .iter()
                .filter(|s| matches!(s, Statement::Delegate(_)))
                .count();
            if delegations > 1 {
                return Err(malformed(ChainDefect::MultipleDelegations(id)));
            }
            if ctor.body.iter().any(Statement::contains_nested_delegation) {
                return Err(malformed(ChainDefect::NestedDelegation(id)));
            }
            match ctor.delegation().map(|(_, call)| call.target) {
                Some(DelegationTarget::This(target)) => {
                    if target == id {
                        return Err(malformed(ChainDefect::Cycle(id)));
                    }
                    if target.0 >= ty.constructors.len() {
                        return Err(malformed(ChainDefect::DanglingTarget { from: id, target }));
                    }
                    let Some(&target_node) = nodes.get(&target) else {
                        return Err(malformed(ChainDefect::NonParticipatingTarget {
                            from: id,
                            target,
                        }));
                    };
                    graph.add_edge(target_node, node, ());
                }
                Some(DelegationTarget::Base) | None => roots.push(id),
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| malformed(ChainDefect::Cycle(graph[cycle.node_id()])))?
            .into_iter()
            .map(|node| graph[node])
            .collect();

        Ok(Self { graph, nodes, roots, order })
    }

    /// The root, when the chain has exactly one.
    pub fn root(&self) -> Option<CtorId> {
        match self.roots.as_slice() {
            [root] => Some(*root),
            _ => None,
        }
    }

    /// Constructors that do not delegate to another constructor of the type. These
    /// are the delegation entry points that run declaration-site initializers.
    pub fn roots(&self) -> &[CtorId] {
        &self.roots
    }

    pub fn contains(&self, ctor: CtorId) -> bool {
        self.nodes.contains_key(&ctor)
    }

    /// Constructors delegating directly to `ctor`, in id order.
    pub fn delegates_of(&self, ctor: CtorId) -> Vec<CtorId> {
        let Some(&node) = self.nodes.get(&ctor) else {
            return vec![];
        };
        let mut result: Vec<CtorId> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        result.sort();
        result
    }

    /// Participating constructors, roots first.
    pub fn topological_order(&self) -> &[CtorId] {
        &self.order
    }
}

/// Stage 1: builds the [`ConstructorChain`] annotation. A type without declared
/// constructors first receives the implicit parameterless one the language would
/// supply.
pub struct ConstructorChainProcessor();

impl ConstructorChainProcessor {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

fn implicit_constructor(ty: &CompiledType) -> Constructor {
    let body = if ty.is_value_layout() { vec![] } else { vec![Statement::base(vec![])] };
    let mut ctor = Constructor::new(vec![], body);
    ctor.form = ConstructorForm::Elided;
    ctor
}

impl TypeProcessor for ConstructorChainProcessor {
    fn process(&self, mut data: TypeData, _options: &ReconstructionOptions) -> TypeData {
        if !data.ty.constructors.iter().any(Constructor::is_declared) {
            debug!("{}: synthesizing implicit constructor", data.ty.name);
            let ctor = implicit_constructor(&data.ty);
            data.ty.constructors.push(ctor);
        }

        match ConstructorChain::build(&data.ty) {
            Ok(chain) => {
                debug!(
                    "{}: {} constructor(s), roots {:?}",
                    data.ty.name,
                    chain.topological_order().len(),
                    chain.roots()
                );
                data.annotations.set(chain);
            }
            Err(err) => {
                warn!("{}", err);
                data.fallback = Some(err);
            }
        }
        data
    }

    fn name(&self) -> String {
        "constructor_chain".to_string()
    }
}
