// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Failure taxonomy. Every failure is local to one type and selects the always-correct
//! imperative form for that type or slot; none aborts the run.

use crate::model::CtorId;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructionError {
    /// Cyclic or dangling delegation; the type keeps its original constructors.
    #[error("malformed constructor chain in `{type_name}`: {reason}")]
    MalformedChain { type_name: String, reason: ChainDefect },

    /// Conflicting candidates across delegation paths; the slot stays imperative.
    #[error("ambiguous initializer for `{type_name}.{slot}`: {reason}")]
    AmbiguousInitializer {
        type_name: String,
        slot: String,
        reason: AmbiguityReason,
    },

    /// Primary constructor verification failed; all constructors stay explicit.
    #[error("primary constructor synthesis rejected for `{type_name}`: {reason}")]
    SynthesisRejected {
        type_name: String,
        reason: RejectionReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainDefect {
    Cycle(CtorId),
    DanglingTarget { from: CtorId, target: CtorId },
    /// Delegation into a compiler-provided constructor that does not take part in
    /// initialization.
    NonParticipatingTarget { from: CtorId, target: CtorId },
    MultipleDelegations(CtorId),
    NestedDelegation(CtorId),
}

impl fmt::Display for ChainDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainDefect::Cycle(ctor) => write!(f, "delegation cycle through {}", ctor),
            ChainDefect::DanglingTarget { from, target } => {
                write!(f, "{} delegates to missing {}", from, target)
            }
            ChainDefect::NonParticipatingTarget { from, target } => {
                write!(f, "{} delegates to compiler-provided {}", from, target)
            }
            ChainDefect::MultipleDelegations(ctor) => {
                write!(f, "{} contains more than one delegation call", ctor)
            }
            ChainDefect::NestedDelegation(ctor) => {
                write!(f, "{} delegates from inside a branch", ctor)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmbiguityReason {
    /// Entry points store expressions that are not equivalent.
    ConflictingCandidates,
    /// Some entry point does not store the slot before its delegation call.
    MissingAtEntryPoint(CtorId),
    /// A constructor body assigns the slot inside a branch.
    ConditionalAssignment(CtorId),
}

impl fmt::Display for AmbiguityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmbiguityReason::ConflictingCandidates => {
                write!(f, "entry points store different expressions")
            }
            AmbiguityReason::MissingAtEntryPoint(ctor) => {
                write!(f, "{} does not store it before delegating", ctor)
            }
            AmbiguityReason::ConditionalAssignment(ctor) => {
                write!(f, "{} assigns it conditionally", ctor)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    MultipleRoots,
    /// The root keeps statements that a primary constructor cannot express.
    RootRetainsLogic,
    /// An overload has statements besides its delegation call.
    OverloadHasBody(CtorId),
    OverloadArityMismatch(CtorId),
    /// An overload's forwarded arguments reference the instance.
    OverloadReadsInstance(CtorId),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::MultipleRoots => write!(f, "constructors have more than one root"),
            RejectionReason::RootRetainsLogic => write!(f, "root constructor keeps a body"),
            RejectionReason::OverloadHasBody(ctor) => {
                write!(f, "{} has statements besides its delegation", ctor)
            }
            RejectionReason::OverloadArityMismatch(ctor) => {
                write!(f, "{} forwards the wrong number of arguments", ctor)
            }
            RejectionReason::OverloadReadsInstance(ctor) => {
                write!(f, "{} forwards an argument that reads the instance", ctor)
            }
        }
    }
}

/// Final state of one type after the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOutcome {
    Reconstructed,
    /// Emitted unchanged.
    Fallback(ReconstructionError),
    /// Not processed because cancellation was requested first; emitted unchanged.
    Cancelled,
}

impl TypeOutcome {
    pub fn is_reconstructed(&self) -> bool {
        matches!(self, TypeOutcome::Reconstructed)
    }
}
