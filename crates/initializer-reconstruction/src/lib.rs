// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Initializer Reconstruction
//!
//! Recovers declarative initialization from the imperative constructors of a
//! decompiled type: declaration-site initializers, primary constructors with
//! forwarding overloads, record and struct classification, and conditional or
//! coalescing initializer expressions. Whenever equivalence with the imperative
//! form cannot be shown, the affected slot or type keeps its imperative form.
//!
//! The input is a fully resolved [`CompiledType`] produced by a decompiler front
//! end; the output is the same model with initializers, constructor forms and an
//! [`AggregateKind`] filled in for a renderer.

pub mod aggregate_classification;
pub mod annotations;
pub mod constructor_chain;
pub mod display;
pub mod effects;
pub mod equivalence;
pub mod error;
pub mod expression_shapes;
pub mod initializer_extraction;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod primary_constructor;

// Pipeline entry points
pub use pipeline::{
    reconstruct_all, reconstruct_type, ReconstructedType, ReconstructionPipeline, TypeData,
    TypeProcessor,
};

// Stage results
pub use aggregate_classification::AggregateClassification;
pub use constructor_chain::ConstructorChain;
pub use expression_shapes::SelectShape;
pub use initializer_extraction::{CandidateInitializer, HoistPlan, InitializerExtraction};
pub use primary_constructor::SynthesisDecision;

// Model
pub use model::{
    AggregateKind, CompiledType, Constructor, ConstructorForm, CtorId, Expr, Layout, MemberSlot,
    Parameter, SlotId, Statement, TypeRef,
};

pub use display::{ExprDisplay, TypeDump};
pub use equivalence::{ExprEquivalence, StructuralEquivalence};
pub use error::{ReconstructionError, TypeOutcome};
pub use options::ReconstructionOptions;
