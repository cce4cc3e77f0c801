// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Processor pipeline over compiled types.
//!
//! Each type is reconstructed on its own [`TypeData`]; processors run strictly in
//! sequence and pass their results downstream through [`Annotations`]. A processor
//! that sets a fallback ends the pipeline for that type, which is then emitted as it
//! came in.

use log::{debug, info};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    aggregate_classification::AggregateClassificationProcessor,
    annotations::Annotations,
    constructor_chain::ConstructorChainProcessor,
    error::{ReconstructionError, TypeOutcome},
    expression_shapes::ExpressionShapeProcessor,
    initializer_extraction::InitializerExtractionProcessor,
    model::CompiledType,
    options::ReconstructionOptions,
    primary_constructor::PrimaryConstructorProcessor,
};

/// Working state of one type while it moves through the pipeline.
#[derive(Debug)]
pub struct TypeData {
    /// The input, kept for fallback.
    pub original: CompiledType,
    /// The type being rewritten.
    pub ty: CompiledType,
    pub annotations: Annotations,
    /// Set by a processor that cannot continue; terminal for this type.
    pub fallback: Option<ReconstructionError>,
    /// Slot-level and synthesis failures that did not abort the type.
    pub diagnostics: Vec<ReconstructionError>,
}

impl TypeData {
    pub fn new(ty: CompiledType) -> Self {
        Self {
            original: ty.clone(),
            ty,
            annotations: Annotations::default(),
            fallback: None,
            diagnostics: vec![],
        }
    }
}

pub trait TypeProcessor: Send + Sync {
    /// Processes one type. The processor takes ownership of the working data and
    /// returns it, possibly with a fallback set.
    fn process(&self, data: TypeData, options: &ReconstructionOptions) -> TypeData;

    /// Returns a name for this processor, used in logs.
    fn name(&self) -> String;
}

/// A reconstructed type ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedType {
    pub ty: CompiledType,
    pub outcome: TypeOutcome,
    pub diagnostics: Vec<ReconstructionError>,
}

#[derive(Default)]
pub struct ReconstructionPipeline {
    processors: Vec<Box<dyn TypeProcessor>>,
}

impl ReconstructionPipeline {
    /// The five reconstruction stages in data-flow order.
    pub fn default_pipeline() -> Self {
        let mut pipeline = Self::default();
        pipeline.add_processor(ConstructorChainProcessor::new());
        pipeline.add_processor(InitializerExtractionProcessor::new());
        pipeline.add_processor(AggregateClassificationProcessor::new());
        pipeline.add_processor(PrimaryConstructorProcessor::new());
        pipeline.add_processor(ExpressionShapeProcessor::new());
        pipeline
    }

    pub fn add_processor(&mut self, processor: Box<dyn TypeProcessor>) {
        self.processors.push(processor)
    }

    pub fn processor_names(&self) -> Vec<String> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Runs the pipeline on one type, calling `hook_after_each_processor` with the
    /// step number, the processor and the working data after every processor.
    pub fn run_with_hook<H>(
        &self,
        ty: CompiledType,
        options: &ReconstructionOptions,
        hook_after_each_processor: H,
    ) -> ReconstructedType
    where
        H: Fn(usize, &dyn TypeProcessor, &TypeData),
    {
        let mut data = TypeData::new(ty);
        for (step_count, processor) in self.processors.iter().enumerate() {
            data = processor.process(data, options);
            hook_after_each_processor(step_count + 1, processor.as_ref(), &data);
            if data.fallback.is_some() {
                debug!("{}: stopped after `{}`", data.ty.name, processor.name());
                break;
            }
        }

        match data.fallback {
            Some(err) => {
                info!("{}: kept imperative form", data.original.name);
                ReconstructedType {
                    ty: data.original,
                    outcome: TypeOutcome::Fallback(err),
                    diagnostics: data.diagnostics,
                }
            }
            None => {
                info!(
                    "{}: reconstructed with {} diagnostic(s)",
                    data.ty.name,
                    data.diagnostics.len()
                );
                ReconstructedType {
                    ty: data.ty,
                    outcome: TypeOutcome::Reconstructed,
                    diagnostics: data.diagnostics,
                }
            }
        }
    }

    pub fn run(&self, ty: CompiledType, options: &ReconstructionOptions) -> ReconstructedType {
        self.run_with_hook(ty, options, |_, _, _| {})
    }

    /// Runs the pipeline over independent types, one task per type. `cancel` is
    /// checked before each type starts; types not started come back unchanged with
    /// [`TypeOutcome::Cancelled`]. Results are in input order.
    pub fn run_all(
        &self,
        types: Vec<CompiledType>,
        options: &ReconstructionOptions,
        cancel: &AtomicBool,
    ) -> Vec<ReconstructedType> {
        let process = |ty: CompiledType| {
            if cancel.load(Ordering::Relaxed) {
                debug!("{}: cancelled", ty.name);
                ReconstructedType { ty, outcome: TypeOutcome::Cancelled, diagnostics: vec![] }
            } else {
                self.run(ty, options)
            }
        };
        if options.parallel {
            types.into_par_iter().map(process).collect()
        } else {
            types.into_iter().map(process).collect()
        }
    }
}

/// Reconstructs one type with the default pipeline.
pub fn reconstruct_type(ty: CompiledType, options: &ReconstructionOptions) -> ReconstructedType {
    ReconstructionPipeline::default_pipeline().run(ty, options)
}

/// Reconstructs independent types with the default pipeline.
pub fn reconstruct_all(
    types: Vec<CompiledType>,
    options: &ReconstructionOptions,
    cancel: &AtomicBool,
) -> Vec<ReconstructedType> {
    ReconstructionPipeline::default_pipeline().run_all(types, options, cancel)
}
