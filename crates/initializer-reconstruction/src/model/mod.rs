// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Type model consumed and produced by the reconstruction pipeline.
//!
//! A [`CompiledType`] owns its member slots and constructors in two arenas. Slots and
//! constructors are referred to by index ([`SlotId`], [`CtorId`]), so delegation edges
//! between constructors never form ownership cycles. The same model is used for the
//! front end's input and the renderer's output: reconstruction only fills in
//! initializers, constructor forms and the aggregate kind.

pub mod expressions;
pub mod statements;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use expressions::{BinOp, Callee, Expr, Literal, UnOp};
pub use statements::{DelegationCall, DelegationTarget, Statement};

/// Index of a member slot in [`CompiledType::slots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub usize);

/// Index of a constructor in [`CompiledType::constructors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CtorId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

impl fmt::Display for CtorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctor#{}", self.0)
    }
}

/// A resolved type reference, kept as its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Whether instances are passed by value or by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    ByReference,
    ByValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accessibility {
    Public,
    Protected,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    Field,
    /// Auto-property; assignments target its backing storage.
    Property,
}

/// Mutability class of a member slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutability {
    Mutable,
    /// Settable during object initialization only (`init` accessors).
    InitOnce,
    /// Assignable only while the constructor runs.
    Immutable,
}

/// How the renderer should declare a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotDisposition {
    /// Emitted as a member declaration (with its initializer, if any).
    Declared,
    /// Compiler storage for a primary constructor parameter; rendered as the
    /// captured parameter itself rather than a separate field.
    CapturedParameter(usize),
}

/// A field or property of a compiled type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSlot {
    pub name: String,
    pub kind: SlotKind,
    pub ty: TypeRef,
    pub mutability: Mutability,
    pub accessibility: Accessibility,
    /// Emitted by the compiler rather than declared by the author.
    pub compiler_generated: bool,
    /// Declaration-site initializer.
    pub initializer: Option<Expr>,
    pub disposition: SlotDisposition,
}

impl MemberSlot {
    pub fn new(name: impl Into<String>, kind: SlotKind, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            mutability: Mutability::Mutable,
            accessibility: Accessibility::Public,
            compiler_generated: false,
            initializer: None,
            disposition: SlotDisposition::Declared,
        }
    }

    pub fn field(name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(name, SlotKind::Field, ty)
    }

    pub fn property(name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(name, SlotKind::Property, ty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterPassing {
    Value,
    Ref,
    ReadOnlyRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    pub passing: ParameterPassing,
    /// Default argument recorded in metadata.
    pub default_value: Option<Literal>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            passing: ParameterPassing::Value,
            default_value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructorOrigin {
    Declared,
    /// Compiler-provided copy constructor of a value-semantic aggregate.
    CopyConstructor,
}

/// How the renderer should emit a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructorForm {
    /// An ordinary constructor with its remaining body.
    Explicit,
    /// Parameters are rendered at the type declaration site.
    Primary,
    /// An overload whose whole body is a `this(...)` forwarding call.
    Forwarding,
    /// Not rendered; the language supplies an equivalent one implicitly.
    Elided,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    pub parameters: Vec<Parameter>,
    /// Low-level statements in evaluation order. A `base(...)` or `this(...)`
    /// call appears as [`Statement::Delegate`].
    pub body: Vec<Statement>,
    pub accessibility: Accessibility,
    pub origin: ConstructorOrigin,
    pub form: ConstructorForm,
}

impl Constructor {
    pub fn new(parameters: Vec<Parameter>, body: Vec<Statement>) -> Self {
        Self {
            parameters,
            body,
            accessibility: Accessibility::Public,
            origin: ConstructorOrigin::Declared,
            form: ConstructorForm::Explicit,
        }
    }

    /// Position and payload of the top-level delegation call, if any.
    pub fn delegation(&self) -> Option<(usize, &DelegationCall)> {
        self.body.iter().enumerate().find_map(|(index, stmt)| match stmt {
            Statement::Delegate(call) => Some((index, call)),
            _ => None,
        })
    }

    /// The same-type constructor this one delegates to.
    pub fn delegation_target(&self) -> Option<CtorId> {
        match self.delegation() {
            Some((_, DelegationCall { target: DelegationTarget::This(id), .. })) => Some(*id),
            _ => None,
        }
    }

    pub fn is_declared(&self) -> bool {
        self.origin == ConstructorOrigin::Declared
    }
}

/// Compiler-synthesized structural members, as reported by the front end. Each list
/// names the slots the member covers, in the order the member visits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedMembers {
    pub equality: Option<Vec<SlotId>>,
    pub hash_code: Option<Vec<SlotId>>,
    pub deconstruct: Option<Vec<SlotId>>,
}

/// Syntax family the renderer should use for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateKind {
    ReferenceAggregate,
    /// Record-like; `layout` selects the reference or value variant.
    ValueSemanticAggregate { layout: Layout },
    ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledType {
    pub name: String,
    pub base: Option<TypeRef>,
    pub layout: Layout,
    /// Fields and properties in declaration order.
    pub slots: Vec<MemberSlot>,
    pub constructors: Vec<Constructor>,
    pub synthesized: SynthesizedMembers,
    pub aggregate_kind: Option<AggregateKind>,
    pub primary_constructor: Option<CtorId>,
}

impl CompiledType {
    pub fn new(name: impl Into<String>, layout: Layout) -> Self {
        Self {
            name: name.into(),
            base: None,
            layout,
            slots: vec![],
            constructors: vec![],
            synthesized: SynthesizedMembers::default(),
            aggregate_kind: None,
            primary_constructor: None,
        }
    }

    pub fn slot(&self, id: SlotId) -> &MemberSlot {
        &self.slots[id.0]
    }

    pub fn slot_mut(&mut self, id: SlotId) -> &mut MemberSlot {
        &mut self.slots[id.0]
    }

    pub fn constructor(&self, id: CtorId) -> &Constructor {
        &self.constructors[id.0]
    }

    pub fn constructor_mut(&mut self, id: CtorId) -> &mut Constructor {
        &mut self.constructors[id.0]
    }

    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> {
        (0..self.slots.len()).map(SlotId)
    }

    pub fn constructor_ids(&self) -> impl Iterator<Item = CtorId> {
        (0..self.constructors.len()).map(CtorId)
    }

    pub fn find_slot(&self, name: &str) -> Option<SlotId> {
        self.slots.iter().position(|s| s.name == name).map(SlotId)
    }

    pub fn is_value_layout(&self) -> bool {
        self.layout == Layout::ByValue
    }
}
