// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::*;
use initializer_reconstruction::{
    error::{AmbiguityReason, RejectionReason},
    model::{BinOp, Callee, Mutability, Statement},
    CompiledType, Constructor, ConstructorForm, CtorId, Expr, Layout, MemberSlot,
    ReconstructionError, ReconstructionOptions, SlotId, TypeOutcome, TypeRef,
};
use insta::assert_snapshot;

/// A constructor storing a freshly minted identifier hoists it to an initializer.
#[test]
fn test_fresh_identifier_becomes_initializer() {
    let mut ty = CompiledType::new("ClassWithId", Layout::ByReference);
    ty.slots.push(property("Id", "Guid", Mutability::Immutable));
    ty.constructors.push(Constructor::new(
        vec![],
        vec![Statement::assign(SlotId(0), new_guid()), Statement::base(vec![])],
    ));

    let result = reconstruct(ty);
    assert_eq!(result.outcome, TypeOutcome::Reconstructed);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.ty.constructors[0].form, ConstructorForm::Elided);
    assert_snapshot!(dump(&result), @r###"
    class ClassWithId
    {
        public Guid Id { get; } = Guid.NewGuid();
    }
    "###);
    assert_idempotent(&result, &ReconstructionOptions::default());
}

fn person() -> CompiledType {
    let mut ty = CompiledType::new("Person", Layout::ByReference);
    ty.slots.push(readonly_field("_name", "string"));
    ty.slots.push(readonly_field("_age", "int"));
    ty.slots.push(property("Email", "string", Mutability::Mutable));
    ty.constructors.push(Constructor::new(
        vec![param("name", "string"), param("age", "int")],
        vec![
            Statement::assign(SlotId(0), Expr::Param(0)),
            Statement::assign(SlotId(1), Expr::Param(1)),
            Statement::base(vec![]),
        ],
    ));
    ty.constructors.push(Constructor::new(
        vec![param("name", "string"), param("age", "int"), param("email", "string")],
        vec![
            Statement::this(CtorId(0), vec![Expr::Param(0), Expr::Param(1)]),
            Statement::If {
                cond: eq_null(Expr::Param(2)),
                then_branch: vec![Statement::Throw(Expr::New {
                    ty: TypeRef::new("ArgumentNullException"),
                    args: vec![Expr::str("email")],
                })],
                else_branch: vec![],
            },
            Statement::assign(SlotId(2), Expr::Param(2)),
        ],
    ));
    ty
}

/// An overload with a body beyond its delegation blocks primary constructor
/// synthesis for the whole type.
#[test]
fn test_bodied_overload_keeps_constructors_explicit() {
    let result = reconstruct(person());
    assert_eq!(result.outcome, TypeOutcome::Reconstructed);
    assert_eq!(
        result.diagnostics,
        vec![ReconstructionError::SynthesisRejected {
            type_name: "Person".to_string(),
            reason: RejectionReason::OverloadHasBody(CtorId(1)),
        }]
    );
    assert_eq!(result.ty.primary_constructor, None);
    assert_snapshot!(dump(&result), @r###"
    class Person
    {
        private readonly string _name;
        private readonly int _age;
        public string Email { get; set; }
        public Person(string name, int age)
        {
            _name = name;
            _age = age;
            base();
        }
        public Person(string name, int age, string email) : this(name, age)
        {
            if (email == null)
            {
                throw new ArgumentNullException("email");
            }
            Email = email;
        }
    }
    "###);
    assert_idempotent(&result, &ReconstructionOptions::default());
}

/// With bodied overloads allowed, the root still becomes the primary constructor
/// and the validating overload stays explicit.
#[test]
fn test_bodied_overload_kept_next_to_primary_constructor() {
    let options = ReconstructionOptions { keep_bodied_overloads: true, ..Default::default() };
    let result = reconstruct_with(person(), &options);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.ty.primary_constructor, Some(CtorId(0)));
    assert_eq!(result.ty.constructors[1].form, ConstructorForm::Explicit);
    assert_snapshot!(dump(&result), @r###"
    class Person(string name, int age)
    {
        private readonly string _name = name;
        private readonly int _age = age;
        public string Email { get; set; }
        public Person(string name, int age, string email) : this(name, age)
        {
            if (email == null)
            {
                throw new ArgumentNullException("email");
            }
            Email = email;
        }
    }
    "###);
    assert_idempotent(&result, &options);
}

fn web_pair(name: &str, value: Expr) -> CompiledType {
    let mut ty = CompiledType::new(name, Layout::ByReference);
    ty.slots.push(readonly_field("_value", "string"));
    ty.constructors.push(Constructor::new(
        vec![param("value", "string")],
        vec![Statement::assign(SlotId(0), value), Statement::base(vec![])],
    ));
    ty
}

/// Swapping the branches of a conditional initializer swaps the emitted operands.
#[test]
fn test_conditional_operand_order_follows_source() {
    let webpair3 = reconstruct(web_pair(
        "WebPair3",
        Expr::select(ne_null(Expr::Param(0)), Expr::str("111"), Expr::Param(0)),
    ));
    let webpair4 = reconstruct(web_pair(
        "WebPair4",
        Expr::select(ne_null(Expr::Param(0)), Expr::Param(0), Expr::str("111")),
    ));
    assert_snapshot!(dump(&webpair3), @r###"
    class WebPair3(string value)
    {
        private readonly string _value = (value != null) ? "111" : value;
    }
    "###);
    assert_snapshot!(dump(&webpair4), @r###"
    class WebPair4(string value)
    {
        private readonly string _value = value ?? "111";
    }
    "###);
    assert_idempotent(&webpair3, &ReconstructionOptions::default());
    assert_idempotent(&webpair4, &ReconstructionOptions::default());
}

/// Equality tests keep their branch order too: only the branch holding the
/// tested value decides whether coalescing applies.
#[test]
fn test_equality_test_operand_order() {
    let webpair6 = reconstruct(web_pair(
        "WebPair6",
        Expr::select(eq_null(Expr::Param(0)), Expr::Param(0), Expr::str("111")),
    ));
    let webpair7 = reconstruct(web_pair(
        "WebPair7",
        Expr::select(eq_null(Expr::Param(0)), Expr::str("111"), Expr::Param(0)),
    ));
    assert_eq!(
        webpair6.ty.slots[0].initializer,
        Some(Expr::conditional(eq_null(Expr::Param(0)), Expr::Param(0), Expr::str("111")))
    );
    assert_eq!(
        webpair7.ty.slots[0].initializer,
        Some(Expr::Coalesce {
            value: Box::new(Expr::Param(0)),
            fallback: Box::new(Expr::str("111")),
        })
    );
}

/// A two-way branch left in a constructor body becomes a single conditional store.
#[test]
fn test_statement_level_conditional_store() {
    let mut ty = CompiledType::new("WebPair5", Layout::ByReference);
    ty.slots.push(field("_value", "string"));
    ty.constructors.push(Constructor::new(
        vec![param("value", "string")],
        vec![
            Statement::base(vec![]),
            Statement::If {
                cond: ne_null(Expr::Param(0)),
                then_branch: vec![Statement::assign(SlotId(0), Expr::str("111"))],
                else_branch: vec![Statement::assign(SlotId(0), Expr::Param(0))],
            },
        ],
    ));
    let result = reconstruct(ty);
    assert_snapshot!(dump(&result), @r###"
    class WebPair5
    {
        private string _value;
        public WebPair5(string value)
        {
            _value = (value != null) ? "111" : value;
        }
    }
    "###);
    assert_idempotent(&result, &ReconstructionOptions::default());
}

/// A value type whose parameterless constructor sets a non-default value keeps
/// that constructor; implicit zeroing would not reproduce it.
#[test]
fn test_struct_with_non_default_value_keeps_constructor() {
    let mut ty = CompiledType::new("StructWithDefaultCtor", Layout::ByValue);
    ty.slots.push(MemberSlot::field("_x", TypeRef::new("int")));
    ty.slots.push(MemberSlot::field("_y", TypeRef::new("int")));
    ty.constructors.push(Constructor::new(
        vec![],
        vec![Statement::assign(SlotId(0), Expr::int(5))],
    ));
    let result = reconstruct(ty);
    assert_eq!(result.ty.constructors[0].form, ConstructorForm::Explicit);
    assert_snapshot!(dump(&result), @r###"
    struct StructWithDefaultCtor
    {
        public int _x = 5;
        public int _y;
        public StructWithDefaultCtor() { }
    }
    "###);
    assert_idempotent(&result, &ReconstructionOptions::default());
}

#[test]
fn test_struct_with_zero_values_drops_constructor() {
    let mut ty = CompiledType::new("ZeroStruct", Layout::ByValue);
    ty.slots.push(MemberSlot::field("_x", TypeRef::new("int")));
    ty.slots.push(MemberSlot::field("_name", TypeRef::new("string")));
    ty.constructors.push(Constructor::new(
        vec![],
        vec![
            Statement::assign(SlotId(0), Expr::int(0)),
            Statement::assign(SlotId(1), Expr::null()),
        ],
    ));
    let result = reconstruct(ty);
    assert_eq!(result.ty.constructors[0].form, ConstructorForm::Elided);
    assert_snapshot!(dump(&result), @r###"
    struct ZeroStruct
    {
        public int _x;
        public string _name;
    }
    "###);
    assert_idempotent(&result, &ReconstructionOptions::default());
}

/// A slot an overload assigns on one branch only is never hoisted.
#[test]
fn test_conditional_store_in_overload_stays_imperative() {
    let mut ty = CompiledType::new("Flagged", Layout::ByReference);
    ty.slots.push(field("_level", "int"));
    ty.constructors.push(Constructor::new(
        vec![],
        vec![Statement::assign(SlotId(0), Expr::int(1)), Statement::base(vec![])],
    ));
    ty.constructors.push(Constructor::new(
        vec![param("verbose", "bool")],
        vec![
            Statement::this(CtorId(0), vec![]),
            Statement::If {
                cond: Expr::Param(0),
                then_branch: vec![Statement::assign(SlotId(0), Expr::int(2))],
                else_branch: vec![],
            },
        ],
    ));
    let result = reconstruct(ty);
    assert_eq!(result.ty.slots[0].initializer, None);
    assert!(result.diagnostics.contains(&ReconstructionError::AmbiguousInitializer {
        type_name: "Flagged".to_string(),
        slot: "_level".to_string(),
        reason: AmbiguityReason::ConditionalAssignment(CtorId(1)),
    }));
    assert_eq!(result.ty.constructors[0].body.len(), 2);
}

fn choice(name: &str, value: Expr) -> CompiledType {
    let mut ty = CompiledType::new(name, Layout::ByReference);
    ty.slots.push(readonly_field("_value", "string"));
    ty.constructors.push(Constructor::new(
        vec![param("name", "string"), param("value", "string")],
        vec![Statement::assign(SlotId(0), value), Statement::base(vec![])],
    ));
    ty
}

/// Two conditionals that only differ in branch order, neither of which can
/// coalesce, come out with their operands swapped.
#[test]
fn test_swapped_conditionals_keep_their_operand_order() {
    let name = || Expr::Param(0);
    let value = || Expr::Param(1);
    let flag = || Expr::binary(BinOp::Gt, Expr::field(value(), "Length"), Expr::int(3));

    let first = reconstruct(choice("Choice1", Expr::select(flag(), Expr::str("a"), name())));
    let second = reconstruct(choice("Choice2", Expr::select(flag(), name(), Expr::str("a"))));
    assert_eq!(
        first.ty.slots[0].initializer,
        Some(Expr::conditional(flag(), Expr::str("a"), name()))
    );
    assert_eq!(
        second.ty.slots[0].initializer,
        Some(Expr::conditional(flag(), name(), Expr::str("a")))
    );

    let webpair6 = reconstruct(choice(
        "WebPair6",
        Expr::select(ne_null(name()), Expr::str("111"), value()),
    ));
    let swapped = reconstruct(choice(
        "WebPair6Swapped",
        Expr::select(ne_null(value()), name(), Expr::str("222")),
    ));
    assert_snapshot!(dump(&webpair6), @r###"
    class WebPair6(string name, string value)
    {
        private readonly string _value = (name != null) ? "111" : value;
    }
    "###);
    assert_snapshot!(dump(&swapped), @r###"
    class WebPair6Swapped(string name, string value)
    {
        private readonly string _value = (value != null) ? name : "222";
    }
    "###);
    for result in [&first, &second, &webpair6, &swapped] {
        assert_idempotent(result, &ReconstructionOptions::default());
    }
}

/// Initializers run in declaration order. A store left in the body must not move
/// ahead of a later-declared initializer when both calls are observable.
#[test]
fn test_partial_hoist_keeps_evaluation_order() {
    let mut ty = CompiledType::new("Sequenced", Layout::ByReference);
    ty.slots.push(field("b", "int"));
    ty.slots.push(field("a", "int"));
    ty.constructors.push(Constructor::new(
        vec![],
        vec![
            Statement::assign(SlotId(1), Expr::call(Callee::new("Foo"), vec![])),
            Statement::assign(SlotId(0), Expr::call(Callee::new("Bar"), vec![])),
            Statement::base(vec![]),
        ],
    ));

    let result = reconstruct(ty);
    assert_snapshot!(dump(&result), @r###"
    class Sequenced
    {
        private int b;
        private int a = Foo();
        public Sequenced()
        {
            b = Bar();
            base();
        }
    }
    "###);
    assert_idempotent(&result, &ReconstructionOptions::default());
}
