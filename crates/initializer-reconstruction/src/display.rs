// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Declaration-shaped display of reconstructed types, for logs and tests.

use itertools::Itertools;
use std::fmt;

use crate::model::{
    Accessibility, AggregateKind, BinOp, CompiledType, Constructor, ConstructorForm,
    DelegationCall, DelegationTarget, Expr, Layout, Literal, MemberSlot, Mutability, Parameter,
    ParameterPassing, SlotDisposition, SlotKind, Statement, UnOp,
};

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        };
        f.write_str(op)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Default(ty) => write!(f, "default({})", ty.name()),
        }
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Accessibility::Public => "public",
            Accessibility::Protected => "protected",
            Accessibility::Internal => "internal",
            Accessibility::Private => "private",
        })
    }
}

/// An expression with the type and parameter list its slot and parameter
/// references resolve against.
pub struct ExprDisplay<'a> {
    pub expr: &'a Expr,
    pub ty: &'a CompiledType,
    pub parameters: &'a [Parameter],
}

impl<'a> ExprDisplay<'a> {
    pub fn new(expr: &'a Expr, ty: &'a CompiledType, parameters: &'a [Parameter]) -> Self {
        Self { expr, ty, parameters }
    }

    fn sub(&self, expr: &'a Expr) -> ExprDisplay<'a> {
        ExprDisplay { expr, ..*self }
    }

    /// Sub-expression, parenthesized when it is an operator form.
    fn operand(&self, expr: &'a Expr) -> String {
        let compound = matches!(
            expr,
            Expr::Binary { .. }
                | Expr::Conditional { .. }
                | Expr::Coalesce { .. }
                | Expr::Throw(_)
        );
        if compound {
            format!("({})", self.sub(expr))
        } else {
            self.sub(expr).to_string()
        }
    }

    fn args(&self, args: &'a [Expr]) -> String {
        argument_list(args, self.ty, self.parameters)
    }
}

impl<'a> fmt::Display for ExprDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Param(index) => match self.parameters.get(*index) {
                Some(param) => f.write_str(&param.name),
                None => write!(f, "arg{}", index),
            },
            Expr::This => f.write_str("this"),
            Expr::Member(slot) => match self.ty.slots.get(slot.0) {
                Some(member) => f.write_str(&member.name),
                None => write!(f, "{}", slot),
            },
            Expr::Field { target, name, .. } => write!(f, "{}.{}", self.operand(target), name),
            Expr::Call { callee, receiver, args } => match receiver {
                Some(receiver) => {
                    write!(f, "{}.{}({})", self.operand(receiver), callee.name, self.args(args))
                }
                None => write!(f, "{}({})", callee.name, self.args(args)),
            },
            Expr::New { ty, args } => write!(f, "new {}({})", ty.name(), self.args(args)),
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "{} {} {}", self.operand(lhs), op, self.operand(rhs))
            }
            Expr::Unary { op, operand } => {
                let op = match op {
                    UnOp::Not => "!",
                    UnOp::Neg => "-",
                };
                write!(f, "{}{}", op, self.operand(operand))
            }
            Expr::Convert { ty, value } => write!(f, "({}){}", ty.name(), self.operand(value)),
            Expr::Select { cond, then_value, else_value } => write!(
                f,
                "select({}, {}, {})",
                self.sub(cond),
                self.sub(then_value),
                self.sub(else_value)
            ),
            Expr::Conditional { cond, when_true, when_false } => write!(
                f,
                "{} ? {} : {}",
                self.operand(cond),
                self.operand(when_true),
                self.operand(when_false)
            ),
            Expr::Coalesce { value, fallback } => {
                write!(f, "{} ?? {}", self.operand(value), self.operand(fallback))
            }
            Expr::ConditionalAccess { target, member } => {
                write!(f, "{}?.{}", self.operand(target), member)
            }
            Expr::Throw(value) => write!(f, "throw {}", self.operand(value)),
        }
    }
}

fn argument_list(args: &[Expr], ty: &CompiledType, parameters: &[Parameter]) -> String {
    args.iter().map(|a| ExprDisplay::new(a, ty, parameters).to_string()).join(", ")
}

fn delegation_text(call: &DelegationCall, ty: &CompiledType, parameters: &[Parameter]) -> String {
    let keyword = match call.target {
        DelegationTarget::Base => "base",
        DelegationTarget::This(_) => "this",
    };
    format!("{}({})", keyword, argument_list(&call.args, ty, parameters))
}

/// Writes `block` as indented statement lines.
fn write_block(
    out: &mut impl fmt::Write,
    block: &[Statement],
    ty: &CompiledType,
    parameters: &[Parameter],
    indent: usize,
) -> fmt::Result {
    let pad = " ".repeat(indent);
    for stmt in block {
        match stmt {
            Statement::Assign { slot, value } => {
                let name = ty
                    .slots
                    .get(slot.0)
                    .map_or_else(|| slot.to_string(), |s| s.name.clone());
                writeln!(out, "{}{} = {};", pad, name, ExprDisplay::new(value, ty, parameters))?;
            }
            Statement::Delegate(call) => {
                writeln!(out, "{}{};", pad, delegation_text(call, ty, parameters))?;
            }
            Statement::Eval(value) => {
                writeln!(out, "{}{};", pad, ExprDisplay::new(value, ty, parameters))?
            }
            Statement::Throw(value) => {
                writeln!(out, "{}throw {};", pad, ExprDisplay::new(value, ty, parameters))?
            }
            Statement::If { cond, then_branch, else_branch } => {
                writeln!(out, "{}if ({})", pad, ExprDisplay::new(cond, ty, parameters))?;
                writeln!(out, "{}{{", pad)?;
                write_block(out, then_branch, ty, parameters, indent + 4)?;
                writeln!(out, "{}}}", pad)?;
                if !else_branch.is_empty() {
                    writeln!(out, "{}else", pad)?;
                    writeln!(out, "{}{{", pad)?;
                    write_block(out, else_branch, ty, parameters, indent + 4)?;
                    writeln!(out, "{}}}", pad)?;
                }
            }
        }
    }
    Ok(())
}

/// The type as a source-like declaration. Omits constructors and slots the
/// renderer would not emit.
pub struct TypeDump<'a>(pub &'a CompiledType);

impl<'a> TypeDump<'a> {
    fn primary(&self) -> Option<&'a Constructor> {
        self.0.primary_constructor.map(|id| self.0.constructor(id))
    }

    fn primary_parameters(&self) -> &'a [Parameter] {
        self.primary().map_or(&[], |ctor| ctor.parameters.as_slice())
    }

    fn keyword(&self) -> &'static str {
        match (self.0.aggregate_kind, self.0.layout) {
            (Some(AggregateKind::ValueSemanticAggregate { layout: Layout::ByReference }), _) => {
                "record"
            }
            (Some(AggregateKind::ValueSemanticAggregate { layout: Layout::ByValue }), _) => {
                "record struct"
            }
            (Some(AggregateKind::ValueType), _) | (None, Layout::ByValue) => "struct",
            (Some(AggregateKind::ReferenceAggregate), _) | (None, Layout::ByReference) => "class",
        }
    }

    /// Positional record members are declared by the primary parameter list.
    fn is_positional(&self, slot: &MemberSlot) -> bool {
        matches!(self.0.aggregate_kind, Some(AggregateKind::ValueSemanticAggregate { .. }))
            && slot.kind == SlotKind::Property
            && matches!(
                slot.initializer.as_ref().and_then(Expr::as_param),
                Some(index) if self.primary_parameters().get(index).map(|p| p.name.as_str())
                    == Some(slot.name.as_str())
            )
    }

    fn header(&self) -> String {
        let ty = self.0;
        let mut header = format!("{} {}", self.keyword(), ty.name);
        if let Some(primary) = self.primary() {
            header.push_str(&format!("({})", parameter_list(&primary.parameters)));
        }
        if let Some(base) = &ty.base {
            header.push_str(&format!(" : {}", base.name()));
            let base_args = self
                .primary()
                .and_then(|ctor| ctor.delegation())
                .map(|(_, call)| argument_list(&call.args, ty, self.primary_parameters()));
            if let Some(args) = base_args.filter(|a| !a.is_empty()) {
                header.push_str(&format!("({})", args));
            }
        }
        header
    }

    fn write_slot(&self, f: &mut fmt::Formatter<'_>, slot: &MemberSlot) -> fmt::Result {
        let ty = self.0;
        match slot.kind {
            SlotKind::Field => {
                let readonly = match slot.mutability {
                    Mutability::Mutable => "",
                    Mutability::InitOnce | Mutability::Immutable => "readonly ",
                };
                write!(
                    f,
                    "    {} {}{} {}",
                    slot.accessibility,
                    readonly,
                    slot.ty.name(),
                    slot.name
                )?;
            }
            SlotKind::Property => {
                let accessors = match slot.mutability {
                    Mutability::Mutable => "{ get; set; }",
                    Mutability::InitOnce => "{ get; init; }",
                    Mutability::Immutable => "{ get; }",
                };
                write!(
                    f,
                    "    {} {} {} {}",
                    slot.accessibility,
                    slot.ty.name(),
                    slot.name,
                    accessors
                )?;
            }
        }
        match &slot.initializer {
            Some(value) => writeln!(
                f,
                " = {};",
                ExprDisplay::new(value, ty, self.primary_parameters())
            ),
            None if slot.kind == SlotKind::Field => writeln!(f, ";"),
            None => writeln!(f),
        }
    }

    fn write_constructor(&self, f: &mut fmt::Formatter<'_>, ctor: &Constructor) -> fmt::Result {
        let ty = self.0;
        write!(f, "    {} {}({})", ctor.accessibility, ty.name, parameter_list(&ctor.parameters))?;

        let mut body = ctor.body.as_slice();
        if let Some(Statement::Delegate(call)) = body.first() {
            let elide_base = call.target == DelegationTarget::Base && call.args.is_empty();
            if !elide_base {
                write!(f, " : {}", delegation_text(call, ty, &ctor.parameters))?;
            }
            body = &body[1..];
        }
        if body.is_empty() {
            return writeln!(f, " {{ }}");
        }
        writeln!(f)?;
        writeln!(f, "    {{")?;
        write_block(f, body, ty, &ctor.parameters, 8)?;
        writeln!(f, "    }}")
    }
}

fn parameter_list(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let passing = match p.passing {
                ParameterPassing::Value => "",
                ParameterPassing::Ref => "ref ",
                ParameterPassing::ReadOnlyRef => "ref readonly ",
            };
            match &p.default_value {
                Some(value) => format!("{}{} {} = {}", passing, p.ty.name(), p.name, value),
                None => format!("{}{} {}", passing, p.ty.name(), p.name),
            }
        })
        .join(", ")
}

impl<'a> fmt::Display for TypeDump<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        writeln!(f, "{{")?;
        for slot in &self.0.slots {
            if slot.disposition != SlotDisposition::Declared || self.is_positional(slot) {
                continue;
            }
            self.write_slot(f, slot)?;
        }
        for ctor in &self.0.constructors {
            match ctor.form {
                ConstructorForm::Primary | ConstructorForm::Elided => {}
                ConstructorForm::Explicit | ConstructorForm::Forwarding => {
                    self.write_constructor(f, ctor)?
                }
            }
        }
        writeln!(f, "}}")
    }
}
