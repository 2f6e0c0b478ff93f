//! Expansion of the `Map[F, *Ts]` type-level operator.
//!
//! This crate implements:
//! - The type argument mapper: distribute a unary constructor over an
//!   argument list, collapsing a lone argument to a bare `F[T]`
//! - Opt-in step tracing of every expansion
//! - The lowering pass a host runs over parsed annotations to find `Map`
//!   occurrences, validate their arguments, and substitute the result
//!
//! The mapper is a pure function over immutable type descriptors. It has no
//! failure paths: malformed argument lists cannot be constructed, and the
//! lowering pass reports everything else as diagnostics before calling it.

pub mod lower;
pub mod trace;

use std::fmt::Display;

use tymap_types::{
    ArgumentList, ResultExpression, Type, TypeArgument, TypeConstructor, VariadicPack,
};

// Re-export for convenience.
pub use lower::{ExpandConfig, Lowerer, Scope, lower_annotation};
pub use trace::{ExpandAction, ExpandStep, Expansion};
pub use tymap_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};

/// Expand `Map[constructor, *args]`.
///
/// A single concrete type or variable yields `F[T]`. Anything else, including
/// a lone variadic rest, yields an unpacked tuple with one mapped element per
/// argument, in argument order.
pub fn expand(constructor: &TypeConstructor, args: &ArgumentList) -> ResultExpression {
    expand_with(constructor, args, &mut Recorder { steps: None })
}

/// Same as [`expand`], additionally appending one step per decision to `trace`.
pub fn expand_traced(
    constructor: &TypeConstructor,
    args: &ArgumentList,
    trace: &mut Vec<ExpandStep>,
) -> ResultExpression {
    expand_with(constructor, args, &mut Recorder { steps: Some(trace) })
}

fn expand_with(
    constructor: &TypeConstructor,
    args: &ArgumentList,
    recorder: &mut Recorder<'_>,
) -> ResultExpression {
    if let [single] = args.as_slice() {
        let ty = match single {
            TypeArgument::Concrete(ty) => Some(ty.clone()),
            TypeArgument::Variable(var) => Some(Type::Var(var.clone())),
            TypeArgument::VariadicRest(_) => None,
        };
        if let Some(ty) = ty {
            let mapped = constructor.apply(ty);
            recorder.record(
                ExpandAction::Collapse,
                single,
                &mapped,
                "single argument maps to a bare type",
            );
            return ResultExpression::Single(mapped);
        }
    }

    let elems: Vec<Type> = args
        .iter()
        .map(|arg| map_argument(constructor, arg, recorder))
        .collect();
    let result = ResultExpression::Unpacked(elems);
    recorder.record(
        ExpandAction::Concatenate,
        format_args!("{} argument(s)", args.len()),
        &result,
        if args.has_variadic_rest() {
            "fixed elements followed by a variadic tail"
        } else {
            "fixed elements only"
        },
    );
    result
}

fn map_argument(
    constructor: &TypeConstructor,
    arg: &TypeArgument,
    recorder: &mut Recorder<'_>,
) -> Type {
    match arg {
        TypeArgument::Concrete(ty) => {
            let mapped = constructor.apply(ty.clone());
            recorder.record(ExpandAction::MapElement, arg, &mapped, "concrete type");
            mapped
        }
        TypeArgument::Variable(var) => {
            let mapped = constructor.apply(Type::Var(var.clone()));
            recorder.record(ExpandAction::MapElement, arg, &mapped, "type variable");
            mapped
        }
        TypeArgument::VariadicRest(var) => {
            let mapped = Type::Pack(VariadicPack::mapped(var.clone(), constructor.clone()));
            recorder.record(
                ExpandAction::MapVariadic,
                arg,
                &mapped,
                "every element of the pack is wrapped",
            );
            mapped
        }
    }
}

/// Collects trace steps when enabled. Formats nothing otherwise.
struct Recorder<'a> {
    steps: Option<&'a mut Vec<ExpandStep>>,
}

impl Recorder<'_> {
    fn record(
        &mut self,
        action: ExpandAction,
        input: impl Display,
        output: impl Display,
        detail: &str,
    ) {
        if let Some(steps) = self.steps.as_deref_mut() {
            steps.push(ExpandStep {
                step: steps.len(),
                action,
                input: input.to_string(),
                output: output.to_string(),
                detail: detail.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod prop_tests;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tymap_types::{TypeVar, TypeVarTuple};

    fn ty(name: &str) -> Type {
        Type::con(name)
    }

    fn list(args: Vec<TypeArgument>) -> ArgumentList {
        ArgumentList::new(args).expect("well-formed argument list")
    }

    fn type_ctor() -> TypeConstructor {
        TypeConstructor::new("type")
    }

    #[test]
    fn single_concrete_collapses() {
        let result = expand(&type_ctor(), &list(vec![TypeArgument::Concrete(ty("int"))]));
        assert_eq!(
            result,
            ResultExpression::Single(Type::app("type", vec![ty("int")]))
        );
        assert_eq!(result.to_string(), "type[int]");
    }

    #[test]
    fn two_concretes_unpack() {
        let result = expand(
            &type_ctor(),
            &list(vec![
                TypeArgument::Concrete(ty("int")),
                TypeArgument::Concrete(ty("str")),
            ]),
        );
        assert_eq!(result.to_string(), "*tuple[type[int], type[str]]");
    }

    #[test]
    fn single_variable_keeps_bound() {
        let result = expand(
            &type_ctor(),
            &list(vec![TypeArgument::Variable(TypeVar::bounded("T", ty("int")))]),
        );
        assert_eq!(result.to_string(), "type[T: int]");
        assert!(matches!(result, ResultExpression::Single(_)));
    }

    #[test]
    fn lone_variadic_does_not_collapse() {
        let result = expand(
            &type_ctor(),
            &list(vec![TypeArgument::VariadicRest(TypeVarTuple::new("Ts"))]),
        );
        assert_eq!(
            result,
            ResultExpression::Unpacked(vec![Type::Pack(VariadicPack::mapped(
                TypeVarTuple::new("Ts"),
                type_ctor()
            ))])
        );
        assert_eq!(result.to_string(), "*Ts: type");
    }

    #[test]
    fn mixed_list_keeps_order_and_variadic_tail() {
        let result = expand(
            &type_ctor(),
            &list(vec![
                TypeArgument::Concrete(ty("int")),
                TypeArgument::Variable(TypeVar::new("T")),
                TypeArgument::VariadicRest(TypeVarTuple::new("Ts")),
            ]),
        );
        assert_eq!(result.to_string(), "*tuple[type[int], type[T], *Ts: type]");
        assert_eq!(result.fixed_len(), 2);
    }

    #[test]
    fn constructor_applies_to_compound_argument() {
        let result = expand(
            &TypeConstructor::new("list"),
            &list(vec![TypeArgument::Concrete(Type::app(
                "dict",
                vec![ty("str"), ty("int")],
            ))]),
        );
        assert_eq!(result.to_string(), "list[dict[str, int]]");
    }

    #[test]
    fn traced_records_collapse() {
        let mut steps = Vec::new();
        let result = expand_traced(
            &type_ctor(),
            &list(vec![TypeArgument::Concrete(ty("int"))]),
            &mut steps,
        );
        assert_eq!(result.to_string(), "type[int]");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, ExpandAction::Collapse);
        assert_eq!(steps[0].input, "int");
        assert_eq!(steps[0].output, "type[int]");
    }

    #[test]
    fn traced_records_each_element_then_concatenation() {
        let mut steps = Vec::new();
        expand_traced(
            &type_ctor(),
            &list(vec![
                TypeArgument::Concrete(ty("int")),
                TypeArgument::Variable(TypeVar::new("T")),
                TypeArgument::VariadicRest(TypeVarTuple::new("Ts")),
            ]),
            &mut steps,
        );
        let actions: Vec<ExpandAction> = steps.iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![
                ExpandAction::MapElement,
                ExpandAction::MapElement,
                ExpandAction::MapVariadic,
                ExpandAction::Concatenate,
            ]
        );
        let numbers: Vec<usize> = steps.iter().map(|s| s.step).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
        assert_eq!(steps[2].input, "*Ts");
        assert_eq!(steps[2].output, "*Ts: type");
        assert_eq!(steps[3].input, "3 argument(s)");
    }

    #[test]
    fn trace_serializes_snake_case_actions() {
        let mut steps = Vec::new();
        expand_traced(
            &type_ctor(),
            &list(vec![TypeArgument::VariadicRest(TypeVarTuple::new("Ts"))]),
            &mut steps,
        );
        let json = serde_json::to_value(&steps).expect("trace serializes");
        assert_eq!(json[0]["action"], "map_variadic");
        assert_eq!(json[1]["action"], "concatenate");
        assert_eq!(json[1]["output"], "*Ts: type");
    }
}
