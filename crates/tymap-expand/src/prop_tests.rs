//! Property tests for the mapper using proptest.
//!
//! These tests stress invariants that must hold for ANY argument list,
//! not just hand-picked examples. Key properties:
//!
//! 1. Singleton collapse: one fixed argument yields a bare `F[T]`
//! 2. Order preservation: output position i is argument i mapped
//! 3. A variadic tail is always the last element and only when given
//! 4. Tracing never changes the result
//! 5. Argument lists are accepted exactly when well-formed

use proptest::prelude::*;
use tymap_types::*;

use crate::{ExpandAction, expand, expand_traced};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const NULLARY: &[&str] = &["int", "str", "bytes", "float", "bool", "object"];
const UNARY: &[&str] = &["list", "set", "type", "frozenset", "Box"];
const VAR_NAMES: &[&str] = &["T", "U", "K", "V"];
const PACK_NAMES: &[&str] = &["Ts", "Us", "Shape"];

fn arb_type(depth: u32) -> impl Strategy<Value = Type> {
    let leaf = prop::sample::select(NULLARY).prop_map(Type::con);
    leaf.prop_recursive(depth, 16, 3, |inner| {
        prop_oneof![
            (prop::sample::select(UNARY), inner.clone())
                .prop_map(|(name, arg)| Type::app(name, vec![arg])),
            (inner.clone(), inner.clone())
                .prop_map(|(k, v)| Type::app("dict", vec![k, v])),
            prop::collection::vec(inner, 0..3).prop_map(Type::Tuple),
        ]
    })
}

fn arb_var() -> impl Strategy<Value = TypeVar> {
    (
        prop::sample::select(VAR_NAMES),
        prop::option::of(arb_type(1)),
    )
        .prop_map(|(name, bound)| match bound {
            Some(bound) => TypeVar::bounded(name, bound),
            None => TypeVar::new(name),
        })
}

fn arb_fixed_arg() -> impl Strategy<Value = TypeArgument> {
    prop_oneof![
        arb_type(2).prop_map(TypeArgument::Concrete),
        arb_var().prop_map(TypeArgument::Variable),
    ]
}

fn arb_variadic() -> impl Strategy<Value = TypeArgument> {
    prop::sample::select(PACK_NAMES)
        .prop_map(|name| TypeArgument::VariadicRest(TypeVarTuple::new(name)))
}

/// Well-formed argument lists: fixed arguments with an optional variadic tail.
fn arb_argument_list() -> impl Strategy<Value = ArgumentList> {
    (
        prop::collection::vec(arb_fixed_arg(), 0..6),
        prop::option::of(arb_variadic()),
    )
        .prop_filter("argument list must not be empty", |(fixed, tail)| {
            !fixed.is_empty() || tail.is_some()
        })
        .prop_map(|(mut args, tail)| {
            args.extend(tail);
            ArgumentList::new(args).expect("strategy only builds well-formed lists")
        })
}

/// Arbitrary argument vectors, including malformed ones.
fn arb_raw_arguments() -> impl Strategy<Value = Vec<TypeArgument>> {
    prop::collection::vec(prop_oneof![3 => arb_fixed_arg(), 1 => arb_variadic()], 0..6)
}

fn arb_constructor() -> impl Strategy<Value = TypeConstructor> {
    prop::sample::select(UNARY).prop_map(TypeConstructor::new)
}

fn mapped(ctor: &TypeConstructor, arg: &TypeArgument) -> Type {
    match arg {
        TypeArgument::Concrete(ty) => ctor.apply(ty.clone()),
        TypeArgument::Variable(var) => ctor.apply(Type::Var(var.clone())),
        TypeArgument::VariadicRest(var) => {
            Type::Pack(VariadicPack::mapped(var.clone(), ctor.clone()))
        }
    }
}

fn collapses(args: &ArgumentList) -> bool {
    args.len() == 1 && !args.has_variadic_rest()
}

// ---------------------------------------------------------------------------
// Property: singleton collapse
// ---------------------------------------------------------------------------

proptest! {
    /// One fixed argument maps to exactly `F[T]`, never a one-element tuple.
    #[test]
    fn singleton_collapses_to_bare_application(ctor in arb_constructor(), arg in arb_fixed_arg()) {
        let list = ArgumentList::new(vec![arg.clone()]).expect("singleton is well-formed");
        let result = expand(&ctor, &list);
        prop_assert_eq!(&result, &ResultExpression::Single(mapped(&ctor, &arg)));
        prop_assert!(!result.to_string().starts_with("*tuple["));
    }
}

// ---------------------------------------------------------------------------
// Property: order preservation
// ---------------------------------------------------------------------------

proptest! {
    /// Every non-collapsing list maps position by position.
    #[test]
    fn unpacked_result_preserves_order(ctor in arb_constructor(), args in arb_argument_list()) {
        prop_assume!(!collapses(&args));
        match expand(&ctor, &args) {
            ResultExpression::Unpacked(elems) => {
                prop_assert_eq!(elems.len(), args.len());
                for (elem, arg) in elems.iter().zip(args.iter()) {
                    prop_assert_eq!(elem, &mapped(&ctor, arg));
                }
            }
            ResultExpression::Single(ty) => {
                prop_assert!(false, "expected an unpacked tuple, got {}", ty);
            }
        }
    }

    /// The variadic tail is the last element, and present only when given.
    #[test]
    fn variadic_tail_is_last(ctor in arb_constructor(), args in arb_argument_list()) {
        let result = expand(&ctor, &args);
        let elems = match &result {
            ResultExpression::Single(ty) => std::slice::from_ref(ty),
            ResultExpression::Unpacked(elems) => elems.as_slice(),
        };
        let pack_positions: Vec<usize> = elems
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t, Type::Pack(_)))
            .map(|(idx, _)| idx)
            .collect();
        if args.has_variadic_rest() {
            prop_assert_eq!(pack_positions, vec![elems.len() - 1]);
        } else {
            prop_assert!(pack_positions.is_empty());
        }
        let fixed = args.iter().filter(|a| !a.is_variadic()).count();
        prop_assert_eq!(result.fixed_len(), fixed);
    }

    /// Identical inputs give identical results.
    #[test]
    fn expansion_is_deterministic(ctor in arb_constructor(), args in arb_argument_list()) {
        prop_assert_eq!(expand(&ctor, &args), expand(&ctor, &args.clone()));
    }
}

// ---------------------------------------------------------------------------
// Property: tracing is observational
// ---------------------------------------------------------------------------

proptest! {
    /// Tracing records decisions without changing the result.
    #[test]
    fn tracing_does_not_change_result(ctor in arb_constructor(), args in arb_argument_list()) {
        let mut steps = Vec::new();
        let traced = expand_traced(&ctor, &args, &mut steps);
        prop_assert_eq!(&traced, &expand(&ctor, &args));

        if collapses(&args) {
            prop_assert_eq!(steps.len(), 1);
            prop_assert_eq!(steps[0].action, ExpandAction::Collapse);
        } else {
            prop_assert_eq!(steps.len(), args.len() + 1);
            prop_assert_eq!(steps.last().map(|s| s.action), Some(ExpandAction::Concatenate));
        }
        prop_assert_eq!(steps.last().map(|s| s.output.clone()), Some(traced.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Property: argument list validation
// ---------------------------------------------------------------------------

proptest! {
    /// Construction succeeds exactly for non-empty lists with at most one
    /// variadic rest in last position.
    #[test]
    fn argument_list_accepts_exactly_well_formed(args in arb_raw_arguments()) {
        let variadic_positions: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_variadic())
            .map(|(idx, _)| idx)
            .collect();
        let well_formed = !args.is_empty()
            && match variadic_positions.as_slice() {
                [] => true,
                [only] => *only == args.len() - 1,
                _ => false,
            };
        let built = ArgumentList::new(args.clone());
        prop_assert_eq!(built.is_ok(), well_formed);
        if let Ok(list) = built {
            prop_assert_eq!(list.as_slice(), args.as_slice());
        }
    }
}
