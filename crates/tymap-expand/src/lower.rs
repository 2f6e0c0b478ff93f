//! Lowering of parsed annotations to semantic types.
//!
//! This is the host side of the map operator: it resolves type parameters,
//! recognizes `Map[...]` by name, validates the argument list, runs the
//! expansion, and substitutes the result in place. Nested occurrences are
//! expanded inside-out, and unpacked results are spliced into the argument
//! list that contains them.

use std::collections::{BTreeMap, BTreeSet};

use tymap_ast::{SheetEntry, Span, TypeArg, TypeExpr, TypeExprKind, TypeParam};
use tymap_diag::{Category, Diagnostic, SourceLocation};
use tymap_types::{
    ArgumentList, ArgumentListError, MapForm, SpecialForm, Type, TypeArgument, TypeConstructor,
    TypeVar, TypeVarTuple, VariadicPack, builtin_type_constructor_arity,
};

use crate::trace::Expansion;
use crate::{expand, expand_traced};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Host settings for recognizing and checking the map operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandConfig {
    /// Dotted names treated as the map operator. Matched against the full
    /// path as written, so `ext.Map` must be listed to be recognized.
    pub special_forms: Vec<String>,
    /// Constructor arities that take precedence over the builtin table.
    pub constructor_arities: BTreeMap<String, usize>,
    /// Record an [`Expansion`] for every occurrence.
    pub trace: bool,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            special_forms: vec![MapForm::NAME.to_string()],
            constructor_arities: BTreeMap::new(),
            trace: false,
        }
    }
}

impl ExpandConfig {
    pub fn with_special_form(mut self, name: impl Into<String>) -> Self {
        self.special_forms.push(name.into());
        self
    }

    pub fn with_arity(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.constructor_arities.insert(name.into(), arity);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn is_special_form(&self, kind: &TypeExprKind) -> bool {
        match kind {
            TypeExprKind::Name(path) => {
                let joined = path.join(".");
                self.special_forms.iter().any(|name| *name == joined)
            }
            _ => false,
        }
    }

    /// Known arity of a constructor, if any.
    pub fn arity(&self, name: &str) -> Option<usize> {
        self.constructor_arities
            .get(name)
            .copied()
            .or_else(|| builtin_type_constructor_arity(name))
    }
}

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

/// Type parameters visible to one annotation.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: BTreeMap<String, TypeVar>,
    var_tuples: BTreeSet<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, var: TypeVar) -> Self {
        self.vars.insert(var.name.clone(), var);
        self
    }

    pub fn with_var_tuple(mut self, name: impl Into<String>) -> Self {
        self.var_tuples.insert(name.into());
        self
    }

    pub fn var(&self, name: &str) -> Option<&TypeVar> {
        self.vars.get(name)
    }

    pub fn is_var_tuple(&self, name: &str) -> bool {
        self.var_tuples.contains(name)
    }

    fn declares(&self, name: &str) -> bool {
        self.vars.contains_key(name) || self.var_tuples.contains(name)
    }
}

// ---------------------------------------------------------------------------
// Lowerer
// ---------------------------------------------------------------------------

/// Lower one annotation with the given type parameters in scope.
pub fn lower_annotation(
    expr: &TypeExpr,
    params: &[TypeParam],
    config: &ExpandConfig,
) -> Result<Type, Diagnostic> {
    let mut lowerer = Lowerer::new(config);
    let scope = lowerer.scope_from_params(params)?;
    lowerer.lower_type(expr, &scope)
}

/// Walks annotations, expanding every map operator it meets.
pub struct Lowerer<'c> {
    config: &'c ExpandConfig,
    expansions: Vec<Expansion>,
}

impl<'c> Lowerer<'c> {
    pub fn new(config: &'c ExpandConfig) -> Self {
        Self {
            config,
            expansions: Vec::new(),
        }
    }

    /// Expansions recorded since the last call. Empty unless tracing is on.
    pub fn take_expansions(&mut self) -> Vec<Expansion> {
        std::mem::take(&mut self.expansions)
    }

    /// Lower one sheet line with its own parameters in scope.
    pub fn lower_entry(&mut self, entry: &SheetEntry) -> Result<Type, Diagnostic> {
        let scope = self.scope_from_params(&entry.params)?;
        self.lower_type(&entry.annotation, &scope)
    }

    /// Build a scope from declared parameters. Bounds may refer to earlier
    /// parameters.
    pub fn scope_from_params(&mut self, params: &[TypeParam]) -> Result<Scope, Diagnostic> {
        let mut scope = Scope::new();
        for param in params {
            let name = param.name();
            if scope.declares(&name.node) {
                return Err(type_error(
                    format!("duplicate type parameter `{}`", name.node),
                    name.span,
                ));
            }
            scope = match param {
                TypeParam::Var { name, bound: None } => scope.with_var(TypeVar::new(&name.node)),
                TypeParam::Var {
                    name,
                    bound: Some(bound),
                } => {
                    let bound = self.lower_type(bound, &scope)?;
                    scope.with_var(TypeVar::bounded(&name.node, bound))
                }
                TypeParam::VarTuple { name } => scope.with_var_tuple(&name.node),
            };
        }
        Ok(scope)
    }

    pub fn lower_type(&mut self, expr: &TypeExpr, scope: &Scope) -> Result<Type, Diagnostic> {
        match &expr.node {
            kind @ TypeExprKind::Name(path) => {
                if self.config.is_special_form(kind) {
                    return Err(Diagnostic::error(
                        Category::EmptyArguments,
                        format!(
                            "`{}` needs a constructor and at least one type argument",
                            path.join(".")
                        ),
                    )
                    .at(loc(expr.span))
                    .with_default_help());
                }
                if let [name] = path.as_slice() {
                    if let Some(var) = scope.var(name) {
                        return Ok(Type::Var(var.clone()));
                    }
                    if scope.is_var_tuple(name) {
                        return Err(type_error(
                            format!("type variable tuple `{name}` must be unpacked as `*{name}`"),
                            expr.span,
                        ));
                    }
                }
                Ok(Type::con(path.join(".")))
            }
            TypeExprKind::Subscript { base, args } => {
                if self.config.is_special_form(&base.node) {
                    return self.lower_map(base, args, expr.span, scope);
                }
                let Some(name) = base.node.dotted_name() else {
                    return Err(type_error("only named types can be subscripted", base.span));
                };
                if name == "tuple" {
                    return self.lower_tuple(args, scope);
                }
                let args = self.lower_generic_args(args, scope)?;
                Ok(Type::app(name, args))
            }
            TypeExprKind::Star(inner) => self.lower_star(inner, expr.span, scope),
            TypeExprKind::Call { callee } => Err(self.call_error(callee, expr.span)),
            TypeExprKind::EmptyTuple => Err(type_error(
                "`()` is only valid as the sole argument of `tuple[()]`",
                expr.span,
            )),
        }
    }

    // -- The map operator --

    fn lower_map(
        &mut self,
        base: &TypeExpr,
        args: &[TypeArg],
        span: Span,
        scope: &Scope,
    ) -> Result<Type, Diagnostic> {
        let form = base.node.dotted_name().unwrap_or_default();
        let (first, rest) = args
            .split_first()
            .ok_or_else(|| empty_arguments(&form, span))?;
        let constructor = self.constructor(first, &form, scope)?;
        if rest.is_empty() {
            return Err(empty_arguments(&form, span));
        }

        let mut arguments = Vec::new();
        let mut spans = Vec::new();
        for arg in rest {
            match arg {
                TypeArg::Bounded { name, bound } => {
                    if scope.is_var_tuple(&name.node) {
                        return Err(type_error(
                            format!("type variable tuple `{}` cannot have a bound", name.node),
                            name.span,
                        ));
                    }
                    let bound = self.lower_type(bound, scope)?;
                    arguments.push(TypeArgument::Variable(TypeVar::bounded(&name.node, bound)));
                    spans.push(arg.span());
                }
                TypeArg::Type(expr) => {
                    let ty = self.lower_type(expr, scope)?;
                    classify_argument(ty, expr.span, &mut arguments, &mut spans)?;
                }
            }
        }

        let list = ArgumentList::new(arguments)
            .map_err(|err| argument_list_error(err, &form, span, &spans))?;

        let result = if self.config.trace {
            let mut steps = Vec::new();
            let result = expand_traced(&constructor, &list, &mut steps);
            self.expansions.push(Expansion {
                constructor: constructor.name.clone(),
                arguments: list.iter().map(ToString::to_string).collect(),
                result: result.to_string(),
                span: Some((span.start, span.end)),
                steps,
            });
            result
        } else {
            expand(&constructor, &list)
        };
        Ok(result.into_type())
    }

    /// The first argument must be a bare constructor name of arity one.
    fn constructor(
        &self,
        arg: &TypeArg,
        form: &str,
        scope: &Scope,
    ) -> Result<TypeConstructor, Diagnostic> {
        let invalid = |message: String, span: Span| {
            Diagnostic::error(Category::InvalidConstructor, message)
                .at(loc(span))
                .with_default_help()
        };
        let expr = match arg {
            TypeArg::Type(expr) => expr,
            TypeArg::Bounded { name, .. } => {
                return Err(invalid(
                    format!(
                        "`{form}` maps a constructor, not the type variable `{}`",
                        name.node
                    ),
                    arg.span(),
                ));
            }
        };
        let TypeExprKind::Name(path) = &expr.node else {
            return Err(invalid(
                format!("the first argument of `{form}` must be a bare constructor name"),
                expr.span,
            ));
        };
        let name = path.join(".");
        if path.len() == 1 && scope.declares(&name) {
            return Err(invalid(
                format!("`{form}` maps a constructor, not the type variable `{name}`"),
                expr.span,
            ));
        }
        if self.config.is_special_form(&expr.node) {
            return Err(invalid(
                format!("`{name}` is a special form and cannot be mapped"),
                expr.span,
            ));
        }
        if let Some(arity) = self.config.arity(&name)
            && arity != 1
        {
            return Err(Diagnostic::error(
                Category::ArityMismatch,
                format!(
                    "`{name}` takes {arity} type parameter(s); `{form}` needs a one-parameter constructor"
                ),
            )
            .at(loc(expr.span))
            .with_default_help());
        }
        Ok(TypeConstructor::new(name))
    }

    // -- Tuples, generics, and unpacking --

    fn lower_tuple(&mut self, args: &[TypeArg], scope: &Scope) -> Result<Type, Diagnostic> {
        if let [TypeArg::Type(expr)] = args
            && expr.node == TypeExprKind::EmptyTuple
        {
            return Ok(Type::Tuple(Vec::new()));
        }
        let elems = self.lower_generic_args(args, scope)?;
        let packs: Vec<usize> = elems
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t, Type::Pack(_)))
            .map(|(idx, _)| idx)
            .collect();
        if packs.len() > 1 {
            let span = args
                .last()
                .map(TypeArg::span)
                .unwrap_or_else(Span::synthetic);
            return Err(type_error(
                "a tuple may contain at most one variadic pack",
                span,
            ));
        }
        Ok(Type::Tuple(elems))
    }

    /// Lower subscript arguments of an ordinary generic, splicing unpacked
    /// fixed tuples in place.
    fn lower_generic_args(
        &mut self,
        args: &[TypeArg],
        scope: &Scope,
    ) -> Result<Vec<Type>, Diagnostic> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            let expr = match arg {
                TypeArg::Type(expr) => expr,
                TypeArg::Bounded { name, .. } => {
                    return Err(type_error(
                        format!(
                            "inline bound on `{}` is only allowed in map arguments; declare it as a type parameter",
                            name.node
                        ),
                        arg.span(),
                    ));
                }
            };
            match self.lower_type(expr, scope)? {
                Type::Unpack(inner) => match *inner {
                    Type::Tuple(elems) => out.extend(elems),
                    other => out.push(Type::Unpack(Box::new(other))),
                },
                ty => out.push(ty),
            }
        }
        Ok(out)
    }

    fn lower_star(
        &mut self,
        inner: &TypeExpr,
        span: Span,
        scope: &Scope,
    ) -> Result<Type, Diagnostic> {
        match &inner.node {
            TypeExprKind::Name(path) if path.len() == 1 && !self.config.is_special_form(&inner.node) => {
                let name = &path[0];
                if scope.var(name).is_some() {
                    return Err(type_error(
                        format!("`{name}` is a type variable, not a type variable tuple"),
                        inner.span,
                    ));
                }
                // Undeclared names under `*` are taken as implicit variable tuples.
                Ok(Type::Pack(VariadicPack::plain(TypeVarTuple::new(name))))
            }
            TypeExprKind::Subscript { base, .. } => {
                let is_tuple = base.node.dotted_name().as_deref() == Some("tuple");
                let is_map = self.config.is_special_form(&base.node);
                if !is_tuple && !is_map {
                    return Err(type_error(
                        "only tuples and type variable tuples can be unpacked",
                        span,
                    ));
                }
                match self.lower_type(inner, scope)? {
                    Type::Tuple(elems) => Ok(Type::unpacked_tuple(elems)),
                    ty if ty.is_unpacked() => Ok(ty),
                    ty => Err(type_error(
                        format!("`{ty}` is a single type and cannot be unpacked"),
                        span,
                    )),
                }
            }
            _ => Err(type_error(
                "only tuples and type variable tuples can be unpacked",
                span,
            )),
        }
    }

    fn call_error(&self, callee: &TypeExpr, span: Span) -> Diagnostic {
        let form = match &callee.node {
            TypeExprKind::Subscript { base, .. } if self.config.is_special_form(&base.node) => {
                base.node.dotted_name()
            }
            kind if self.config.is_special_form(kind) => kind.dotted_name(),
            _ => None,
        };
        match form {
            Some(form) => Diagnostic::error(
                Category::Instantiation,
                format!("`{form}` is a type-level construct and cannot be instantiated"),
            )
            .at(loc(span))
            .with_default_help(),
            None => type_error("call expressions are not valid in annotations", span),
        }
    }
}

/// Sort one lowered map argument into the argument list. Unpacked fixed
/// tuples contribute each of their elements.
fn classify_argument(
    ty: Type,
    span: Span,
    arguments: &mut Vec<TypeArgument>,
    spans: &mut Vec<Span>,
) -> Result<(), Diagnostic> {
    match ty {
        Type::Var(var) => {
            arguments.push(TypeArgument::Variable(var));
            spans.push(span);
        }
        Type::Pack(VariadicPack {
            var,
            mapped_by: None,
        }) => {
            arguments.push(TypeArgument::VariadicRest(var));
            spans.push(span);
        }
        Type::Pack(VariadicPack {
            var,
            mapped_by: Some(ctor),
        }) => {
            return Err(Diagnostic::error(
                Category::NestedMapping,
                format!("`*{var}` is already mapped by `{ctor}` and cannot be mapped again"),
            )
            .at(loc(span))
            .with_default_help());
        }
        Type::Unpack(inner) => match *inner {
            Type::Tuple(elems) => {
                for elem in elems {
                    classify_argument(elem, span, arguments, spans)?;
                }
            }
            other => {
                return Err(type_error(
                    format!("`*{other}` cannot be used as a map argument"),
                    span,
                ));
            }
        },
        ty => {
            arguments.push(TypeArgument::Concrete(ty));
            spans.push(span);
        }
    }
    Ok(())
}

fn argument_list_error(
    err: ArgumentListError,
    form: &str,
    span: Span,
    spans: &[Span],
) -> Diagnostic {
    let at = |idx: usize| loc(spans.get(idx).copied().unwrap_or(span));
    match err {
        ArgumentListError::Empty => empty_arguments(form, span),
        ArgumentListError::MultipleVariadic { first, second } => Diagnostic::error(
            Category::MalformedArguments,
            format!("`{form}` accepts at most one variadic rest"),
        )
        .at(at(second))
        .with_label(at(first), "first variadic rest here")
        .with_default_help(),
        ArgumentListError::VariadicNotTrailing { index } => Diagnostic::error(
            Category::MalformedArguments,
            format!("the variadic rest must be the last argument of `{form}`"),
        )
        .at(at(index))
        .with_default_help(),
    }
}

fn empty_arguments(form: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        Category::EmptyArguments,
        format!("`{form}` has no type arguments to map over"),
    )
    .at(loc(span))
    .with_default_help()
}

fn type_error(message: impl Into<String>, span: Span) -> Diagnostic {
    Diagnostic::error(Category::TypeError, message).at(loc(span))
}

fn loc(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}
