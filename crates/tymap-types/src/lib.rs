//! Type representations for tymap.
//!
//! This crate defines the semantic types consumed and produced by the map
//! expansion: constructors, type variables, variadic packs, the validated
//! argument list, and the result expression. These are distinct from the
//! syntactic annotations in `tymap-ast`.

use std::fmt;

// ---------------------------------------------------------------------------
// Special forms
// ---------------------------------------------------------------------------

/// A type-level construct recognized by name inside annotations.
///
/// Implementors are uninhabited: they exist only as names for the host to
/// match on, never as values.
pub trait SpecialForm {
    const NAME: &'static str;
}

/// Marker for `Map[F, *Ts]`. Has no variants, so no value of it can exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapForm {}

impl SpecialForm for MapForm {
    const NAME: &'static str = "Map";
}

// ---------------------------------------------------------------------------
// Constructors and variables
// ---------------------------------------------------------------------------

/// Reference to a generic type-forming operator with one type parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeConstructor {
    pub name: String,
}

impl TypeConstructor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// `F[arg]`.
    pub fn apply(&self, arg: Type) -> Type {
        Type::Con {
            name: self.name.clone(),
            args: vec![arg],
        }
    }
}

impl fmt::Display for TypeConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A single type variable, optionally bounded: `T` or `T: int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVar {
    pub name: String,
    pub bound: Option<Box<Type>>,
}

impl TypeVar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound: None,
        }
    }

    pub fn bounded(name: impl Into<String>, bound: Type) -> Self {
        Self {
            name: name.into(),
            bound: Some(Box::new(bound)),
        }
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bound {
            Some(bound) => write!(f, "{}: {bound}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A type-variable tuple: zero or more trailing type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarTuple {
    pub name: String,
}

impl TypeVarTuple {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for TypeVarTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An unpacked variadic pack, optionally with every element wrapped by a
/// constructor: `*Ts` or `*Ts: F`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariadicPack {
    pub var: TypeVarTuple,
    pub mapped_by: Option<TypeConstructor>,
}

impl VariadicPack {
    pub fn plain(var: TypeVarTuple) -> Self {
        Self {
            var,
            mapped_by: None,
        }
    }

    pub fn mapped(var: TypeVarTuple, constructor: TypeConstructor) -> Self {
        Self {
            var,
            mapped_by: Some(constructor),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_by.is_some()
    }
}

impl fmt::Display for VariadicPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mapped_by {
            Some(ctor) => write!(f, "*{}: {ctor}", self.var),
            None => write!(f, "*{}", self.var),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Nominal type, possibly applied: `int`, `list[int]`, `type[T]`.
    Con { name: String, args: Vec<Type> },
    /// Type variable.
    Var(TypeVar),
    /// Fixed tuple, possibly with one variadic element: `tuple[int, *Ts]`.
    Tuple(Vec<Type>),
    /// Unpacked tuple: `*tuple[...]`. The inner type is always a `Tuple`.
    Unpack(Box<Type>),
    /// Variadic pack: `*Ts`, `*Ts: F`.
    Pack(VariadicPack),
}

impl Type {
    /// A nullary nominal type.
    pub fn con(name: impl Into<String>) -> Self {
        Type::Con {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn app(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Con {
            name: name.into(),
            args,
        }
    }

    pub fn unpacked_tuple(elems: Vec<Type>) -> Self {
        Type::Unpack(Box::new(Type::Tuple(elems)))
    }

    /// Whether this type stands for a variable number of positions when it
    /// appears inside an argument or tuple element list.
    pub fn is_unpacked(&self) -> bool {
        matches!(self, Type::Unpack(_) | Type::Pack(_))
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Type]) -> fmt::Result {
    for (i, t) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Con { name, args } if args.is_empty() => write!(f, "{name}"),
            Type::Con { name, args } => {
                write!(f, "{name}[")?;
                write_list(f, args)?;
                write!(f, "]")
            }
            Type::Var(var) => write!(f, "{var}"),
            Type::Tuple(elems) if elems.is_empty() => write!(f, "tuple[()]"),
            Type::Tuple(elems) => {
                write!(f, "tuple[")?;
                write_list(f, elems)?;
                write!(f, "]")
            }
            Type::Unpack(inner) => write!(f, "*{inner}"),
            Type::Pack(pack) => write!(f, "{pack}"),
        }
    }
}

/// Arity of well-known constructors. `None` means unknown or variadic
/// (`tuple`, `Callable`, `Union`).
pub fn builtin_type_constructor_arity(name: &str) -> Option<usize> {
    Some(match name {
        "int" | "float" | "complex" | "str" | "bytes" | "bool" | "object" | "None" => 0,
        "type" | "list" | "set" | "frozenset" | "Iterable" | "Iterator" | "Sequence"
        | "Awaitable" | "Optional" => 1,
        "dict" | "Mapping" => 2,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Argument lists
// ---------------------------------------------------------------------------

/// One element of the list being mapped over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    Concrete(Type),
    Variable(TypeVar),
    VariadicRest(TypeVarTuple),
}

impl TypeArgument {
    pub fn is_variadic(&self) -> bool {
        matches!(self, TypeArgument::VariadicRest(_))
    }
}

impl fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgument::Concrete(ty) => write!(f, "{ty}"),
            TypeArgument::Variable(var) => write!(f, "{var}"),
            TypeArgument::VariadicRest(var) => write!(f, "*{var}"),
        }
    }
}

/// Why an argument list was rejected. Positions are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentListError {
    #[error("no type arguments to map over")]
    Empty,
    #[error("variadic rest at position {second} repeats the one at position {first}")]
    MultipleVariadic { first: usize, second: usize },
    #[error("variadic rest at position {index} must be the last argument")]
    VariadicNotTrailing { index: usize },
}

/// A non-empty argument list with at most one variadic rest, in last position.
///
/// The only way to build one is [`ArgumentList::new`], so holders can rely on
/// the shape without re-checking it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgumentList {
    args: Vec<TypeArgument>,
}

impl ArgumentList {
    pub fn new(args: Vec<TypeArgument>) -> Result<Self, ArgumentListError> {
        if args.is_empty() {
            return Err(ArgumentListError::Empty);
        }
        let mut variadics = args
            .iter()
            .enumerate()
            .filter(|(_, arg)| arg.is_variadic())
            .map(|(idx, _)| idx);
        if let Some(first) = variadics.next() {
            if let Some(second) = variadics.next() {
                return Err(ArgumentListError::MultipleVariadic { first, second });
            }
            if first != args.len() - 1 {
                return Err(ArgumentListError::VariadicNotTrailing { index: first });
            }
        }
        Ok(Self { args })
    }

    pub fn as_slice(&self) -> &[TypeArgument] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Always false for a constructed list.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeArgument> {
        self.args.iter()
    }

    pub fn has_variadic_rest(&self) -> bool {
        self.args.last().is_some_and(TypeArgument::is_variadic)
    }
}

impl<'a> IntoIterator for &'a ArgumentList {
    type Item = &'a TypeArgument;
    type IntoIter = std::slice::Iter<'a, TypeArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a map expansion produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultExpression {
    /// A single mapped type: `F[T]`.
    Single(Type),
    /// An unpacked tuple of mapped types, possibly ending in a mapped pack.
    Unpacked(Vec<Type>),
}

impl ResultExpression {
    /// Convert to a plain type for substitution at the use site.
    ///
    /// `*tuple[*Ts: F]` and `*Ts: F` denote the same thing; the shorter form
    /// is returned.
    pub fn into_type(self) -> Type {
        match self {
            ResultExpression::Single(ty) => ty,
            ResultExpression::Unpacked(mut elems) => {
                if elems.len() == 1 && matches!(elems[0], Type::Pack(_)) {
                    elems.remove(0)
                } else {
                    Type::unpacked_tuple(elems)
                }
            }
        }
    }

    /// Number of fixed positions in the result. A variadic tail is not counted.
    pub fn fixed_len(&self) -> usize {
        match self {
            ResultExpression::Single(_) => 1,
            ResultExpression::Unpacked(elems) => {
                elems.iter().filter(|t| !matches!(t, Type::Pack(_))).count()
            }
        }
    }
}

impl fmt::Display for ResultExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultExpression::Single(ty) => write!(f, "{ty}"),
            ResultExpression::Unpacked(elems) => match elems.as_slice() {
                [pack @ Type::Pack(_)] => write!(f, "{pack}"),
                _ => {
                    write!(f, "*tuple[")?;
                    write_list(f, elems)?;
                    write!(f, "]")
                }
            },
        }
    }
}
