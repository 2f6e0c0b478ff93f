//! Input builders shared by the `core` benchmarks.

use tymap_types::{ArgumentList, Type, TypeArgument, TypeVar, TypeVarTuple};

const SCALARS: [&str; 4] = ["int", "str", "bytes", "float"];

/// `width` arguments cycling through concrete types and variables, closed by
/// a variadic rest.
pub fn build_argument_list(width: usize) -> ArgumentList {
    let mut args: Vec<TypeArgument> = (0..width.saturating_sub(1))
        .map(|idx| {
            if idx % 3 == 2 {
                TypeArgument::Variable(TypeVar::new(format!("T{idx}")))
            } else {
                TypeArgument::Concrete(Type::app(
                    "list",
                    vec![Type::con(SCALARS[idx % SCALARS.len()])],
                ))
            }
        })
        .collect();
    args.push(TypeArgument::VariadicRest(TypeVarTuple::new("Ts")));
    match ArgumentList::new(args) {
        Ok(list) => list,
        Err(err) => panic!("benchmark argument list is malformed: {err}"),
    }
}

/// A sheet of `line_count` entries, each one a flat map over a few types.
pub fn build_flat_sheet(line_count: usize) -> String {
    let mut source = String::from("# generated\n");
    for idx in 0..line_count {
        let ty = SCALARS[idx % SCALARS.len()];
        source.push_str(&format!(
            "[T{idx}, *Ts] Map[type, {ty}, dict[str, {ty}], T{idx}, *Ts]\n"
        ));
    }
    source
}

/// `Map[list, Map[list, ... Map[type, int, str] ...]]` nested `depth` times.
pub fn build_nested_annotation(depth: usize) -> String {
    let mut source = String::from("Map[type, int, str]");
    for _ in 0..depth {
        source = format!("Map[list, {source}]");
    }
    source
}
