use std::path::PathBuf;

use tymap::{TraceReport, check_file, emit_diagnostics, expand_source, format_diagnostics};
use tymap_expand::ExpandConfig;

fn main() {
    let args = std::env::args().collect::<Vec<_>>();
    let command = match parse_cli(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };
    if let Err(message) = run(command) {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Expand {
            annotation,
            params,
            config,
        } => {
            let result = expand_source(&annotation, params.as_deref(), &config).map_err(|err| {
                format_diagnostics(
                    &format!("failed to expand `{annotation}`"),
                    err.diagnostics(),
                )
            })?;
            println!("{}", result.ty);
            if config.trace {
                let report = TraceReport {
                    line: None,
                    annotation: &annotation,
                    result: Some(result.ty.to_string()),
                    expansions: &result.expansions,
                };
                println!("{}", to_json(&report)?);
            }
            Ok(())
        }
        Command::Check { input, config } => {
            let trace = config.trace;
            let result = check_file(&input, &config)?;
            let mut reports = Vec::new();
            for entry in &result.entries {
                match &entry.result {
                    Ok(ty) => println!("{}: {} => {ty}", entry.line, entry.source),
                    Err(diag) => {
                        eprintln!("{}: {}", entry.line, entry.source);
                        emit_diagnostics(std::slice::from_ref(diag));
                    }
                }
                if trace {
                    reports.push(TraceReport {
                        line: Some(entry.line),
                        annotation: &entry.source,
                        result: entry.result.as_ref().ok().map(ToString::to_string),
                        expansions: &entry.expansions,
                    });
                }
            }
            if trace {
                println!("{}", to_json(&reports)?);
            }

            let failed = result.failures().count();
            if failed > 0 {
                return Err(format!(
                    "{failed} of {} entries in `{}` failed to expand",
                    result.entries.len(),
                    input.display()
                ));
            }
            Ok(())
        }
        Command::Help => {
            println!("{}", usage());
            Ok(())
        }
        Command::Version => {
            println!("tymap {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn to_json(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("failed to encode trace: {err}"))
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Expand {
        annotation: String,
        params: Option<String>,
        config: ExpandConfig,
    },
    Check {
        input: PathBuf,
        config: ExpandConfig,
    },
    Help,
    Version,
}

fn parse_cli(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err(usage());
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-V" | "--version" => Ok(Command::Version),
        "expand" => {
            let mut annotation = None;
            let mut params = None;
            let mut config = ExpandConfig::default();

            let mut idx = 2;
            while idx < args.len() {
                match args[idx].as_str() {
                    "--params" => {
                        params = Some(flag_value(args, idx, "--params")?.to_string());
                        idx += 2;
                    }
                    flag if flag.starts_with("--") => {
                        idx += parse_config_flag(args, idx, &mut config)?;
                    }
                    text => {
                        if annotation.is_some() {
                            return Err(format!("unexpected argument `{text}`\n{}", usage()));
                        }
                        annotation = Some(text.to_string());
                        idx += 1;
                    }
                }
            }

            let Some(annotation) = annotation else {
                return Err(format!("missing annotation\n{}", usage()));
            };
            Ok(Command::Expand {
                annotation,
                params,
                config,
            })
        }
        "check" => {
            let mut input = None;
            let mut config = ExpandConfig::default();

            let mut idx = 2;
            while idx < args.len() {
                match args[idx].as_str() {
                    flag if flag.starts_with("--") => {
                        idx += parse_config_flag(args, idx, &mut config)?;
                    }
                    path => {
                        if input.is_some() {
                            return Err(format!("unexpected argument `{path}`\n{}", usage()));
                        }
                        input = Some(PathBuf::from(path));
                        idx += 1;
                    }
                }
            }

            let Some(input) = input else {
                return Err(format!("missing sheet path\n{}", usage()));
            };
            Ok(Command::Check { input, config })
        }
        _ => Err(usage()),
    }
}

/// Apply one of the flags shared by `expand` and `check`. Returns how many
/// arguments it consumed.
fn parse_config_flag(
    args: &[String],
    idx: usize,
    config: &mut ExpandConfig,
) -> Result<usize, String> {
    match args[idx].as_str() {
        "--trace" => {
            config.trace = true;
            Ok(1)
        }
        "--form" => {
            let name = flag_value(args, idx, "--form")?;
            config.special_forms.push(name.to_string());
            Ok(2)
        }
        "--arity" => {
            let spec = flag_value(args, idx, "--arity")?;
            let (name, arity) = spec
                .split_once('=')
                .and_then(|(name, arity)| Some((name.trim(), arity.trim().parse::<usize>().ok()?)))
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| format!("invalid --arity `{spec}`, expected NAME=N"))?;
            config.constructor_arities.insert(name.to_string(), arity);
            Ok(2)
        }
        unknown => Err(format!("unknown argument `{unknown}`\n{}", usage())),
    }
}

fn flag_value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str, String> {
    args.get(idx + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

fn usage() -> String {
    "usage:\n  tymap expand [--params \"T, *Ts\"] [options] \"<annotation>\"\n  tymap check [options] <sheet>\n  tymap --help | --version\n\noptions:\n  --trace         print the expansion trace as JSON\n  --form NAME     also treat NAME (e.g. ext.Map) as the map operator\n  --arity NAME=N  declare the arity of constructor NAME".to_string()
}
