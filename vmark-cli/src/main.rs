// Command-line interface for vmark
//
// A shell around the vmark-babel library: it reads files, picks the markdown
// pipeline from the config and flags, and prints or writes the result.
//
// Usage:
//  vmark <input> --to <format> [--from <format>] [-o <file>]          - Convert (default)
//  vmark convert <input> --to <format> [--from <format>] [-o <file>]  - Same as above (explicit)
//  vmark format <input>                    - markdown → document → markdown
//  vmark inspect <input> [<transform>]     - Show a stage (defaults to "model-treeviz")
//  vmark --list-transforms                 - List inspect transforms and formats
//
// Pipeline selection:
//
// `[pipeline] use_ast_pipeline` in the config picks the markdown pipeline, and
// `--ast-pipeline` / `--legacy-pipeline` override it for one run.
//
// Extra Parameters:
//
// Format-specific parameters are passed as --extra-<parameter-name> <value>. The
// "extra-" prefix is stripped and the rest handed to the target format, e.g.
//  vmark format notes.md --extra-bullet-marker +
//  vmark inspect notes.md --extra-show-linum

mod transforms;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::collections::HashMap;
use std::fs;
use tracing::debug;
use vmark_babel::formats::markdown::apply_options;
use vmark_babel::{
    parse_markdown, serialize_markdown, set_ast_pipeline_enabled, Document, FormatRegistry,
    PipelineOptions, Schema,
};
use vmark_config::{Loader, VmarkConfig};

const SUBCOMMANDS: &[&str] = &["inspect", "convert", "format", "help"];

/// Splits `--extra-<key> [value]` arguments off the command line.
///
/// Returns the remaining arguments and the extracted parameters. A key with
/// no value (end of args or followed by a flag) is read as `"true"`.
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if let Some(key) = arg.strip_prefix("--extra-") {
            match args.get(i + 1) {
                Some(next) if !next.starts_with('-') => {
                    extra_params.insert(key.to_string(), next.clone());
                    i += 2;
                }
                _ => {
                    extra_params.insert(key.to_string(), "true".to_string());
                    i += 1;
                }
            }
            continue;
        }
        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn build_cli() -> Command {
    Command::new("vmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert, normalise and inspect vmark markdown documents")
        .long_about(
            "vmark converts markdown to and from the editor's document model.\n\n\
            Commands:\n  \
            - convert: Transform between formats (markdown, markdown-legacy, json, treeviz)\n  \
            - format:  Parse and re-serialize markdown\n  \
            - inspect: View the markdown syntax tree or the document model\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to pass format-specific options.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            vmark notes.md --to json                  # Document model as JSON\n  \
            vmark format notes.md --ast-pipeline      # Normalise with the AST pipeline\n  \
            vmark inspect notes.md mdast-json         # Markdown syntax tree",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("list-transforms")
                .long("list-transforms")
                .help("List available inspect transforms and formats")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a vmark.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("ast-pipeline")
                .long("ast-pipeline")
                .help("Use the AST markdown pipeline")
                .action(ArgAction::SetTrue)
                .conflicts_with("legacy-pipeline")
                .global(true),
        )
        .arg(
            Arg::new("legacy-pipeline")
                .long("legacy-pipeline")
                .help("Use the legacy comrak-native markdown pipeline")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log debug output to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the stages of the markdown pipeline")
                .long_about(
                    "View a markdown file at different processing stages.\n\n\
                    Transforms (stage-format):\n  \
                    - mdast-json:     Markdown syntax tree as JSON\n  \
                    - model-json:     Document model as JSON\n  \
                    - model-treeviz:  Document model as a tree (default)\n\n\
                    Extra Parameters:\n  \
                    --extra-show-linum    Prefix tree lines with source lines\n  \
                    --extra-pretty false  Compact JSON",
                )
                .arg(
                    Arg::new("path")
                        .help("Path to the markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("transform")
                        .help("Transform to apply. Defaults to 'model-treeviz'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            transforms::AVAILABLE_TRANSFORMS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .long_about(
                    "Convert documents between formats.\n\n\
                    Supported formats:\n  \
                    - markdown:         Markdown through the configured pipeline (.md)\n  \
                    - markdown-legacy:  Markdown through comrak's native extensions\n  \
                    - json:             Document model as JSON (.json)\n  \
                    - treeviz:          Tree view of the document model (output only)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("format")
                .about("Normalise a markdown file")
                .long_about(
                    "Parse a markdown file and serialize it again with the configured\n\
                    pipeline and serializer options. Output goes to stdout.\n\n\
                    Examples:\n  \
                    vmark format notes.md                          # Format to stdout\n  \
                    vmark format notes.md --extra-bullet-marker +  # Use + bullets",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                ),
        )
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, extra_params) = parse_extra_args(&args);

    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            // `vmark notes.md --to json` means convert
            match cleaned_args.get(1) {
                Some(first)
                    if !first.starts_with('-') && !SUBCOMMANDS.contains(&first.as_str()) =>
                {
                    let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                    new_args.extend_from_slice(&cleaned_args[1..]);
                    cli.try_get_matches_from(&new_args)
                        .unwrap_or_else(|e2| e2.exit())
                }
                _ => e.exit(),
            }
        }
    };

    if matches.get_flag("list-transforms") {
        handle_list_transforms_command();
        return;
    }

    let config = load_cli_config(&matches);
    init_logging(matches.get_flag("verbose"), &config);
    set_ast_pipeline_enabled(config.pipeline.use_ast_pipeline);
    let options = config.pipeline_options();
    debug!(use_ast_pipeline = config.pipeline.use_ast_pipeline, "configuration loaded");

    match matches.subcommand() {
        Some(("inspect", sub_matches)) => {
            let path = sub_matches
                .get_one::<String>("path")
                .expect("path is required");
            let transform = sub_matches
                .get_one::<String>("transform")
                .map(|s| s.as_str())
                .unwrap_or(transforms::DEFAULT_TRANSFORM);
            handle_inspect_command(path, transform, &options, &extra_params, &config);
        }
        Some(("convert", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            let to = sub_matches.get_one::<String>("to").expect("to is required");
            let from = match sub_matches.get_one::<String>("from") {
                Some(f) => f.to_string(),
                None => FormatRegistry::default()
                    .detect_format_from_filename(input)
                    .unwrap_or_else(|| {
                        eprintln!("Error: Could not detect format from filename '{input}'");
                        eprintln!("Please specify --from explicitly");
                        std::process::exit(1);
                    }),
            };
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_convert_command(input, &from, to, output, options, &extra_params, &config);
        }
        Some(("format", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            handle_convert_command(
                input,
                "markdown",
                "markdown",
                None,
                options,
                &extra_params,
                &config,
            );
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn handle_inspect_command(
    path: &str,
    transform: &str,
    options: &PipelineOptions,
    extra_params: &HashMap<String, String>,
    config: &VmarkConfig,
) {
    let source = read_input(path);

    let mut params = HashMap::new();
    params.insert("pretty".to_string(), config.inspect.pretty_json.to_string());
    params.insert(
        "show-linum".to_string(),
        config.inspect.show_line_numbers.to_string(),
    );
    params.extend(extra_params.clone());

    let output = transforms::execute_transform(&source, transform, options, &params)
        .unwrap_or_else(|e| {
            eprintln!("Execution error: {e}");
            std::process::exit(1);
        });

    print!("{output}");
}

fn handle_convert_command(
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    mut options: PipelineOptions,
    extra_params: &HashMap<String, String>,
    config: &VmarkConfig,
) {
    let registry = FormatRegistry::default();

    for name in [from, to] {
        if let Err(e) = registry.get(name) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    let source = read_input(input);
    debug!(input, from, to, "converting");

    let doc = if from == "markdown" {
        parse_markdown(&Schema::full(), &source, &options)
    } else {
        registry.parse(&source, from).unwrap_or_else(|e| {
            eprintln!("Parse error: {e}");
            std::process::exit(1);
        })
    };

    let result = if to == "markdown" {
        if let Err(e) = apply_options(&mut options.serialize, extra_params) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        serialize_markdown(&Schema::full(), &doc, &options)
    } else {
        serialize_with_config(&registry, &doc, to, extra_params, config)
    };

    match output {
        Some(path) => {
            fs::write(path, result).unwrap_or_else(|e| {
                eprintln!("Error writing file '{path}': {e}");
                std::process::exit(1);
            });
        }
        None => print!("{result}"),
    }
}

/// Serializes through the registry, seeding format options from the config.
fn serialize_with_config(
    registry: &FormatRegistry,
    doc: &Document,
    to: &str,
    extra_params: &HashMap<String, String>,
    config: &VmarkConfig,
) -> String {
    let mut format_options = HashMap::new();
    match to {
        "json" => {
            format_options.insert("pretty".to_string(), config.inspect.pretty_json.to_string());
        }
        "treeviz" => {
            format_options.insert(
                "show-linum".to_string(),
                config.inspect.show_line_numbers.to_string(),
            );
        }
        _ => {}
    }
    format_options.extend(extra_params.clone());

    let mut text = registry
        .serialize_with_options(doc, to, &format_options)
        .unwrap_or_else(|e| {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        });
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn handle_list_transforms_command() {
    println!("Available transforms:\n");
    println!("Stages:");
    println!("  mdast       - Markdown syntax tree (AST pipeline)");
    println!("  model       - Document model\n");

    println!("Available transform combinations:");
    for transform_name in transforms::AVAILABLE_TRANSFORMS {
        println!("  {transform_name}");
    }

    println!("\nConversion formats:");
    let registry = FormatRegistry::default();
    for format_name in registry.list_formats() {
        println!("  {format_name}");
    }
}

fn read_input(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

fn load_cli_config(matches: &ArgMatches) -> VmarkConfig {
    let loader = Loader::new().with_optional_file("vmark.toml");
    let loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader,
    };

    let pipeline_override = if matches.get_flag("ast-pipeline") {
        Some(true)
    } else if matches.get_flag("legacy-pipeline") {
        Some(false)
    } else {
        None
    };
    let loader = match pipeline_override {
        Some(enabled) => loader.set_override("pipeline.use_ast_pipeline", enabled),
        None => Ok(loader),
    };

    loader.and_then(Loader::build).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn init_logging(verbose: bool, config: &VmarkConfig) {
    let directive = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .init();
}
