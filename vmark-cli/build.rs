use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of src/transforms.rs; build scripts cannot reach src/ modules
const AVAILABLE_TRANSFORMS: &[&str] = &["mdast-json", "model-json", "model-treeviz"];

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let input = || {
        Arg::new("input")
            .help("Input file path")
            .required(true)
            .index(1)
            .value_hint(ValueHint::FilePath)
    };

    let mut cmd = Command::new("vmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert, normalise and inspect vmark markdown documents")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("ast-pipeline")
                .long("ast-pipeline")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("legacy-pipeline")
                .long("legacy-pipeline")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("list-transforms")
                .long("list-transforms")
                .help("List available inspect transforms and formats")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("inspect").arg(input()).arg(
                Arg::new("transform")
                    .index(2)
                    .value_parser(clap::builder::PossibleValuesParser::new(
                        AVAILABLE_TRANSFORMS,
                    ))
                    .value_hint(ValueHint::Other),
            ),
        )
        .subcommand(
            Command::new("convert")
                .arg(input())
                .arg(Arg::new("from").long("from").value_hint(ValueHint::Other))
                .arg(Arg::new("to").long("to").required(true).value_hint(ValueHint::Other))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(Command::new("format").arg(input()));

    generate_to(Bash, &mut cmd, "vmark", &outdir)?;
    generate_to(Zsh, &mut cmd, "vmark", &outdir)?;
    generate_to(Fish, &mut cmd, "vmark", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
