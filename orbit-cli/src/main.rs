use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::debug;
use orbit_core::codegen_llvm::emit_bitcode;
use orbit_core::json;
use orbit_core::{OrbitError, TaggedJson, emit_llvm_ir, lex_source, parse_source, verify_source};

#[derive(Parser, Debug)]
#[command(name = "orb", version, about = "Orbit compiler front end")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token stream of a source file.
    Lex(SourceArgs),
    /// Print the syntax tree of a source file as tagged JSON.
    Parse(SourceArgs),
    /// Parse and type-check a source file.
    Verify(SourceArgs),
    /// Emit an LLVM module for a source file.
    Llvm(LlvmArgs),
    /// Compile a source file to an LLVM module on disk.
    Build(SourceArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to the Orbit source file.
    input: PathBuf,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct LlvmArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Emit textual IR (the default).
    #[arg(short, long)]
    textual: bool,

    /// Emit bitcode instead of textual IR; requires --output.
    #[arg(short, long, conflicts_with = "textual")]
    bitcode: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Failures report on stdout; the exit code still signals
            // them to calling tools.
            println!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    debug!("running {:?}", cli.command);
    match cli.command {
        Command::Lex(args) => {
            let tokens = lex_source(&args.input)?;
            let mut out = String::new();
            for token in &tokens {
                out.push_str(&format!("{token:?}\n"));
            }
            write_output(args.output.as_ref(), out.as_bytes())
        }
        Command::Parse(args) => {
            let program = parse_source(&args.input)?;
            let mut text = json::render(&program.to_json())?;
            text.push('\n');
            write_output(args.output.as_ref(), text.as_bytes())
        }
        Command::Verify(args) => {
            verify_source(&args.input)?;
            let text = format!("{} passed verification\n", args.input.display());
            write_output(args.output.as_ref(), text.as_bytes())
        }
        Command::Llvm(args) => {
            if args.bitcode && args.source.output.is_none() {
                return Err(OrbitError::Validation(
                    "bitcode output requires --output".to_string(),
                )
                .into());
            }
            let module = emit_llvm_ir(&args.source.input)?;
            if args.bitcode {
                let bytes = emit_bitcode(&module)?;
                write_output(args.source.output.as_ref(), &bytes)
            } else {
                write_output(args.source.output.as_ref(), module.to_string().as_bytes())
            }
        }
        Command::Build(args) => {
            let module = emit_llvm_ir(&args.input)?;
            let target = args
                .output
                .clone()
                .unwrap_or_else(|| args.input.with_extension("ll"));
            fs::write(&target, module.to_string())
                .with_context(|| format!("failed to write module to {}", target.display()))
        }
    }
}

fn write_output(target: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match target {
        Some(path) => fs::write(path, bytes)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => io::stdout()
            .write_all(bytes)
            .context("failed to write to stdout"),
    }
}
