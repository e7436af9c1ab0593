//! Pipeline orchestration.
//!
//! Builds the standard chains the CLI runs: the path is validated
//! up front, then loading, lexing and parsing compose into one
//! pipeline, extended with type resolution and code generation for
//! the commands that need them. Each function constructs its own
//! phase instances, so invocations share nothing.

use std::path::Path;

use log::debug;

use crate::ast::Program;
use crate::codegen_llvm::{CodeGenerator, LlvmModule};
use crate::error::OrbitError;
use crate::lexer::{Lexer, Token};
use crate::parser::Parser;
use crate::phase::Phase;
use crate::source::{SourceLoader, SourceValidator};
use crate::typecheck::{TypeResolver, TypedProgram};

/// Tokenize a source file.
pub fn lex_source(path: impl AsRef<Path>) -> Result<Vec<Token>, OrbitError> {
    let path = SourceValidator::new().execute(path.as_ref().to_path_buf())?;
    debug!("lexing {}", path.display());
    SourceLoader::new().then(Lexer::new()).execute(path)
}

/// Parse a source file to its syntax tree.
pub fn parse_source(path: impl AsRef<Path>) -> Result<Program, OrbitError> {
    let path = SourceValidator::new().execute(path.as_ref().to_path_buf())?;
    debug!("parsing {}", path.display());
    SourceLoader::new()
        .then(Lexer::new())
        .then(Parser::new())
        .execute(path)
}

/// Parse and type-resolve a source file.
pub fn verify_source(path: impl AsRef<Path>) -> Result<TypedProgram, OrbitError> {
    let path = SourceValidator::new().execute(path.as_ref().to_path_buf())?;
    debug!("verifying {}", path.display());
    SourceLoader::new()
        .then(Lexer::new())
        .then(Parser::new())
        .then(TypeResolver::new())
        .execute(path)
}

/// Run the whole pipeline and emit textual LLVM IR.
pub fn emit_llvm_ir(path: impl AsRef<Path>) -> Result<LlvmModule, OrbitError> {
    let path = SourceValidator::new().execute(path.as_ref().to_path_buf())?;
    debug!("compiling {}", path.display());
    SourceLoader::new()
        .then(Lexer::new())
        .then(Parser::new())
        .then(TypeResolver::new())
        .then(CodeGenerator::new())
        .execute(path)
}
