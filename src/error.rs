//! Provides [InterpretationError], the error most of `charis` returns.
use thiserror::Error;

/// Any error that can occur while compiling or running Charis source.
///
/// Lex/parse errors and runtime type errors are reported (with a line
/// number) to stderr as they happen; this enum only carries the coarse
/// result code back to the caller, matching spec §4.6's `InterpretResult`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InterpretationError {
    /// A compile-time error: a lex or parse failure.
    #[error("compile-time error")]
    CompileError,
    /// A runtime error: a type mismatch in arithmetic/comparison, surfaced
    /// after the chunk started executing.
    #[error("runtime error")]
    RuntimeError,
}
