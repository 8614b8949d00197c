//! A bytecode interpreter for Charis, a small dynamically-typed scripting
//! language whose core is a single Pratt-parsed expression grammar.
//!
//! See [part III][bytecode] of [Crafting Interpreters][book] for the
//! scanner/compiler/VM architecture this crate follows.
//!
//! [book]: https://craftinginterpreters.com/
//! [bytecode]: https://craftinginterpreters.com/a-bytecode-virtual-machine.html

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod scanner;
pub mod value;
pub mod vm;

/// The type returned by functions that scan, compile, and run Charis source.
/// This is the standard [std::result::Result], but the error is always
/// [error::InterpretationError].
///
/// ```
/// fn compile() -> charis::Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, error::InterpretationError>;

/// Re-exports the items most callers need: the VM entry point and its
/// options struct.
pub mod prelude {
    pub use crate::error::InterpretationError;
    pub use crate::vm::{Vm, VmOptions};
}
