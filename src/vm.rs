//! The bytecode virtual machine: a dispatch loop over a dynamically grown
//! value stack.

use crate::chunk::Chunk;
use crate::chunk::OpCode;
use crate::compiler;
use crate::error::InterpretationError;
use crate::value::Value;

/// Initial stack capacity. The stack is a plain growable [Vec], so this is
/// only a starting point — [Vec::push] reallocates geometrically as needed.
const STACK_SIZE: usize = 256;

/// Runtime flags for the two switches spec §6 calls
/// `DEBUG_PRINT_CODE`/`DEBUG_TRACE_EXECUTION`, threaded in from the CLI
/// instead of baked in as compile-time `#define`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmOptions {
    /// Disassemble each chunk to stdout right after it's compiled.
    pub print_code: bool,
    /// Print the stack and the next instruction before every dispatch.
    pub trace_execution: bool,
}

/// Maintains state for the Charis virtual machine.
#[derive(Default)]
pub struct Vm {
    options: VmOptions,
}

/// State that only exists while a [Chunk] is actively running.
struct Run<'a> {
    /// Instruction pointer: index into `chunk`'s code for the next opcode.
    ip: usize,
    /// The value stack, pushed to and popped from during dispatch.
    stack: Vec<Value>,
    chunk: &'a Chunk,
    options: VmOptions,
}

impl Vm {
    /// Creates a VM with the given debug options.
    pub fn new(options: VmOptions) -> Self {
        Vm { options }
    }

    /// Compiles `source` and, if that succeeds, runs the resulting chunk.
    ///
    /// Each call gets a fresh [Chunk] and a freshly reset stack — per spec
    /// §5, there is no shared mutable state between `interpret` calls beyond
    /// the options this VM was built with.
    pub fn interpret(&mut self, source: &str) -> crate::Result<()> {
        tracing::debug!("interpreting");
        let chunk = compiler::compile(source, self.options.print_code)?;
        let mut run = Run {
            ip: 0,
            stack: Vec::with_capacity(STACK_SIZE),
            chunk: &chunk,
            options: self.options,
        };
        run.run()
    }
}

impl<'a> Run<'a> {
    /// The main dispatch loop: one instruction per iteration.
    fn run(&mut self) -> crate::Result<()> {
        use OpCode::*;

        loop {
            if self.options.trace_execution {
                self.trace();
            }

            let opcode = self
                .fetch()
                .as_opcode()
                .unwrap_or_else(|| panic!("fetched invalid opcode at {}", self.ip - 1));

            tracing::trace!(?opcode, stack_depth = self.stack.len(), "dispatch");

            match opcode {
                Constant => {
                    let constant = self
                        .fetch()
                        .resolve_constant()
                        .expect("compiler only ever emits valid constant indices");
                    self.push(constant);
                }
                Null => self.push(Value::Null),
                True => self.push(Value::Boolean(true)),
                False => self.push(Value::Boolean(false)),
                Not => {
                    let value = self.pop();
                    self.push(Value::Boolean(value.is_falsey()));
                }
                Negate => {
                    if self.peek(0).is_number() {
                        let n = self.pop().as_number();
                        self.push(Value::Number(-n));
                    } else {
                        return self.runtime_error("Operand must be a number.");
                    }
                }
                Add => self.binary_numeric(|a, b| a + b)?,
                Subtract => self.binary_numeric(|a, b| a - b)?,
                Multiply => self.binary_numeric(|a, b| a * b)?,
                Divide => self.binary_numeric(|a, b| a / b)?,
                Equal => {
                    let b = coerce_bool_to_number(self.pop());
                    let a = coerce_bool_to_number(self.pop());
                    self.push(Value::Boolean(values_equal(a, b)));
                }
                Greater => self.binary_comparison(|a, b| a > b)?,
                Less => self.binary_comparison(|a, b| a < b)?,
                Return => {
                    let value = self.pop();
                    println!("{value}");
                    return Ok(());
                }
            }
        }
    }

    /// Prints the current stack contents and the next instruction to be
    /// executed. Used by `DEBUG_TRACE_EXECUTION`.
    fn trace(&self) {
        print!("          ");
        for value in self.stack.iter() {
            print!("[ {value} ]");
        }
        println!();
        crate::debug::disassemble_instruction(self.chunk, self.ip);
    }

    /// Fetches the byte at `ip` and advances `ip` past it.
    fn fetch(&mut self) -> crate::chunk::BytecodeEntry<'a> {
        let entry = self
            .chunk
            .get(self.ip)
            .expect("ip ran past the end of the chunk");
        self.ip += 1;
        entry
    }

    /// Reports a runtime error, following spec §4.6's format, then resets
    /// the stack and returns [InterpretationError::RuntimeError].
    fn runtime_error<T>(&mut self, message: &str) -> crate::Result<T> {
        eprintln!("{message}");
        let line = self
            .chunk
            .line_number_for(self.ip - 1)
            .expect("every executed offset has a line");
        eprintln!("[line {line}] in script");

        self.reset_stack();
        Err(InterpretationError::RuntimeError)
    }

    /// Pops two Number operands and pushes `op(a, b)` as a [Value::Number].
    /// Division by zero follows IEEE-754 (`inf`/`NaN`); it is not an error.
    fn binary_numeric(&mut self, op: impl Fn(f64, f64) -> f64) -> crate::Result<()> {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            return self.runtime_error("Operand(s) must be number(s).");
        }
        let b = self.pop().as_number();
        let a = self.pop().as_number();
        self.push(Value::Number(op(a, b)));
        Ok(())
    }

    /// Pops two operands, applying the Boolean→Number coercion spec §4.6
    /// requires for `Greater`/`Less`, and pushes `op(a, b)` as a [Value::Boolean].
    fn binary_comparison(&mut self, op: impl Fn(f64, f64) -> bool) -> crate::Result<()> {
        let b = coerce_bool_to_number(self.pop());
        let a = coerce_bool_to_number(self.pop());
        if !a.is_number() || !b.is_number() {
            return self.runtime_error("Operand(s) must be number(s).");
        }
        self.push(Value::Boolean(op(a.as_number(), b.as_number())));
        Ok(())
    }

    /// Pushes a [Value] onto the value stack.
    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pops and returns the top [Value] on the value stack.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty. Well-formed bytecode never pops an
    /// empty stack; the compiler's arity contract guarantees enough operands
    /// are present before dispatch. A panic here indicates a compiler bug,
    /// not a user-facing runtime error.
    fn pop(&mut self) -> Value {
        self.stack.pop().expect("value stack underflow: compiler bug")
    }

    /// Peeks `distance` values down from the top of the stack, without
    /// popping.
    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }
}

/// Coerces a Boolean to a Number (`true` → `1.0`, `false` → `0.0`), leaving
/// every other value unchanged.
///
/// Unusual for a Lox-family language, but spec §4.6 requires it for `Equal`,
/// `Greater`, and `Less` and explicitly flags it as intentional; preserved
/// verbatim rather than "fixed".
fn coerce_bool_to_number(value: Value) -> Value {
    match value {
        Value::Boolean(b) => Value::Number(if b { 1.0 } else { 0.0 }),
        other => other,
    }
}

/// Equality after Boolean→Number coercion (spec §4.6): differing tags are
/// never equal; `Null == Null`; `Number == Number` uses IEEE-754 `==`.
fn values_equal(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Number(a), Value::Number(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run(source: &str) -> crate::Result<()> {
        Vm::new(VmOptions::default()).interpret(source)
    }

    #[test]
    fn arithmetic_with_negation_and_grouping() {
        assert!(run("(-1 + 2) * 3 - -4").is_ok());
    }

    #[test]
    fn not_on_a_falsey_value() {
        assert!(run("!null").is_ok());
    }

    #[test]
    fn equality_coerces_booleans_to_numbers() {
        assert!(run("1 == true").is_ok());
    }

    #[test]
    fn chained_comparisons() {
        assert!(run("1 < 2 == true").is_ok());
    }

    #[test]
    fn negating_a_non_number_is_a_runtime_error() {
        assert_eq!(Err(InterpretationError::RuntimeError), run("-true"));
    }

    #[test]
    fn unclosed_paren_is_a_compile_error() {
        assert_eq!(Err(InterpretationError::CompileError), run("("));
    }

    #[test]
    fn division_by_zero_is_not_a_runtime_error() {
        assert!(run("1 / 0").is_ok());
    }

    #[test]
    fn stack_is_reset_after_a_runtime_error() {
        let mut vm = Vm::new(VmOptions::default());
        assert!(vm.interpret("-true").is_err());
        // The VM must still be usable for the next call.
        assert!(vm.interpret("1 + 1").is_ok());
    }
}
