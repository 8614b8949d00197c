//! The single-pass Pratt parser/compiler: turns a token stream directly into
//! bytecode, with no intermediate syntax tree.
use crate::chunk::{Chunk, OpCode, WrittenOpcode};
use crate::error::InterpretationError;
use crate::scanner::{Lexeme, Scanner, Token};
use crate::value::Value;

/////////////////////////////////////////// Public API ////////////////////////////////////////////

/// Compiles the given Charis source code and, if successful, returns one
/// bytecode [Chunk]. When `print_code` is set, the finished chunk is
/// disassembled to stdout (this is `DEBUG_PRINT_CODE` from the spec, exposed
/// as a runtime flag rather than a compile-time `#define`).
pub fn compile(source: &str, print_code: bool) -> crate::Result<Chunk> {
    tracing::debug!(source_len = source.len(), "compiling");
    let parser = Parser::new(source);
    let compiler = Compiler::new(parser);
    compiler.compile(print_code)
}

///////////////////////////////////// Implementation details //////////////////////////////////////

/// Contains the compiler state: the [Parser] and the chunk being produced.
struct Compiler<'a> {
    parser: Parser<'a>,
    compiling_chunk: Chunk,
}

/// Contains the parser state, including error-recovery flags.
#[derive(Debug)]
struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Lexeme<'a>,
    previous: Lexeme<'a>,
    had_error: bool,
    panic_mode: bool,
}

/// A rule in the Pratt parser table. See [Compiler::parse_precedence()].
#[derive(Copy, Clone)]
struct ParserRule {
    prefix: Option<ParserFn>,
    infix: Option<ParserFn>,
    precedence: Precedence,
}

/// Any action taken from the parsing table. Takes the whole compiler state
/// and mutates it, usually by emitting bytecode.
type ParserFn = fn(&mut Compiler);

/// Precedence levels for Charis expressions, low to high.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq)]
enum Precedence {
    None,
    /// `=`
    Assignment,
    /// `?:`
    Ternary,
    /// `or`
    Or,
    /// `and`
    And,
    /// `==` `!=`
    Equality,
    /// `<` `>` `<=` `>=`
    Comparison,
    /// `+` `-`
    Term,
    /// `*` `/`
    Factor,
    /// `!` `-`
    Unary,
    /// `.` `()`
    Call,
    /// Literals and groupings.
    Primary,
}

///////////////////////////////////////// Implementations /////////////////////////////////////////

impl Precedence {
    /// Returns the next higher level of precedence.
    ///
    /// # Panics
    ///
    /// Panics when asked for a precedence higher than [Precedence::Primary].
    fn higher(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Ternary,
            Ternary => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => panic!("tried to get a precedence higher than Primary"),
        }
    }
}

impl<'a> Parser<'a> {
    /// Creates a new parser, priming `current` with the first scanned token.
    fn new(source: &'a str) -> Parser<'a> {
        let mut scanner = Scanner::new(source);
        let first_token = scanner.scan_token();
        let sentinel = scanner.make_sentinel("<before first token>");

        Parser {
            scanner,
            previous: sentinel,
            current: first_token,
            had_error: false,
            panic_mode: false,
        }
    }

    /// Moves `(previous, current)` one token further in the stream, draining
    /// past any [Token::Error] lexemes (each one reported immediately).
    fn advance(&mut self) {
        self.previous = self.current;

        loop {
            self.current = self.scanner.scan_token();
            if self.current.token() != Token::Error {
                break;
            }
            self.error_at_current(self.current.text());
        }
    }

    /// Advances if `current` is `desired`; otherwise reports `message`.
    fn consume(&mut self, desired: Token, message: &str) {
        if self.current.token() == desired {
            return self.advance();
        }
        self.error_at_current(message);
    }

    /// Emit a compiler error located at `self.previous`. In Pratt parsing
    /// this is usually the right handler to call, since the previous lexeme
    /// is the one that decided which [ParserRule] got invoked.
    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message)
    }

    /// Emit a compiler error located at `self.current`.
    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message)
    }

    /// Emit a compiler error at the given lexeme, following spec §4.5's
    /// canonical format. Suppressed while already in panic mode, so one
    /// syntax error doesn't cascade into a deluge of spurious ones.
    fn error_at(&mut self, lexeme: Lexeme<'a>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;

        eprint!("[line {}] Error", lexeme.line());
        match lexeme.token() {
            Token::Eof => eprint!(" at end"),
            Token::Error => {}
            _ => eprint!(" at '{}'", lexeme.text()),
        }
        eprintln!(": {message}");
    }
}

impl<'a> Compiler<'a> {
    /// Creates a new compiler with the given [Parser].
    fn new(parser: Parser<'a>) -> Compiler<'a> {
        Compiler {
            parser,
            compiling_chunk: Chunk::default(),
        }
    }

    /// Parses one expression, consumes [Token::Eof], emits [OpCode::Return],
    /// and returns the finished chunk (or a compile error).
    fn compile(mut self, print_code: bool) -> crate::Result<Chunk> {
        self.advance();
        self.expression();
        self.parser.consume(Token::Eof, "Expect end of expression.");
        self.emit_return();

        if print_code && !self.parser.had_error {
            crate::debug::disassemble_chunk(&self.compiling_chunk, "code");
        }

        if self.parser.had_error {
            return Err(InterpretationError::CompileError);
        }

        Ok(self.compiling_chunk)
    }

    /// The core of the Pratt parsing algorithm.
    ///
    /// See: <https://en.wikipedia.org/wiki/Operator-precedence_parser#Pratt_parsing>
    fn parse_precedence(&mut self, precedence: Precedence) {
        tracing::trace!(?precedence, "parse_precedence");
        self.advance();

        match self.rule_from_previous().prefix {
            Some(prefix_rule) => prefix_rule(self),
            None => {
                self.parser.error("Expect expression.");
                return;
            }
        }

        while precedence <= self.rule_from_current().precedence {
            self.advance();
            let infix_rule = self
                .rule_from_previous()
                .infix
                .expect("a rule with a defined precedence must always have an infix rule");
            infix_rule(self);
        }
    }

    /// Parse an expression: `parse_precedence(Assignment)`.
    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// Appends [OpCode::Return] to the current [Chunk].
    fn emit_return(&mut self) {
        self.emit_instruction(OpCode::Return);
    }

    /// Appends [OpCode::Constant] to the current [Chunk] for `value`.
    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_instruction(OpCode::Constant).with_operand(index);
    }

    /// Appends a new constant to the current [Chunk]'s pool.
    ///
    /// When the pool already holds 256 constants, reports a compile error
    /// and returns index `0` so the chunk can still be built (even though it
    /// will be discarded, since `had_error` is now set).
    fn make_constant(&mut self, value: Value) -> u8 {
        match self.compiling_chunk.add_constant(value) {
            Some(index) => index,
            None => {
                self.parser.error("Too many constants in one chunk");
                0
            }
        }
    }

    /// Writes a single [OpCode] to the current [Chunk], at the line of the
    /// token that triggered it (`self.parser.previous`).
    fn emit_instruction(&mut self, opcode: OpCode) -> WrittenOpcode {
        let line = self.parser.previous.line();
        tracing::trace!(?opcode, line, "emit_instruction");
        self.compiling_chunk.write_opcode(opcode, line)
    }

    /// Writes two [OpCode]s back to back, both at the current line. Used for
    /// the derived comparisons (`!=`, `>=`, `<=`) that spec §4.4 says are not
    /// themselves opcodes.
    fn emit_instructions(&mut self, op1: OpCode, op2: OpCode) {
        self.emit_instruction(op1);
        self.emit_instruction(op2);
    }

    ///////////////////////////////////////// Aliases /////////////////////////////////////////////

    #[inline(always)]
    fn advance(&mut self) {
        self.parser.advance()
    }

    #[inline(always)]
    fn previous_token(&self) -> Token {
        self.parser.previous.token()
    }

    #[inline(always)]
    fn rule_from_previous(&self) -> ParserRule {
        get_rule(self.previous_token())
    }

    #[inline(always)]
    fn rule_from_current(&self) -> ParserRule {
        get_rule(self.parser.current.token())
    }
}

////////////////////////////////////////// Parser rules ///////////////////////////////////////////

/// Makes defining [ParserRule]s a bit cleaner looking.
macro_rules! rule {
    ($prefix:expr, $infix:expr, $precedence:expr) => {
        ParserRule {
            prefix: $prefix,
            infix: $infix,
            precedence: $precedence,
        }
    };
}

/// Only the tokens with a defined prefix and/or infix rule are listed with
/// anything other than `None`/`None`/`Precedence::None` — every other token
/// (including reserved-but-not-yet-compiled keywords, `StrLiteral`, braces,
/// commas, etc.) falls through to the default arm.
#[rustfmt::skip]
fn get_rule(token: Token) -> ParserRule {
    use Token::*;
    match token {
        LeftParen  => rule!{ Some(grouping), None,         Precedence::None },
        Minus      => rule!{ Some(unary),    Some(binary), Precedence::Term },
        Plus       => rule!{ Some(unary),    Some(binary), Precedence::Term },
        Slash      => rule!{ None,           Some(binary), Precedence::Factor },
        Star       => rule!{ None,           Some(binary), Precedence::Factor },
        Bang       => rule!{ Some(unary),    None,         Precedence::None },
        BangEqual  => rule!{ None,           Some(binary), Precedence::Equality },
        EqualEqual => rule!{ None,           Some(binary), Precedence::Equality },
        Greater      => rule!{ None, Some(binary), Precedence::Comparison },
        GreaterEqual => rule!{ None, Some(binary), Precedence::Comparison },
        Less         => rule!{ None, Some(binary), Precedence::Comparison },
        LessEqual    => rule!{ None, Some(binary), Precedence::Comparison },
        Question   => rule!{ None,           Some(ternary), Precedence::Ternary },
        Number     => rule!{ Some(number),   None,         Precedence::None },
        False | Null | True => rule!{ Some(literal), None, Precedence::None },
        _          => rule!{ None,           None,         Precedence::None },
    }
}

/// Parse `(` as a prefix. Assumes `(` has been consumed.
fn grouping(compiler: &mut Compiler) {
    debug_assert_eq!(Token::LeftParen, compiler.previous_token());
    compiler.expression();
    compiler
        .parser
        .consume(Token::RightParen, "Expect ')' after expression.");
}

/// Parse a number literal as a prefix. Assumes the number has been consumed.
fn number(compiler: &mut Compiler) {
    debug_assert_eq!(Token::Number, compiler.previous_token());
    let value: f64 = compiler
        .parser
        .previous
        .text()
        .parse()
        .expect("Token::Number must always parse as a float");
    compiler.emit_constant(value.into());
}

/// Parse a unary operator as a prefix. Assumes the operator has been consumed.
fn unary(compiler: &mut Compiler) {
    let operator = compiler.previous_token();

    // Compile the operand, so it ends up on top of the stack first.
    compiler.parse_precedence(Precedence::Unary);

    match operator {
        Token::Bang => {
            compiler.emit_instruction(OpCode::Not);
        }
        Token::Minus => {
            compiler.emit_instruction(OpCode::Negate);
        }
        // Unary `+` is a no-op: nothing is emitted.
        Token::Plus => {}
        _ => unreachable!("unary() called with a non-unary operator"),
    }
}

/// Parse a binary operator as an infix. Assumes the operator has been consumed.
fn binary(compiler: &mut Compiler) {
    let operator = compiler.previous_token();
    let rule = get_rule(operator);

    // Left-associative: parse the right-hand side at one precedence higher.
    compiler.parse_precedence(rule.precedence.higher());

    match operator {
        Token::BangEqual => compiler.emit_instructions(OpCode::Equal, OpCode::Not),
        Token::EqualEqual => {
            compiler.emit_instruction(OpCode::Equal);
        }
        Token::Greater => {
            compiler.emit_instruction(OpCode::Greater);
        }
        Token::GreaterEqual => compiler.emit_instructions(OpCode::Less, OpCode::Not),
        Token::Less => {
            compiler.emit_instruction(OpCode::Less);
        }
        Token::LessEqual => compiler.emit_instructions(OpCode::Greater, OpCode::Not),
        Token::Plus => {
            compiler.emit_instruction(OpCode::Add);
        }
        Token::Minus => {
            compiler.emit_instruction(OpCode::Subtract);
        }
        Token::Star => {
            compiler.emit_instruction(OpCode::Multiply);
        }
        Token::Slash => {
            compiler.emit_instruction(OpCode::Divide);
        }
        _ => unreachable!("binary() called with a non-binary operator"),
    }
}

/// Parse `?:` as an infix. Assumes `?` has been consumed and the condition
/// is already compiled.
///
/// This spec's instruction set has no `JumpIfFalse`/`Jump` opcodes, so this
/// deliberately does NOT implement conditional selection: both the "then"
/// and "else" branches are compiled and their bytecode is simply emitted one
/// after the other. The "then" branch's value is pushed, then the "else"
/// branch's value is pushed on top of it — execution always sees the "else"
/// value on top of the stack. This is a documented deficiency, not a bug to
/// silently fix.
fn ternary(compiler: &mut Compiler) {
    compiler.parse_precedence(Precedence::Ternary.higher());
    compiler.parser.consume(
        Token::Colon,
        "Expect ':' after then branch of ternary expression.",
    );
    compiler.parse_precedence(Precedence::Ternary);
}

/// Parse a keyword literal as a prefix. Assumes the keyword has been consumed.
fn literal(compiler: &mut Compiler) {
    match compiler.previous_token() {
        Token::False => compiler.emit_instruction(OpCode::False),
        Token::Null => compiler.emit_instruction(OpCode::Null),
        Token::True => compiler.emit_instruction(OpCode::True),
        _ => unreachable!("literal() called with a non-literal token"),
    };
}

////////////////////////////////////////////// Tests //////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn precedence_ordering() {
        assert!(Precedence::Assignment < Precedence::Ternary);
        assert!(Precedence::Ternary < Precedence::Or);
        assert!(Precedence::Or < Precedence::And);
        assert!(Precedence::And < Precedence::Equality);
        assert!(Precedence::Equality < Precedence::Comparison);
        assert!(Precedence::Call > Precedence::Factor);
        assert!(Precedence::Factor > Precedence::Term);
        assert_eq!(Precedence::And, Precedence::Or.higher());
        assert_eq!(Precedence::Factor, Precedence::Term.higher());
    }

    #[test]
    fn compiles_a_simple_arithmetic_expression() {
        let chunk = compile("(-1 + 2) * 3 - -4", false).unwrap();
        assert!(!chunk.is_empty());
    }

    #[test]
    fn reports_missing_expression() {
        assert!(compile("(", false).is_err());
    }

    #[test]
    fn reports_unclosed_grouping() {
        assert!(compile("(1 + 2", false).is_err());
    }

    #[test]
    fn ternary_parses_without_error() {
        assert!(compile("true ? 1 : 2", false).is_ok());
    }

    #[test]
    fn exactly_256_constants_compile() {
        let source = (0..256)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        assert!(compile(&source, false).is_ok());
    }

    #[test]
    fn the_257th_constant_fails() {
        let source = (0..257)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        assert!(compile(&source, false).is_err());
    }
}
