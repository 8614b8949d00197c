//! Handle Charis's lexical analysis.
//!
//! Contains the [Scanner], which is pulled from by the compiler one
//! [Lexeme] at a time via [Scanner::scan_token].
//!
//! # Note on terminology
//!
//! As in the teacher codebase this is adapted from: Token, in Crafting
//! Interpreters, is what's called a [Lexeme] here; TokenType is [Token]; and
//! lexeme is [Lexeme::text()].

/// A lexeme: one contiguous slice of source text, tagged with its [Token]
/// kind and source line. Borrows into the source buffer — never copies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lexeme<'a> {
    token: Token,
    text: &'a str,
    line: usize,
}

/// What _type_ of [Lexeme] you have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Token {
    // Single-character tokens.
    LeftParen, RightParen,
    LeftBrace, RightBrace,
    Comma, Dot, Minus, Plus,
    Semicolon, Star, Slash,
    Question, Colon,
    // One- or two-character tokens.
    Bang, BangEqual,
    Equal, EqualEqual,
    Greater, GreaterEqual,
    Less, LessEqual,
    // Literals.
    Identifier, StrLiteral, Number,
    // Keywords.
    And, Class, Const, Define, Else, False,
    For, If, Let, Null, Or,
    Print, Return, Super, This, True, While,
    // Others.
    Error, Eof,
}

/// Scans Charis source code and yields [Lexeme]s on demand.
///
/// Stateful and single-pass: once the source is exhausted the scanner
/// permanently yields [Token::Eof].
#[derive(Debug)]
pub struct Scanner<'a> {
    start: &'a str,
    current: &'a str,
    line: usize,
}

impl<'a> Scanner<'a> {
    /// Start scanning the given string of source code.
    pub fn new(source: &'a str) -> Self {
        Scanner {
            start: source,
            current: source,
            line: 1,
        }
    }

    /// Yield the next [Lexeme] from the source. Once end-of-input has been
    /// reached, always returns an [Token::Eof] lexeme.
    pub fn scan_token(&mut self) -> Lexeme<'a> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_lexeme(Token::Eof);
        }

        match self.advance() {
            c if is_id_start(c) => self.identifier(),
            c if c.is_ascii_digit() => self.number(),
            '(' => self.make_lexeme(Token::LeftParen),
            ')' => self.make_lexeme(Token::RightParen),
            '{' => self.make_lexeme(Token::LeftBrace),
            '}' => self.make_lexeme(Token::RightBrace),
            ';' => self.make_lexeme(Token::Semicolon),
            ',' => self.make_lexeme(Token::Comma),
            '.' => self.make_lexeme(Token::Dot),
            '-' => self.make_lexeme(Token::Minus),
            '+' => self.make_lexeme(Token::Plus),
            '/' => self.make_lexeme(Token::Slash),
            '*' => self.make_lexeme(Token::Star),
            '?' => self.make_lexeme(Token::Question),
            ':' => self.make_lexeme(Token::Colon),
            '!' => {
                let followed_by_equal = self.match_and_advance('=');
                self.make_lexeme(if followed_by_equal {
                    Token::BangEqual
                } else {
                    Token::Bang
                })
            }
            '=' => {
                let followed_by_equal = self.match_and_advance('=');
                self.make_lexeme(if followed_by_equal {
                    Token::EqualEqual
                } else {
                    Token::Equal
                })
            }
            '<' => {
                let followed_by_equal = self.match_and_advance('=');
                self.make_lexeme(if followed_by_equal {
                    Token::LessEqual
                } else {
                    Token::Less
                })
            }
            '>' => {
                let followed_by_equal = self.match_and_advance('=');
                self.make_lexeme(if followed_by_equal {
                    Token::GreaterEqual
                } else {
                    Token::Greater
                })
            }
            '"' => self.string(),
            _ => self.error_token("Unexpected Character"),
        }
    }

    /// Returns `true` if we've reached the end of the source code.
    pub fn is_at_end(&self) -> bool {
        self.current.is_empty()
    }

    /// A placeholder [Lexeme] used before the first real token is scanned.
    pub fn make_sentinel(&self, message: &'static str) -> Lexeme<'a> {
        Lexeme {
            token: Token::Error,
            text: message,
            line: 0,
        }
    }

    /// Advances `self.current` past one char. Returns the consumed char.
    ///
    /// # Panics
    ///
    /// If called at the end of the source.
    fn advance(&mut self) -> char {
        let c = self
            .current
            .chars()
            .next()
            .expect("called advance() at end of file");
        self.current = &self.current[c.len_utf8()..];
        c
    }

    /// Peek at the next char, without consuming it.
    fn peek(&self) -> char {
        self.current.chars().next().unwrap_or('\0')
    }

    /// Peek at the char after the next one, without consuming anything.
    fn peek_next(&self) -> char {
        let mut chars = self.current.chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    /// If the next character matches `expected`, consumes it and returns
    /// `true`. Otherwise leaves the cursor alone and returns `false`.
    fn match_and_advance(&mut self, expected: char) -> bool {
        if self.peek() != expected {
            return false;
        }
        self.current = &self.current[expected.len_utf8()..];
        true
    }

    /// Skips spaces, tabs, carriage returns, newlines (tracking line
    /// numbers), and `#`-to-end-of-line comments.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    self.line += 1;
                    self.advance();
                }
                '#' => {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            };
        }
    }

    /// Scan an identifier or keyword. Assumes the first char was consumed.
    fn identifier(&mut self) -> Lexeme<'a> {
        while is_id_continue(self.peek()) {
            self.advance();
        }
        self.make_lexeme(self.identifier_type())
    }

    /// Scan a string literal. Assumes the opening quote was consumed.
    fn string(&mut self) -> Lexeme<'a> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }

        self.advance(); // the closing quote
        self.make_lexeme(Token::StrLiteral)
    }

    /// Scan a number literal. Assumes the first digit was consumed.
    fn number(&mut self) -> Lexeme<'a> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance(); // the '.'
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.make_lexeme(Token::Number)
    }

    /// Decide whether the just-scanned identifier is a reserved keyword.
    ///
    /// Dispatches on the first (and, for keywords sharing a first letter,
    /// the second) character rather than a full string-set lookup.
    fn identifier_type(&self) -> Token {
        let mut chars = self.start.chars();
        match chars.next().unwrap_or('\0') {
            'a' => self.check_keyword("and", Token::And),
            'c' => match chars.next().unwrap_or('\0') {
                'l' => self.check_keyword("class", Token::Class),
                'o' => self.check_keyword("const", Token::Const),
                _ => Token::Identifier,
            },
            'd' => self.check_keyword("define", Token::Define),
            'e' => self.check_keyword("else", Token::Else),
            'f' => match chars.next().unwrap_or('\0') {
                'a' => self.check_keyword("false", Token::False),
                'o' => self.check_keyword("for", Token::For),
                _ => Token::Identifier,
            },
            'i' => self.check_keyword("if", Token::If),
            'l' => self.check_keyword("let", Token::Let),
            'n' => self.check_keyword("null", Token::Null),
            'o' => self.check_keyword("or", Token::Or),
            'p' => self.check_keyword("print", Token::Print),
            'r' => self.check_keyword("return", Token::Return),
            's' => self.check_keyword("super", Token::Super),
            't' => match chars.next().unwrap_or('\0') {
                'h' => self.check_keyword("this", Token::This),
                'r' => self.check_keyword("true", Token::True),
                _ => Token::Identifier,
            },
            'w' => self.check_keyword("while", Token::While),
            _ => Token::Identifier,
        }
    }

    /// Confirms whether the lexeme scanned so far matches `keyword_text`
    /// exactly (not just as a prefix).
    fn check_keyword(&self, keyword_text: &'static str, keyword: Token) -> Token {
        let token_length = self.start.len() - self.current.len();
        if &self.start[..token_length] == keyword_text {
            keyword
        } else {
            Token::Identifier
        }
    }

    /// Returns an [Token::Error] lexeme carrying a static diagnostic message.
    fn error_token(&self, message: &'static str) -> Lexeme<'a> {
        Lexeme {
            token: Token::Error,
            text: message,
            line: self.line,
        }
    }

    /// Returns a [Lexeme] spanning `self.start..self.current`, tagged `token`.
    fn make_lexeme(&self, token: Token) -> Lexeme<'a> {
        let extent = self.start.len() - self.current.len();
        Lexeme {
            token,
            text: &self.start[..extent],
            line: self.line,
        }
    }
}

impl<'a> Lexeme<'a> {
    /// Return the line number this token was found on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Return the literal text of this token.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Return the [Token] kind of this lexeme.
    pub fn token(&self) -> Token {
        self.token
    }
}

///////////////////////////////////////////// Helpers /////////////////////////////////////////////

/// Returns true if this char can start an identifier or keyword.
fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns true if this char can continue an identifier or keyword.
fn is_id_continue(c: char) -> bool {
    is_id_start(c) || c.is_ascii_digit()
}

////////////////////////////////////////////// Tests //////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    fn scan_all(source: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let lexeme = scanner.scan_token();
            if lexeme.token() == Token::Eof {
                break;
            }
            tokens.push(lexeme.token());
        }
        tokens
    }

    #[test]
    fn scanning_every_keyword() {
        use Token::*;
        let source = "and class const define else false for if let null or print return super this true while";
        assert_eq!(
            vec![
                And, Class, Const, Define, Else, False, For, If, Let, Null, Or, Print, Return,
                Super, This, True, While,
            ],
            scan_all(source)
        );
    }

    #[test]
    fn two_character_operators() {
        use Token::*;
        assert_eq!(vec![BangEqual], scan_all("!="));
        assert_eq!(vec![EqualEqual], scan_all("=="));
        assert_eq!(vec![LessEqual], scan_all("<="));
        assert_eq!(vec![GreaterEqual], scan_all(">="));
        assert_eq!(vec![Bang, Equal, Less, Greater], scan_all("! = < >"));
    }

    #[test]
    fn number_literals_require_a_digit_after_the_dot() {
        use Token::*;
        assert_eq!(vec![Number], scan_all("1.2"));
        // "1." followed by a non-digit: the dot is not consumed as part of the number.
        assert_eq!(vec![Number, Dot], scan_all("1."));
    }

    #[test]
    fn line_comments_run_to_end_of_line() {
        let mut scanner = Scanner::new("1 # a comment\n2");
        let first = scanner.scan_token();
        assert_eq!(1, first.line());
        let second = scanner.scan_token();
        assert_eq!(2, second.line());
        assert_eq!("2", second.text());
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let mut scanner = Scanner::new("\"never closed");
        let lexeme = scanner.scan_token();
        assert_eq!(Token::Error, lexeme.token());
        assert_eq!("Unterminated string.", lexeme.text());
    }

    #[test]
    fn strings_can_span_multiple_lines() {
        let mut scanner = Scanner::new("\"line one\nline two\"");
        let lexeme = scanner.scan_token();
        assert_eq!(Token::StrLiteral, lexeme.token());
        assert_eq!("\"line one\nline two\"", lexeme.text());
    }

    #[test]
    fn unexpected_character_is_an_error_token() {
        let mut scanner = Scanner::new("@");
        let lexeme = scanner.scan_token();
        assert_eq!(Token::Error, lexeme.token());
        assert_eq!("Unexpected Character", lexeme.text());
    }

    #[test]
    fn scanning_is_pure_over_immutable_source() {
        let source = "1 + 2 * (3 - 4) ? \"x\" : null";
        assert_eq!(scan_all(source), scan_all(source));
    }

    #[test]
    fn eof_is_returned_forever() {
        let mut scanner = Scanner::new("");
        assert_eq!(Token::Eof, scanner.scan_token().token());
        assert_eq!(Token::Eof, scanner.scan_token().token());
        assert_eq!(Token::Eof, scanner.scan_token().token());
    }
}
