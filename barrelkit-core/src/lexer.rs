//! Tokenizer for ECMAScript module source.
//!
//! Produces just enough structure for export extraction: identifiers,
//! punctuators, and opaque literal tokens. Strings, template chunks, regular
//! expressions and numbers are recognized so that their contents never leak
//! into bracket matching.

/// Position of a token in the source, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    PrivateName(String),
    Punct(&'static str),
    Str(String),
    Template,
    Regex,
    Number,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(ident) if ident == name)
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == punct)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

/// Keywords after which a `/` starts a regular expression rather than a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "default",
    "extends",
    "do",
    "else",
    "yield",
    "await",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    newline_pending: bool,
    /// One entry per open `{`; `true` marks a template substitution `${`.
    braces: Vec<bool>,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            newline_pending: false,
            braces: Vec::new(),
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        self.skip_hashbang();

        loop {
            self.skip_trivia()?;
            let span = self.span();

            let Some(c) = self.peek(0) else {
                self.push(TokenKind::Eof, span);
                break;
            };

            match c {
                '"' | '\'' => {
                    let value = self.read_string(c)?;
                    self.push(TokenKind::Str(value), span);
                }
                '`' => {
                    self.advance();
                    self.read_template_chunk(span)?;
                }
                '0'..='9' => {
                    self.read_number();
                    self.push(TokenKind::Number, span);
                }
                '.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => {
                    self.read_number();
                    self.push(TokenKind::Number, span);
                }
                '#' => {
                    self.advance();
                    if !self.peek(0).is_some_and(is_ident_start) {
                        return Err(self.error("unexpected character '#'", span));
                    }
                    let name = self.read_ident()?;
                    self.push(TokenKind::PrivateName(name), span);
                }
                '/' if self.regex_allowed() => {
                    self.read_regex(span)?;
                    self.push(TokenKind::Regex, span);
                }
                '{' => {
                    self.advance();
                    self.braces.push(false);
                    self.push(TokenKind::Punct("{"), span);
                }
                '}' => {
                    self.advance();
                    if self.braces.pop() == Some(true) {
                        self.read_template_chunk(span)?;
                    } else {
                        self.push(TokenKind::Punct("}"), span);
                    }
                }
                c if is_ident_start(c) => {
                    let name = self.read_ident()?;
                    self.push(TokenKind::Ident(name), span);
                }
                _ => {
                    let punct = self.read_punct(span)?;
                    self.push(TokenKind::Punct(punct), span);
                }
            }
        }

        Ok(self.tokens)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.position += 1;
        let crlf = c == '\r' && self.peek(0) == Some('\n');
        if is_line_terminator(c) && !crlf {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> LexError {
        LexError {
            message: message.into(),
            span,
        }
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token {
            kind,
            span,
            newline_before: std::mem::take(&mut self.newline_pending),
        });
    }

    fn skip_hashbang(&mut self) {
        if self.peek(0) == Some('#') && self.peek(1) == Some('!') {
            while self.peek(0).is_some_and(|c| !is_line_terminator(c)) {
                self.advance();
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.peek(0) {
            if is_line_terminator(c) {
                self.newline_pending = true;
                self.advance();
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.advance();
            } else if c == '/' && self.peek(1) == Some('/') {
                while self.peek(0).is_some_and(|c| !is_line_terminator(c)) {
                    self.advance();
                }
            } else if c == '/' && self.peek(1) == Some('*') {
                let span = self.span();
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek(0) == Some('/') => {
                            self.advance();
                            break;
                        }
                        Some(c) if is_line_terminator(c) => self.newline_pending = true,
                        Some(_) => {}
                        None => return Err(self.error("unterminated block comment", span)),
                    }
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let span = self.span();
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => return Ok(value),
                Some('\\') => {
                    // Escapes are kept verbatim; only module specifiers are read back.
                    if let Some(escaped) = self.advance() {
                        value.push('\\');
                        value.push(escaped);
                    }
                }
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error("unterminated string literal", span))
                }
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string literal", span)),
            }
        }
    }

    /// Reads template text up to the closing backtick or the next `${`.
    fn read_template_chunk(&mut self, span: Span) -> Result<(), LexError> {
        loop {
            match self.advance() {
                Some('`') => break,
                Some('\\') => {
                    self.advance();
                }
                Some('$') if self.peek(0) == Some('{') => {
                    self.advance();
                    self.braces.push(true);
                    break;
                }
                Some(_) => {}
                None => return Err(self.error("unterminated template literal", span)),
            }
        }
        self.push(TokenKind::Template, span);
        Ok(())
    }

    fn read_number(&mut self) {
        let radix_prefixed = self.peek(0) == Some('0')
            && matches!(self.peek(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        while let Some(c) = self.peek(0) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.advance();
                if !radix_prefixed
                    && matches!(c, 'e' | 'E')
                    && matches!(self.peek(0), Some('+' | '-'))
                {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_ident(&mut self) -> Result<String, LexError> {
        let mut name = String::new();
        while let Some(c) = self.peek(0) {
            if c == '\\' {
                name.push(self.read_ident_escape()?);
            } else if is_ident_part(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// Decodes `\uXXXX` or `\u{X...}` so escaped and literal spellings of a
    /// name compare equal.
    fn read_ident_escape(&mut self) -> Result<char, LexError> {
        let span = self.span();
        self.advance();
        if self.advance() != Some('u') {
            return Err(self.error("invalid escape in identifier", span));
        }

        let mut digits = String::new();
        if self.peek(0) == Some('{') {
            self.advance();
            loop {
                match self.advance() {
                    Some('}') if !digits.is_empty() => break,
                    Some(c) if c.is_ascii_hexdigit() => digits.push(c),
                    _ => return Err(self.error("invalid escape in identifier", span)),
                }
            }
        } else {
            for _ in 0..4 {
                match self.advance() {
                    Some(c) if c.is_ascii_hexdigit() => digits.push(c),
                    _ => return Err(self.error("invalid escape in identifier", span)),
                }
            }
        }

        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .filter(|&c| is_ident_part(c))
            .ok_or_else(|| self.error("invalid escape in identifier", span))
    }

    fn read_regex(&mut self, span: Span) -> Result<(), LexError> {
        self.advance();
        let mut in_class = false;
        loop {
            match self.advance() {
                Some('\\') => {
                    if self.peek(0).is_some_and(|c| !is_line_terminator(c)) {
                        self.advance();
                    }
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(c) if !is_line_terminator(c) => {}
                _ => return Err(self.error("unterminated regular expression", span)),
            }
        }
        while self.peek(0).is_some_and(is_ident_part) {
            self.advance();
        }
        Ok(())
    }

    fn read_punct(&mut self, span: Span) -> Result<&'static str, LexError> {
        for punct in PUNCTUATORS {
            let matches = punct
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek(i) == Some(c));
            // `a?.5:b` is a conditional, not optional chaining.
            let optional_chain_digit =
                *punct == "?." && self.peek(2).is_some_and(|c| c.is_ascii_digit());
            if matches && !optional_chain_digit {
                for _ in 0..punct.chars().count() {
                    self.advance();
                }
                return Ok(*punct);
            }
        }
        let c = self.peek(0).unwrap_or(' ');
        Err(self.error(format!("unexpected character '{}'", c), span))
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            None => true,
            Some(TokenKind::Ident(name)) => {
                // `obj.default / 2` divides a property.
                let property = self.tokens.len() >= 2
                    && matches!(
                        self.tokens[self.tokens.len() - 2].kind,
                        TokenKind::Punct("." | "?.")
                    );
                !property && REGEX_PRECEDING_KEYWORDS.contains(&name.as_str())
            }
            Some(TokenKind::Punct(p)) => !matches!(*p, ")" | "]" | "++" | "--"),
            Some(_) => false,
        }
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c == '\\' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    c == '$' || c == '_' || c == '\u{200c}' || c == '\u{200d}' || c.is_alphanumeric()
}
