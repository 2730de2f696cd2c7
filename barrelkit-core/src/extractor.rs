//! Static extraction of the names a module exports.
//!
//! The extractor walks the token stream of a module and recognizes export
//! statements at the top level:
//!
//! - `export const|let|var <bindings>`
//! - `export function <name>`, `export async function <name>`,
//!   `export function* <name>` and `export class <name>`
//! - `export { a, b as c }` with or without a `from` clause
//! - `export * as ns from '...'`
//! - `export default ...`
//!
//! Anything after `export` that does not fit one of these forms is a
//! [`ParseError`]; the names it would contribute cannot be listed statically.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use crate::error::{Error, ParseError, Result};
use crate::lexer::{self, Span, Token, TokenKind};

/// Everything one module exports.
///
/// Equality ignores the order of named exports. Reordering the exports of
/// a file is therefore not a change: the aggregate keeps the order it was
/// last written with until something else in the directory changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSet {
    default: bool,
    named: IndexSet<String>,
}

impl ExportSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn with_named<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.named.insert(name.into());
        }
        self
    }

    pub fn has_default(&self) -> bool {
        self.default
    }

    /// Named exports in source order.
    pub fn named(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(String::as_str)
    }

    pub fn contains_named(&self, name: &str) -> bool {
        self.named.contains(name)
    }

    pub fn named_len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.default && self.named.is_empty()
    }

    fn insert(&mut self, name: String) {
        if name == "default" {
            self.default = true;
        } else {
            self.named.insert(name);
        }
    }
}

/// Reads `path` and extracts its exports.
///
/// The file is read on every call; nothing is cached here.
pub fn extract(path: &Path) -> Result<ExportSet> {
    let source = fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
    Ok(extract_source(path, &source)?)
}

/// Extracts the exports of `source`, attributing errors to `path`.
pub fn extract_source(path: &Path, source: &str) -> std::result::Result<ExportSet, ParseError> {
    let tokens = lexer::tokenize(source).map_err(|e| ParseError {
        path: path.to_path_buf(),
        line: e.span.line,
        column: e.span.column,
        message: e.message,
    })?;
    ExportScanner::new(path, tokens).scan()
}

/// Statement keywords that end an unterminated initializer when they start a new line.
const STATEMENT_KEYWORDS: &[&str] = &[
    "export", "import", "const", "let", "var", "function", "class", "if", "for", "while", "do",
    "return", "switch", "try", "throw",
];

const TYPESCRIPT_EXPORT_FORMS: &[&str] = &[
    "type",
    "interface",
    "enum",
    "declare",
    "abstract",
    "namespace",
    "module",
    "import",
];

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var",
    "void", "while", "with", "null", "true", "false", "enum",
];

struct ExportScanner {
    path: PathBuf,
    tokens: Vec<Token>,
    position: usize,
    /// Open brackets with the position they were opened at.
    brackets: Vec<(&'static str, Span)>,
    exports: ExportSet,
}

impl ExportScanner {
    fn new(path: &Path, tokens: Vec<Token>) -> Self {
        Self {
            path: path.to_path_buf(),
            tokens,
            position: 0,
            brackets: Vec::new(),
            exports: ExportSet::new(),
        }
    }

    fn scan(mut self) -> std::result::Result<ExportSet, ParseError> {
        while !self.is_at_end() {
            if self.at_export_statement() {
                if let Some(&(_, opened)) = self.brackets.last() {
                    return Err(self.error(
                        format!(
                            "'export' is only allowed at the top level (inside a block opened at line {})",
                            opened.line
                        ),
                        self.current().span,
                    ));
                }
                self.advance();
                self.parse_export()?;
                continue;
            }

            let token = self.advance().clone();
            self.track_bracket(&token)?;
        }

        if let Some(&(open, span)) = self.brackets.last() {
            return Err(self.error(format!("unclosed '{}'", open), span));
        }

        Ok(self.exports)
    }

    // Token stream management

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn previous(&self) -> Option<&Token> {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if self.is_at_end() {
            return self.current();
        }
        self.position += 1;
        &self.tokens[self.position - 1]
    }

    fn error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError {
            path: self.path.clone(),
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        let found = match &token.kind {
            TokenKind::Ident(name) => format!("'{}'", name),
            TokenKind::PrivateName(name) => format!("'#{}'", name),
            TokenKind::Punct(p) => format!("'{}'", p),
            TokenKind::Str(_) => "a string".to_string(),
            TokenKind::Template => "a template literal".to_string(),
            TokenKind::Regex => "a regular expression".to_string(),
            TokenKind::Number => "a number".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        };
        self.error(format!("expected {}, found {}", expected, found), token.span)
    }

    fn expect_punct(&mut self, punct: &str) -> std::result::Result<(), ParseError> {
        if self.current().is_punct(punct) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", punct)))
        }
    }

    fn track_bracket(&mut self, token: &Token) -> std::result::Result<(), ParseError> {
        let TokenKind::Punct(p) = token.kind else {
            return Ok(());
        };
        match p {
            "(" | "[" | "{" => self.brackets.push((p, token.span)),
            ")" | "]" | "}" => {
                let expected_open = match p {
                    ")" => "(",
                    "]" => "[",
                    _ => "{",
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected_open => {}
                    Some((open, span)) => {
                        return Err(self.error(
                            format!(
                                "unexpected '{}', '{}' opened at line {} is still open",
                                p, open, span.line
                            ),
                            token.span,
                        ))
                    }
                    None => return Err(self.error(format!("unexpected '{}'", p), token.span)),
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `export` used as a statement rather than as a property or label.
    fn at_export_statement(&self) -> bool {
        if !self.current().is_ident("export") {
            return false;
        }
        let member_access = self
            .previous()
            .is_some_and(|t| t.is_punct(".") || t.is_punct("?."));
        let used_as_value = self.peek(1).is_some_and(|t| {
            matches!(t.kind, TokenKind::Punct(p) if matches!(p, ":" | "(" | "." | "?." | ")" | "," | ";"))
        });
        // A class field named `export`. At the top level `export =` stays an
        // export statement so the TypeScript form is reported.
        let field_initializer = !self.brackets.is_empty()
            && self.peek(1).is_some_and(|t| t.is_punct("="));
        !member_access && !used_as_value && !field_initializer
    }

    // Export forms

    fn parse_export(&mut self) -> std::result::Result<(), ParseError> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(word) => match word.as_str() {
                "default" => {
                    self.advance();
                    self.exports.default = true;
                    Ok(())
                }
                "const" | "let" | "var" => {
                    self.advance();
                    self.parse_declarators()
                }
                "async" if self.peek(1).is_some_and(|t| t.is_ident("function")) => {
                    self.advance();
                    self.advance();
                    self.parse_function_name()
                }
                "function" => {
                    self.advance();
                    self.parse_function_name()
                }
                "class" => {
                    self.advance();
                    let name = self.binding_name("a class name")?;
                    self.exports.insert(name);
                    Ok(())
                }
                form if TYPESCRIPT_EXPORT_FORMS.contains(&form) => Err(self.error(
                    format!("unsupported export form 'export {}'", form),
                    token.span,
                )),
                _ => Err(self.unexpected("a declaration, '{', '*' or 'default' after 'export'")),
            },
            TokenKind::Punct("{") => {
                self.advance();
                self.parse_specifiers()
            }
            TokenKind::Punct("*") => {
                self.advance();
                self.parse_namespace_export(token.span)
            }
            TokenKind::Punct("=") => Err(self.error(
                "unsupported export form 'export ='",
                token.span,
            )),
            _ => Err(self.unexpected("a declaration, '{', '*' or 'default' after 'export'")),
        }
    }

    fn parse_function_name(&mut self) -> std::result::Result<(), ParseError> {
        if self.current().is_punct("*") {
            self.advance();
        }
        let name = self.binding_name("a function name")?;
        self.exports.insert(name);
        Ok(())
    }

    fn parse_specifiers(&mut self) -> std::result::Result<(), ParseError> {
        loop {
            if self.current().is_punct("}") {
                self.advance();
                break;
            }

            let local = self.module_export_name()?;
            let exported = if self.current().is_ident("as") {
                self.advance();
                self.module_export_name()?
            } else {
                local
            };
            self.exports.insert(exported);

            if self.current().is_punct(",") {
                self.advance();
            } else if !self.current().is_punct("}") {
                return Err(self.unexpected("',' or '}' in export list"));
            }
        }

        if self.current().is_ident("from") {
            self.advance();
            self.module_specifier()?;
        }
        Ok(())
    }

    fn parse_namespace_export(&mut self, star: Span) -> std::result::Result<(), ParseError> {
        if !self.current().is_ident("as") {
            return Err(self.error(
                "'export * from' re-exports names that cannot be listed statically",
                star,
            ));
        }
        self.advance();
        let name = self.module_export_name()?;
        if !self.current().is_ident("from") {
            return Err(self.unexpected("'from'"));
        }
        self.advance();
        self.module_specifier()?;
        self.exports.insert(name);
        Ok(())
    }

    fn module_specifier(&mut self) -> std::result::Result<(), ParseError> {
        match self.current().kind {
            TokenKind::Str(_) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected("a module specifier string")),
        }
    }

    /// A name in an export list; `default` is allowed here.
    fn module_export_name(&mut self) -> std::result::Result<String, ParseError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::Str(_) => Err(self.error(
                "string export names cannot be re-exported from an index file",
                token.span,
            )),
            _ => Err(self.unexpected("an export name")),
        }
    }

    fn binding_name(&mut self, expected: &str) -> std::result::Result<String, ParseError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) if !RESERVED_WORDS.contains(&name.as_str()) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    // Variable declarations

    fn parse_declarators(&mut self) -> std::result::Result<(), ParseError> {
        loop {
            self.parse_binding_target()?;
            if self.current().is_punct("=") {
                self.advance();
                self.skip_expression(&[])?;
            }
            if self.current().is_punct(",") {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    fn parse_binding_target(&mut self) -> std::result::Result<(), ParseError> {
        if self.current().is_punct("{") {
            self.advance();
            self.parse_object_pattern()
        } else if self.current().is_punct("[") {
            self.advance();
            self.parse_array_pattern()
        } else {
            let name = self.binding_name("a binding name")?;
            self.exports.insert(name);
            Ok(())
        }
    }

    fn parse_object_pattern(&mut self) -> std::result::Result<(), ParseError> {
        loop {
            if self.current().is_punct("}") {
                self.advance();
                return Ok(());
            }

            if self.current().is_punct("...") {
                self.advance();
                self.parse_binding_target()?;
            } else {
                let key = self.current().clone();
                match &key.kind {
                    TokenKind::Punct("[") => {
                        self.advance();
                        self.skip_expression(&["]"])?;
                        self.expect_punct("]")?;
                    }
                    TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Number => {
                        self.advance();
                    }
                    _ => return Err(self.unexpected("a property name in a destructuring pattern")),
                }

                if self.current().is_punct(":") {
                    self.advance();
                    self.parse_binding_target()?;
                } else if let TokenKind::Ident(name) = key.kind {
                    if RESERVED_WORDS.contains(&name.as_str()) {
                        return Err(self.error(
                            format!("'{}' cannot be used as a binding name", name),
                            key.span,
                        ));
                    }
                    self.exports.insert(name);
                } else {
                    return Err(self.unexpected("':' after a non-identifier property name"));
                }

                if self.current().is_punct("=") {
                    self.advance();
                    self.skip_expression(&[",", "}"])?;
                }
            }

            if self.current().is_punct(",") {
                self.advance();
            } else if !self.current().is_punct("}") {
                return Err(self.unexpected("',' or '}' in destructuring pattern"));
            }
        }
    }

    fn parse_array_pattern(&mut self) -> std::result::Result<(), ParseError> {
        loop {
            if self.current().is_punct("]") {
                self.advance();
                return Ok(());
            }
            if self.current().is_punct(",") {
                self.advance();
                continue;
            }

            if self.current().is_punct("...") {
                self.advance();
            }
            self.parse_binding_target()?;

            if self.current().is_punct("=") {
                self.advance();
                self.skip_expression(&[",", "]"])?;
            }

            if self.current().is_punct(",") {
                self.advance();
            } else if !self.current().is_punct("]") {
                return Err(self.unexpected("',' or ']' in destructuring pattern"));
            }
        }
    }

    /// Skips an expression, stopping before a top-level `,`, `;` or any of
    /// `stops`, or before a statement keyword that begins a new line.
    ///
    /// Brackets inside the expression must balance.
    fn skip_expression(&mut self, stops: &[&str]) -> std::result::Result<(), ParseError> {
        let mut nested: Vec<(&'static str, Span)> = Vec::new();
        let start = self.position;

        loop {
            let token = self.current().clone();
            if nested.is_empty() {
                let at_stop = match &token.kind {
                    TokenKind::Eof => true,
                    TokenKind::Punct(p) => {
                        matches!(*p, "," | ";" | ")" | "]" | "}") || stops.contains(p)
                    }
                    TokenKind::Ident(word) => {
                        self.position > start
                            && token.newline_before
                            && STATEMENT_KEYWORDS.contains(&word.as_str())
                    }
                    _ => false,
                };
                if at_stop {
                    if self.position == start {
                        return Err(self.unexpected("an expression"));
                    }
                    return Ok(());
                }
            }

            if let TokenKind::Punct(p) = token.kind {
                match p {
                    "(" | "[" | "{" => nested.push((p, token.span)),
                    ")" | "]" | "}" => {
                        let expected_open = match p {
                            ")" => "(",
                            "]" => "[",
                            _ => "{",
                        };
                        match nested.pop() {
                            Some((open, _)) if open == expected_open => {}
                            Some((open, span)) => {
                                return Err(self.error(
                                    format!(
                                        "unexpected '{}', '{}' opened at line {} is still open",
                                        p, open, span.line
                                    ),
                                    token.span,
                                ))
                            }
                            None => unreachable!("closing brackets stop the scan at depth zero"),
                        }
                    }
                    _ => {}
                }
            }

            if matches!(token.kind, TokenKind::Eof) {
                let (open, span) = nested[nested.len() - 1];
                return Err(self.error(format!("unclosed '{}'", open), span));
            }
            self.advance();
        }
    }
}
