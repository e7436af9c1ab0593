//! Lexer for Orbit source.

use log::trace;

use crate::ast::Position;
use crate::error::OrbitError;
use crate::phase::Phase;

/// Kind of a token produced by the lexer.
///
/// Value and type identifiers are distinguished here, by the case of
/// the first letter, so the parser never has to re-inspect the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Identifiers and literals
    Identifier,
    TypeIdentifier,
    IntLiteral,
    RealLiteral,

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    Comma,    // ,
    Dot,      // .

    // Arithmetic operators: + - * /
    Operator,

    // Keywords
    Api,
    Type,
    Return,
    Defer,

    Eof,
}

/// A single token with its kind, text and source position.
///
/// Tokens own their text so they can outlive the source buffer; the
/// buffer is consumed by the lexing phase and not threaded further.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

/// Tokenizes a source buffer. Fails on the first character that does
/// not belong to the language.
#[derive(Debug, Default)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }
}

impl Phase for Lexer {
    type Input = String;
    type Output = Vec<Token>;

    fn execute(&self, input: String) -> Result<Vec<Token>, OrbitError> {
        trace!("lexing {} bytes", input.len());
        let mut scanner = Scanner {
            chars: input.as_bytes(),
            len: input.len(),
            index: 0,
            line: 1,
            column: 1,
        };
        scanner.run(&input)
    }
}

struct Scanner<'src> {
    chars: &'src [u8],
    len: usize,
    index: usize,
    line: u32,
    column: u32,
}

impl<'src> Scanner<'src> {
    fn run(&mut self, source: &str) -> Result<Vec<Token>, OrbitError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }

            // Line comments run to end of line.
            if ch == b'/' && self.peek_next() == Some(b'/') {
                while let Some(c) = self.peek_char() {
                    if c == b'\n' {
                        break;
                    }
                    self.consume_char();
                }
                continue;
            }

            let position = self.position();
            let token = match ch {
                b'(' => self.punct(TokenKind::LParen, "(", position),
                b')' => self.punct(TokenKind::RParen, ")", position),
                b'{' => self.punct(TokenKind::LBrace, "{", position),
                b'}' => self.punct(TokenKind::RBrace, "}", position),
                b',' => self.punct(TokenKind::Comma, ",", position),
                b'.' => self.punct(TokenKind::Dot, ".", position),
                b'+' | b'-' | b'*' | b'/' => {
                    self.consume_char();
                    Token {
                        kind: TokenKind::Operator,
                        text: (ch as char).to_string(),
                        position,
                    }
                }
                b'0'..=b'9' => self.lex_number(source, position),
                _ => {
                    if is_ident_start(ch) {
                        self.lex_word(source, position)
                    } else {
                        return Err(OrbitError::Compilation(format!(
                            "lex error at {position}: unexpected character '{}'",
                            ch as char
                        )));
                    }
                }
            };
            tokens.push(token);
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            position: self.position(),
        });
        Ok(tokens)
    }

    fn punct(&mut self, kind: TokenKind, text: &str, position: Position) -> Token {
        self.consume_char();
        Token {
            kind,
            text: text.to_string(),
            position,
        }
    }

    fn lex_number(&mut self, source: &str, position: Position) -> Token {
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.consume_char();
            } else {
                break;
            }
        }

        let mut is_real = false;
        // A dot makes this a real literal only when a digit follows;
        // otherwise the dot belongs to a method call.
        if self.peek_char() == Some(b'.') {
            if let Some(next) = self.peek_next() {
                if next.is_ascii_digit() {
                    is_real = true;
                    self.consume_char();
                    while let Some(ch) = self.peek_char() {
                        if ch.is_ascii_digit() {
                            self.consume_char();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        Token {
            kind: if is_real {
                TokenKind::RealLiteral
            } else {
                TokenKind::IntLiteral
            },
            text: source[start..self.index].to_string(),
            position,
        }
    }

    fn lex_word(&mut self, source: &str, position: Position) -> Token {
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let text = &source[start..self.index];
        let kind = match text {
            "api" => TokenKind::Api,
            "type" => TokenKind::Type,
            "return" => TokenKind::Return,
            "defer" => TokenKind::Defer,
            _ => {
                if text.as_bytes()[0].is_ascii_uppercase() {
                    TokenKind::TypeIdentifier
                } else {
                    TokenKind::Identifier
                }
            }
        };

        Token {
            kind,
            text: text.to_string(),
            position,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.len {
            if self.chars[self.index] == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new().execute(input.to_string()).expect("lex")
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        let tokens = lex("api Counter { type State(value Int) }");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Api,
                TokenKind::TypeIdentifier,
                TokenKind::LBrace,
                TokenKind::Type,
                TokenKind::TypeIdentifier,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::TypeIdentifier,
                TokenKind::RParen,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn splits_identifiers_by_leading_case() {
        let tokens = lex("point Point");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].kind, TokenKind::TypeIdentifier);
    }

    #[test]
    fn lexes_int_and_real_literals() {
        let tokens = lex("42 3.25");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[0].text, "42");
        assert_eq!(tokens[1].kind, TokenKind::RealLiteral);
        assert_eq!(tokens[1].text, "3.25");
    }

    #[test]
    fn dot_after_number_is_a_method_call_not_a_real() {
        let tokens = lex("1.abs()");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn tracks_line_and_column_positions() {
        let tokens = lex("a\n  + b");
        assert_eq!(tokens[0].position, Position::new(1, 1));
        assert_eq!(tokens[1].position, Position::new(2, 3));
        assert_eq!(tokens[1].text, "+");
        assert_eq!(tokens[2].position, Position::new(2, 5));
    }

    #[test]
    fn skips_line_comments() {
        let tokens = lex("a // trailing comment\nb");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].text, "b");
    }

    #[test]
    fn rejects_unexpected_characters() {
        let err = Lexer::new().execute("a ? b".to_string()).unwrap_err();
        assert!(matches!(err, OrbitError::Compilation(_)));
        assert!(err.to_string().contains("1:3"));
    }
}
