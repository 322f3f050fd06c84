use crate::types::TokenKind;

/// A token produced by the lexer.
///
/// `text` holds the source slice for numbers, names and operators, the decoded
/// contents for string literals, and a message for error tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

const KEYWORDS: &[&str] = &["and", "or", "not"];

/// Words reserved by the grammar that cannot be used as names.
const RESERVED: &[&str] = &[
    "if", "else", "elif", "for", "in", "while", "def", "lambda", "return", "load", "pass",
    "break", "continue",
];

/// The lexer struct, which produces tokens from an input string.
#[derive(Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Peek at the current character.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advance the position by one character.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    /// Get the original input string
    pub fn get_original_input(&self) -> &'a str {
        self.input
    }

    /// Skip whitespace and `#` comments.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, text: impl Into<String>, position: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> Token {
        self.token(TokenKind::Error, message, position)
    }

    fn eat_digits(&mut self, radix: u32) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                count += 1;
                self.advance();
            } else {
                break;
            }
        }
        count
    }

    /// Get the next token from the input.
    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start_pos = self.pos;
        let c = self.peek()?;

        if c.is_ascii_digit() || (c == '.' && self.peek_second().is_some_and(|d| d.is_ascii_digit()))
        {
            return Some(self.lex_number(start_pos));
        }

        if c == '"' || c == '\'' {
            return Some(self.lex_string(c, start_pos));
        }

        if c.is_alphabetic() || c == '_' {
            while let Some(nc) = self.peek() {
                if nc.is_alphanumeric() || nc == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
            let ident = &self.input[start_pos..self.pos];
            if KEYWORDS.contains(&ident) {
                return Some(self.token(TokenKind::Keyword, ident, start_pos));
            }
            if RESERVED.contains(&ident) {
                return Some(self.error(
                    format!("keyword '{ident}' is not supported in expressions"),
                    start_pos,
                ));
            }
            return Some(self.token(TokenKind::Identifier, ident, start_pos));
        }

        // Operators, longest match first
        let rest = &self.input[self.pos..];
        for op in ["**", "//", "==", "!=", "<=", ">="] {
            if rest.starts_with(op) {
                self.pos += op.len();
                return Some(self.token(TokenKind::Operator, op, start_pos));
            }
        }

        self.advance();
        let kind = match c {
            '+' | '-' | '*' | '/' | '%' | '<' | '>' => TokenKind::Operator,
            '(' | '[' => TokenKind::Open,
            ')' | ']' => TokenKind::Close,
            ',' | ';' => TokenKind::Separator,
            '=' => TokenKind::Assign,
            _ => return Some(self.error(format!("invalid character '{c}'"), start_pos)),
        };
        Some(self.token(kind, c.to_string(), start_pos))
    }

    /// Number (integer or float, possibly scientific notation or prefixed radix)
    fn lex_number(&mut self, start_pos: usize) -> Token {
        if self.peek() == Some('0') {
            let radix = match self.peek_second() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                self.advance();
                if self.eat_digits(radix) == 0 {
                    return self.error(
                        format!(
                            "invalid int literal '{}'",
                            &self.input[start_pos..self.pos]
                        ),
                        start_pos,
                    );
                }
                return self.finish_number(TokenKind::Int, start_pos);
            }
        }

        let mut kind = TokenKind::Int;
        self.eat_digits(10);
        if self.peek() == Some('.') {
            kind = TokenKind::Float;
            self.advance();
            self.eat_digits(10);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            kind = TokenKind::Float;
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            // Must have at least one digit after e/E
            if self.eat_digits(10) == 0 {
                return self.error(
                    format!(
                        "invalid float literal '{}'",
                        &self.input[start_pos..self.pos]
                    ),
                    start_pos,
                );
            }
        }
        if kind == TokenKind::Int {
            let literal = &self.input[start_pos..self.pos];
            if literal.len() > 1 && literal.starts_with('0') && literal.bytes().any(|b| b != b'0') {
                return self.error(
                    format!("invalid octal literal '{literal}' (use the 0o prefix)"),
                    start_pos,
                );
            }
        }
        self.finish_number(kind, start_pos)
    }

    fn finish_number(&mut self, kind: TokenKind, start_pos: usize) -> Token {
        // A number directly followed by a name character, e.g. `3x`, is malformed.
        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            while self
                .peek()
                .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
            {
                self.advance();
            }
            return self.error(
                format!("invalid numeric literal '{}'", &self.input[start_pos..self.pos]),
                start_pos,
            );
        }
        self.token(kind, &self.input[start_pos..self.pos], start_pos)
    }

    fn lex_string(&mut self, quote: char, start_pos: usize) -> Token {
        self.advance();
        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return self.error("unterminated string literal", start_pos);
            };
            self.advance();
            match c {
                c if c == quote => return self.token(TokenKind::String, value, start_pos),
                '\n' => return self.error("unterminated string literal", start_pos),
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return self.error("unterminated string literal", start_pos);
                    };
                    self.advance();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' | '\'' | '"' => value.push(escaped),
                        other => {
                            return self.error(
                                format!("invalid escape sequence \\{other}"),
                                self.pos - other.len_utf8() - 1,
                            );
                        }
                    }
                }
                c => value.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenKind;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.next_token() {
            tokens.push(tok);
        }
        tokens
    }

    #[test]
    fn test_lexer_tokenization_all_types() {
        let toks = tokens("1 + foo_bar * (2.5e-1) , -baz_123 / 'x' ; sum([1], start=2) and not b");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        for kind in [
            TokenKind::Int,
            TokenKind::Float,
            TokenKind::String,
            TokenKind::Identifier,
            TokenKind::Keyword,
            TokenKind::Operator,
            TokenKind::Open,
            TokenKind::Close,
            TokenKind::Separator,
            TokenKind::Assign,
        ] {
            assert!(kinds.contains(&kind), "missing {kind:?} in {kinds:?}");
        }
        assert!(!kinds.contains(&TokenKind::Error));
    }

    #[test]
    fn test_lexer_number_kinds() {
        let toks = tokens("3 3.0 .5 1e3 0x1F 0o17 0b101 0");
        let kinds: Vec<_> = toks.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TokenKind::Int, "3"),
                (TokenKind::Float, "3.0"),
                (TokenKind::Float, ".5"),
                (TokenKind::Float, "1e3"),
                (TokenKind::Int, "0x1F"),
                (TokenKind::Int, "0o17"),
                (TokenKind::Int, "0b101"),
                (TokenKind::Int, "0"),
            ]
        );
    }

    #[test]
    fn test_lexer_tokenization_malformed_numbers() {
        for input in ["1..2", "1e", "1e+", "0x", "3x", "012"] {
            let toks = tokens(input);
            assert!(
                toks.iter().any(|t| t.kind == TokenKind::Error),
                "expected an error token for {input:?}, got {toks:?}"
            );
        }
    }

    #[test]
    fn test_lexer_tokenization_error_tokens() {
        let toks = tokens("1 $ 2");
        assert_eq!(toks[1].kind, TokenKind::Error);
        assert_eq!(toks[1].position, 2);

        let toks = tokens("lambda x: x");
        assert_eq!(toks[0].kind, TokenKind::Error);
    }

    #[test]
    fn test_lexer_strings_and_escapes() {
        let toks = tokens(r#""a\"b" 'it\'s' "tab\there""#);
        let texts: Vec<_> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a\"b", "it's", "tab\there"]);

        let toks = tokens("'open");
        assert_eq!(toks[0].kind, TokenKind::Error);
        assert_eq!(toks[0].text, "unterminated string literal");
    }

    #[test]
    fn test_lexer_tokenization_multichar_operators() {
        let toks = tokens("a ** b // c == d != e <= f >= g < h > i % j");
        let ops: Vec<_> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["**", "//", "==", "!=", "<=", ">=", "<", ">", "%"]);
    }

    #[test]
    fn test_lexer_skips_comments() {
        let toks = tokens("1 + # trailing comment\n 2");
        assert_eq!(toks.len(), 3);
    }
}
