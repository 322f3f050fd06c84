//! Pratt parser turning source fragments into [`AstExpr`] trees.

use num_bigint::BigInt;

use crate::config::SessionConfig;
use crate::context::Environment;
use crate::error::{ExprError, Location, Result};
use crate::eval::eval_ast;
use crate::lexer::{Lexer, Token};
use crate::types::{Argument, AstExpr, BinaryOp, LogicalOperator, TokenKind, UnaryOp};
use crate::value::Value;

/// Pratt parser for calculator expressions
struct PrattParser<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
    file: &'a str,
    recursion_depth: usize,
    max_recursion_depth: usize,
}

/// Token binding powers for the Pratt parser
#[derive(Debug, Clone, Copy)]
struct BindingPower {
    left: u8,
    right: u8,
}

impl BindingPower {
    const fn new(left: u8, right: u8) -> Self {
        Self { left, right }
    }

    // For left-associative operators, right binding power is left + 1
    const fn left_assoc(power: u8) -> Self {
        Self::new(power, power + 1)
    }

    // For right-associative operators, right binding power is same as left
    const fn right_assoc(power: u8) -> Self {
        Self::new(power, power)
    }
}

const NOT_BINDING_POWER: u8 = 3;
const SIGN_BINDING_POWER: u8 = 14;

impl<'a> PrattParser<'a> {
    fn new(input: &'a str, config: &'a SessionConfig) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            file: &config.file_name,
            recursion_depth: 0,
            max_recursion_depth: config.max_recursion_depth,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// The token after the current one.
    fn peek_second(&self) -> Option<Token> {
        self.lexer.clone().next_token()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.current.take();
        self.current = self.lexer.next_token();
        tok
    }

    fn location(&self, position: usize) -> Location {
        Location::from_offset(self.file, self.lexer.get_original_input(), position)
    }

    fn end_position(&self) -> usize {
        self.lexer.get_original_input().len()
    }

    fn syntax_error(&self, position: usize, message: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            location: self.location(position),
            message: message.into(),
        }
    }

    /// Error for a token that cannot start or continue an expression.
    fn unexpected(&self, tok: Option<&Token>) -> ExprError {
        match tok {
            None => self.syntax_error(self.end_position(), "unexpected end of input"),
            Some(tok) => match tok.kind {
                TokenKind::Error => ExprError::Tokenizer {
                    location: self.location(tok.position),
                    message: tok.text.clone(),
                },
                TokenKind::Close => ExprError::UnmatchedBracket {
                    location: self.location(tok.position),
                    found: tok.text.clone(),
                },
                TokenKind::String => self.syntax_error(tok.position, "unexpected string literal"),
                _ => self.syntax_error(tok.position, format!("unexpected '{}'", tok.text)),
            },
        }
    }

    fn enter(&mut self, position: usize) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > self.max_recursion_depth {
            return Err(ExprError::RecursionLimit {
                location: self.location(position),
                max_depth: self.max_recursion_depth,
            });
        }
        Ok(())
    }

    fn current_position(&self) -> usize {
        self.peek().map_or(self.end_position(), |t| t.position)
    }

    // Get binding power for an infix operator
    fn get_binding_power(tok: &Token) -> Option<BindingPower> {
        match (tok.kind, tok.text.as_str()) {
            (TokenKind::Keyword, "or") => Some(BindingPower::left_assoc(1)),
            (TokenKind::Keyword, "and") => Some(BindingPower::left_assoc(2)),
            (TokenKind::Operator, "==" | "!=" | "<" | ">" | "<=" | ">=") => {
                Some(BindingPower::left_assoc(4))
            }
            (TokenKind::Operator, "+" | "-") => Some(BindingPower::left_assoc(9)),
            (TokenKind::Operator, "*" | "/" | "//" | "%") => Some(BindingPower::left_assoc(10)),
            // Higher than unary minus, so -3**2 is -(3**2)
            (TokenKind::Operator, "**") => Some(BindingPower::right_assoc(16)),
            _ => None,
        }
    }

    // Parse an expression with the given minimum binding power
    fn parse_expr(&mut self, min_bp: u8) -> Result<AstExpr> {
        let entry_depth = self.recursion_depth;
        self.enter(self.current_position())?;

        let lhs = self.parse_prefix_or_primary(min_bp)?;
        let lhs = self.parse_postfix(lhs)?;
        let lhs = self.parse_infix_operators(lhs, min_bp)?;

        self.recursion_depth = entry_depth;
        Ok(lhs)
    }

    fn parse_prefix_or_primary(&mut self, min_bp: u8) -> Result<AstExpr> {
        let Some(tok) = self.peek() else {
            return Err(self.unexpected(None));
        };
        let position = tok.position;
        let (op, r_bp) = match (tok.kind, tok.text.as_str()) {
            (TokenKind::Operator, "-") => (UnaryOp::Neg, SIGN_BINDING_POWER),
            (TokenKind::Operator, "+") => (UnaryOp::Plus, SIGN_BINDING_POWER),
            (TokenKind::Keyword, "not") => (UnaryOp::Not, NOT_BINDING_POWER),
            _ => return self.parse_primary(),
        };
        if op == UnaryOp::Not && min_bp > NOT_BINDING_POWER {
            return Err(self.syntax_error(position, "'not' must be parenthesized here"));
        }
        self.next();

        // Handle the case where there's nothing after the operator
        if self.peek().is_none() {
            return Err(self.syntax_error(
                position,
                format!("expected expression after '{}'", op.symbol().trim_end()),
            ));
        }

        let operand = self.parse_expr(r_bp)?;
        Ok(AstExpr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_infix_operators(&mut self, mut lhs: AstExpr, min_bp: u8) -> Result<AstExpr> {
        loop {
            let Some(tok) = self.peek() else {
                break;
            };
            let Some(bp) = Self::get_binding_power(tok) else {
                break;
            };
            if bp.left < min_bp {
                break;
            }
            let op_text = tok.text.clone();
            let op_position = tok.position;
            self.next();

            let rhs = self.parse_expr(bp.right)?;

            lhs = match op_text.as_str() {
                "and" => AstExpr::LogicalOp {
                    op: LogicalOperator::And,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                "or" => AstExpr::LogicalOp {
                    op: LogicalOperator::Or,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                symbol => {
                    let op = BinaryOp::from_symbol(symbol)
                        .ok_or_else(|| self.syntax_error(op_position, format!("unknown operator '{symbol}'")))?;
                    if op.is_comparison() && self.next_is_comparison() {
                        let position = self.current_position();
                        return Err(self.syntax_error(
                            position,
                            "comparison operators cannot be chained; use 'and'",
                        ));
                    }
                    AstExpr::Binary {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    }
                }
            };
        }
        Ok(lhs)
    }

    fn next_is_comparison(&self) -> bool {
        self.peek().is_some_and(|tok| {
            tok.kind == TokenKind::Operator
                && BinaryOp::from_symbol(&tok.text).is_some_and(BinaryOp::is_comparison)
        })
    }

    // Unified method for handling all postfix operations
    fn parse_postfix(&mut self, lhs: AstExpr) -> Result<AstExpr> {
        let mut result = lhs;
        while let Some(tok) = self.peek() {
            let position = tok.position;
            match (tok.kind, tok.text.as_str()) {
                (TokenKind::Open, "(") => {
                    self.enter(position)?;
                    result = self.parse_call(result)?;
                }
                (TokenKind::Open, "[") => {
                    self.enter(position)?;
                    result = self.parse_index(result)?;
                }
                _ => break,
            }
        }
        Ok(result)
    }

    // Consume the closing delimiter matching an opening one at `opening_position`
    fn expect_closing(&mut self, closing: &str, opening: &str, opening_position: usize) -> Result<()> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Close && tok.text == closing => {
                self.next();
                Ok(())
            }
            None => Err(ExprError::UnmatchedBracket {
                location: self.location(opening_position),
                found: opening.to_string(),
            }),
            Some(tok) if tok.kind == TokenKind::Close || tok.kind == TokenKind::Error => {
                Err(self.unexpected(Some(tok)))
            }
            Some(tok) => Err(self.syntax_error(
                tok.position,
                format!("expected '{}' but found '{}'", closing, tok.text),
            )),
        }
    }

    fn at_close(&self, closing: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Close && t.text == closing)
    }

    fn at_comma(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Separator && t.text == ",")
    }

    /// Comma-separated items up to `closing`, allowing a trailing comma.
    fn parse_delimited<T>(
        &mut self,
        closing: &str,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while !self.at_close(closing) {
            items.push(item(self)?);
            if self.at_comma() {
                self.next();
            } else {
                break;
            }
        }
        Ok(items)
    }

    fn parse_call(&mut self, callee: AstExpr) -> Result<AstExpr> {
        let open_position = self.current_position();
        self.next(); // consume '('

        let mut seen_keyword = false;
        let args = self.parse_delimited(")", |parser| {
            let position = parser.current_position();
            let is_keyword = parser
                .peek()
                .is_some_and(|t| t.kind == TokenKind::Identifier)
                && parser
                    .peek_second()
                    .is_some_and(|t| t.kind == TokenKind::Assign);
            if is_keyword {
                let name = parser.next().map(|t| t.text).unwrap_or_default();
                parser.next(); // consume '='
                let value = parser.parse_expr(0)?;
                seen_keyword = true;
                Ok(Argument::Keyword { name, value })
            } else {
                let value = parser.parse_expr(0)?;
                if seen_keyword {
                    return Err(parser.syntax_error(
                        position,
                        "positional argument may not follow keyword argument",
                    ));
                }
                Ok(Argument::Positional(value))
            }
        })?;
        self.expect_closing(")", "(", open_position)?;

        Ok(AstExpr::Call {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_index(&mut self, target: AstExpr) -> Result<AstExpr> {
        let open_position = self.current_position();
        self.next(); // consume '['

        let index = self.parse_expr(0)?;
        self.expect_closing("]", "[", open_position)?;

        Ok(AstExpr::Index {
            target: Box::new(target),
            index: Box::new(index),
        })
    }

    // Parse a primary expression (literal, name, parenthesized expression, list)
    fn parse_primary(&mut self) -> Result<AstExpr> {
        let Some(tok) = self.peek() else {
            return Err(self.unexpected(None));
        };
        let position = tok.position;

        match (tok.kind, tok.text.as_str()) {
            (TokenKind::Int, text) => {
                let value = parse_int_literal(text)
                    .ok_or_else(|| self.syntax_error(position, format!("invalid int literal '{text}'")))?;
                self.next();
                Ok(AstExpr::Int(value))
            }
            (TokenKind::Float, text) => {
                let value = text
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| self.syntax_error(position, format!("invalid float literal '{text}'")))?;
                self.next();
                Ok(AstExpr::Float(value))
            }
            (TokenKind::String, _) => {
                let text = self.next().map(|t| t.text).unwrap_or_default();
                Ok(AstExpr::Str(text))
            }
            (TokenKind::Identifier, _) => {
                let name = self.next().map(|t| t.text).unwrap_or_default();
                Ok(AstExpr::Identifier(name))
            }
            (TokenKind::Open, "(") => {
                self.next();
                if self.at_close(")") {
                    return Err(self.syntax_error(position, "empty parentheses"));
                }
                let expr = self.parse_expr(0)?;
                self.expect_closing(")", "(", position)?;
                Ok(expr)
            }
            (TokenKind::Open, "[") => {
                self.next();
                let items = self.parse_delimited("]", |parser| parser.parse_expr(0))?;
                self.expect_closing("]", "[", position)?;
                Ok(AstExpr::List(items))
            }
            _ => Err(self.unexpected(Some(tok))),
        }
    }

    // Check if the expression is too long
    fn check_expression_length(&self, max: usize) -> Result<()> {
        let len = self.lexer.get_original_input().len();
        if len > max {
            return Err(ExprError::ExpressionTooLong {
                file: self.file.to_string(),
                len,
                max,
            });
        }
        Ok(())
    }

    // Parse a complete source fragment: one or more `;`-separated expressions
    fn parse(&mut self, max_expression_length: usize) -> Result<AstExpr> {
        self.check_expression_length(max_expression_length)?;
        self.recursion_depth = 0;

        let mut statements = Vec::new();
        loop {
            statements.push(self.parse_expr(0)?);
            match self.peek() {
                Some(tok) if tok.kind == TokenKind::Separator && tok.text == ";" => {
                    self.next();
                    if self.peek().is_none() {
                        break;
                    }
                }
                None => break,
                Some(tok) => return Err(self.unexpected(Some(tok))),
            }
        }

        if statements.len() == 1 {
            Ok(statements.remove(0))
        } else {
            Ok(AstExpr::Sequence(statements))
        }
    }
}

fn parse_int_literal(text: &str) -> Option<BigInt> {
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

/// Parse an expression string into an AST with the default configuration.
pub fn parse_expression(input: &str) -> Result<AstExpr> {
    parse_expression_with_config(input, &SessionConfig::default())
}

/// Parse an expression string, reporting errors against `config.file_name`
/// and enforcing the configured length and nesting limits.
pub fn parse_expression_with_config(input: &str, config: &SessionConfig) -> Result<AstExpr> {
    let mut parser = PrattParser::new(input, config);
    parser.parse(config.max_expression_length)
}

/// Parses and evaluates `expression` against `env`.
///
/// This is the stateless entry point; it does not record anything in the
/// environment's output history. Use
/// [`ExpressionSession`](crate::session::ExpressionSession) for that.
///
/// ```
/// use calclark::context::Environment;
/// use calclark::engine::interp;
/// use calclark::value::Value;
///
/// let env = Environment::standard().unwrap();
/// assert_eq!(interp("3 + 4", &env).unwrap(), Value::int(7));
/// assert_eq!(interp("-3**2", &env).unwrap(), Value::float(-9.0));
/// ```
pub fn interp(expression: &str, env: &Environment) -> Result<Value> {
    let ast = parse_expression(expression)?;
    eval_ast(&ast, env)
}
