//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Precedence, lowest first: `==`/`!=`, `+`, unary `!`, postfix `.name` / `[index]`.

use crate::lexer::{tokenize, Token, TokenKind};
use crate::ExprError;
use serde_json::Value;

/// Deepest nesting of `!`, parentheses, indexes and call arguments.
const MAX_DEPTH: usize = 64;

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// `#name`
    Variable(String),
    /// `target.name`
    Member(Box<Expr>, String),
    /// `target[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `#name(args...)`
    Call(String, Vec<Expr>),
    /// `left + right`
    Add(Box<Expr>, Box<Expr>),
    /// `left == right`, or `!=` when negated.
    Equals {
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
        /// `true` for `!=`.
        negated: bool,
    },
    /// `!operand`
    Not(Box<Expr>),
}

impl Expr {
    /// Parse an expression string.
    pub fn parse(src: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(src)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: src.len(),
            depth: 0,
        };
        let expr = parser.equality()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(ExprError::syntax(
                token.position,
                format!("unexpected {}", describe(&token.kind)),
            )),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn position(&self) -> usize {
        self.peek().map(|t| t.position).unwrap_or(self.end)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(ExprError::syntax(
                self.position(),
                format!("expected {}", describe(&kind)),
            ))
        }
    }

    fn ident(&mut self) -> Result<String, ExprError> {
        let position = self.position();
        match self.next() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => Ok(name),
            _ => Err(ExprError::syntax(position, "expected identifier")),
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ExprError>,
    ) -> Result<T, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::syntax(
                self.position(),
                format!("expression nested deeper than {}", MAX_DEPTH),
            ));
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.nested(Self::equality_inner)
    }

    fn equality_inner(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.additive()?;
        loop {
            let negated = if self.eat(&TokenKind::EqEq) {
                false
            } else if self.eat(&TokenKind::NotEq) {
                true
            } else {
                return Ok(left);
            };
            let right = self.additive()?;
            left = Expr::Equals {
                left: Box::new(left),
                right: Box::new(right),
                negated,
            };
        }
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        while self.eat(&TokenKind::Plus) {
            let right = self.unary()?;
            left = Expr::Add(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Bang) {
            let operand = self.nested(Self::unary)?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let name = self.ident()?;
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.equality()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let position = self.position();
        let Some(token) = self.next() else {
            return Err(ExprError::syntax(position, "unexpected end of expression"));
        };

        match token.kind {
            TokenKind::Hash => {
                let name = self.ident()?;
                if self.eat(&TokenKind::LParen) {
                    let args = self.arguments()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            TokenKind::Str(text) => Ok(Expr::Literal(Value::String(text))),
            TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::Ident(word) => match word.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                _ => Err(ExprError::syntax(
                    position,
                    format!("unknown identifier '{}', variables need a '#' prefix", word),
                )),
            },
            TokenKind::LParen => {
                let inner = self.equality()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(ExprError::syntax(
                position,
                format!("unexpected {}", describe(&other)),
            )),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.equality()?);
            if self.eat(&TokenKind::RParen) {
                return Ok(args);
            }
            self.expect(TokenKind::Comma)?;
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Hash => "'#'".to_string(),
        TokenKind::Ident(name) => format!("identifier '{}'", name),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Number(n) => format!("number {}", n),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Dot => "'.'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Bang => "'!'".to_string(),
        TokenKind::EqEq => "'=='".to_string(),
        TokenKind::NotEq => "'!='".to_string(),
    }
}
