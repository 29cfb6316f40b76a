//! Recursive descent parser for action source text
//!
//! Hand-written over the logos token stream, with precedence climbing for
//! the logical/equality operators.

use std::ops::Range;

use crate::ast::{AssignTarget, BinaryOp, Expr, Field, Program, Spanned, Stmt, UnaryOp};
use crate::lexer::Token;

/// Parse error with source location and context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub span: Range<usize>,
    pub message: String,
}

impl ParseError {
    fn expected(expected: &str, found: Option<&Token>, span: Range<usize>) -> Self {
        let message = match found {
            Some(token) => format!("expected {expected}, found {token:?}"),
            None => format!("expected {expected}, found end of input"),
        };
        Self { span, message }
    }

    fn invalid(message: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {:?}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

/// Parse a complete action body (statement sequence until end of input).
pub fn parse(tokens: &[(Token, Range<usize>)]) -> Result<Program, ParseError> {
    let mut stream = TokenStream::new(tokens);
    let mut statements = Vec::new();
    while !stream.at_end() {
        statements.push(parse_stmt(&mut stream)?);
    }
    Ok(Program { statements })
}

/// Token stream with lookahead and span tracking.
struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
}

impl<'src> TokenStream<'src> {
    fn new(tokens: &'src [(Token, Range<usize>)]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_span(&self) -> Range<usize> {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.clone(),
            // At EOF, point at the end of the last token
            None => match self.tokens.last() {
                Some((_, span)) => span.end..span.end,
                None => 0..0,
            },
        }
    }

    fn span_from(&self, start: usize) -> Range<usize> {
        let start_byte = self.tokens.get(start).map(|(_, s)| s.start).unwrap_or(0);
        let end_byte = if self.pos > 0 {
            self.tokens
                .get(self.pos - 1)
                .map(|(_, s)| s.end)
                .unwrap_or(start_byte)
        } else {
            start_byte
        };
        start_byte..end_byte
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        if matches!(self.peek(), Some(t) if std::mem::discriminant(t) == std::mem::discriminant(expected))
        {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::expected(
                what,
                self.peek(),
                self.current_span(),
            ))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        let span = self.current_span();
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name.clone()),
            other => Err(ParseError::expected(what, other, span)),
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

fn parse_stmt(stream: &mut TokenStream) -> Result<Spanned<Stmt>, ParseError> {
    let start = stream.pos;
    let stmt = match stream.peek() {
        Some(Token::If) => parse_if(stream)?,
        Some(Token::For) => parse_for(stream)?,
        _ => parse_simple_stmt(stream)?,
    };
    Ok(Spanned::new(stmt, stream.span_from(start)))
}

/// Parse: if (cond) { .. } (else if (cond) { .. })* (else { .. })?
fn parse_if(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    stream.expect(&Token::If, "'if'")?;
    let mut arms = vec![parse_if_arm(stream)?];
    let mut else_body = None;

    while matches!(stream.peek(), Some(Token::Else)) {
        stream.advance();
        if matches!(stream.peek(), Some(Token::If)) {
            stream.advance();
            arms.push(parse_if_arm(stream)?);
        } else {
            else_body = Some(parse_block(stream)?);
            break;
        }
    }

    Ok(Stmt::If { arms, else_body })
}

fn parse_if_arm(stream: &mut TokenStream) -> Result<(Expr, Vec<Spanned<Stmt>>), ParseError> {
    stream.expect(&Token::LParen, "'(' after 'if'")?;
    let cond = parse_expr(stream)?;
    stream.expect(&Token::RParen, "')' after condition")?;
    let body = parse_block(stream)?;
    Ok((cond, body))
}

/// Parse: for (x in expr) { .. }
fn parse_for(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    stream.expect(&Token::For, "'for'")?;
    stream.expect(&Token::LParen, "'(' after 'for'")?;
    let var = stream.expect_ident("loop variable")?;
    stream.expect(&Token::In, "'in'")?;
    let list = parse_expr(stream)?;
    stream.expect(&Token::RParen, "')' after loop source")?;
    let body = parse_block(stream)?;
    Ok(Stmt::For { var, list, body })
}

fn parse_block(stream: &mut TokenStream) -> Result<Vec<Spanned<Stmt>>, ParseError> {
    stream.expect(&Token::LBrace, "'{'")?;
    let mut statements = Vec::new();
    while !matches!(stream.peek(), Some(Token::RBrace)) {
        if stream.at_end() {
            return Err(ParseError::expected(
                "'}'",
                None,
                stream.current_span(),
            ));
        }
        statements.push(parse_stmt(stream)?);
    }
    stream.expect(&Token::RBrace, "'}'")?;
    Ok(statements)
}

/// Parse an assignment or a call statement, terminated by ';'.
fn parse_simple_stmt(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.pos;
    let expr = parse_expr(stream)?;

    let stmt = if matches!(stream.peek(), Some(Token::Eq)) {
        stream.advance();
        let target = as_assign_target(expr, stream.span_from(start))?;
        let value = parse_expr(stream)?;
        Stmt::Assign { target, value }
    } else {
        match expr {
            Expr::Call { callee, args } => Stmt::Call { callee, args },
            _ => {
                return Err(ParseError::invalid(
                    "expected a call, an assignment, 'if' or 'for'",
                    stream.span_from(start),
                ));
            }
        }
    };

    stream.expect(&Token::Semi, "';'")?;
    Ok(stmt)
}

/// Only variables and `<cell>.unit` are assignable.
fn as_assign_target(expr: Expr, span: Range<usize>) -> Result<AssignTarget, ParseError> {
    match expr {
        Expr::Var(name) => Ok(AssignTarget::Var(name)),
        Expr::Field {
            object,
            field: Field::Unit,
        } => Ok(AssignTarget::UnitOf(*object)),
        _ => Err(ParseError::invalid(
            "left side of '=' must be a variable or a cell's unit",
            span,
        )),
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// Operator precedence; higher binds tighter.
fn binary_op_info(token: &Token) -> Option<(u8, BinaryOp)> {
    match token {
        Token::Or => Some((10, BinaryOp::Or)),
        Token::And => Some((20, BinaryOp::And)),
        Token::EqEq => Some((30, BinaryOp::Eq)),
        Token::BangEq => Some((30, BinaryOp::Ne)),
        _ => None,
    }
}

fn parse_expr(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    parse_pratt(stream, 0)
}

/// Precedence climbing for the (left-associative) binary operators.
fn parse_pratt(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ParseError> {
    let mut left = parse_prefix(stream)?;

    while let Some(token) = stream.peek() {
        let Some((prec, op)) = binary_op_info(token) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        stream.advance();
        let right = parse_pratt(stream, prec + 1)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    Ok(left)
}

fn parse_prefix(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    if matches!(stream.peek(), Some(Token::Not)) {
        stream.advance();
        let operand = parse_prefix(stream)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        });
    }
    parse_postfix(stream)
}

/// Field access and call postfix forms.
fn parse_postfix(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let mut expr = parse_atom(stream)?;

    loop {
        match stream.peek() {
            Some(Token::Dot) => {
                stream.advance();
                let span = stream.current_span();
                let name = stream.expect_ident("field name after '.'")?;
                let field = Field::from_name(&name).ok_or_else(|| {
                    ParseError::invalid(
                        format!("unknown field '.{name}' (expected unit, cell or isAlly)"),
                        span,
                    )
                })?;
                expr = Expr::Field {
                    object: Box::new(expr),
                    field,
                };
            }
            Some(Token::LParen) => {
                let span = stream.current_span();
                let args = parse_call_args(stream)?;
                match expr {
                    Expr::Var(callee) => expr = Expr::Call { callee, args },
                    _ => {
                        return Err(ParseError::invalid(
                            "only named procedures can be called",
                            span,
                        ));
                    }
                }
            }
            _ => break,
        }
    }

    Ok(expr)
}

fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Expr>, ParseError> {
    stream.expect(&Token::LParen, "'('")?;
    let mut args = Vec::new();
    while !matches!(stream.peek(), Some(Token::RParen)) {
        args.push(parse_expr(stream)?);
        if !matches!(stream.peek(), Some(Token::RParen)) {
            stream.expect(&Token::Comma, "','")?;
        }
    }
    stream.expect(&Token::RParen, "')'")?;
    Ok(args)
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Number(n)) => Ok(Expr::Number(*n)),
        Some(Token::True) => Ok(Expr::Bool(true)),
        Some(Token::False) => Ok(Expr::Bool(false)),
        Some(Token::Ident(name)) => Ok(Expr::Var(name.clone())),
        Some(Token::LParen) => {
            let inner = parse_expr(stream)?;
            stream.expect(&Token::RParen, "')'")?;
            Ok(inner)
        }
        other => Err(ParseError::expected("an expression", other, span)),
    }
}
