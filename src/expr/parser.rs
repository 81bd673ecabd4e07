//! Recursive-descent expression parser
//!
//! Precedence, lowest first:
//!
//! ```text
//! or      := and ('||' and)*
//! and     := cmp ('&&' cmp)*
//! cmp     := sum (('=='|'!='|'<'|'<='|'>'|'>=') sum)?
//! sum     := product (('+'|'-') product)*
//! product := unary (('*'|'/'|'%') unary)*
//! unary   := ('-'|'!') unary | primary
//! primary := number | string | @field | ident '(' args ')' | '(' or ')'
//! ```

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::errors::{ExprError, ExprResult};
use super::functions::Function;
use super::lexer::{tokenize, Spanned, Token};
use super::value::Scalar;

/// Deepest accepted nesting of parentheses, calls and unary operators
const MAX_DEPTH: usize = 128;

/// Compiles expression text into a tree
pub fn parse_expression(source: &str) -> ExprResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.chars().count(),
        depth: 0,
    };

    if parser.tokens.is_empty() {
        return Err(ExprError::syntax(0, "empty expression"));
    }

    let expr = parser.parse_or()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(t) => Err(ExprError::syntax(t.position, "unexpected trailing input")),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> ExprResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(ExprError::syntax(self.position(), format!("expected {}", what)))
        }
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Self::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_comparison()?;
            lhs = Self::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let lhs = self.parse_sum()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_sum()?;
        Ok(Self::binary(op, lhs, rhs))
    }

    fn parse_sum(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_product()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_product(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::syntax(self.position(), "expression nested too deeply"));
        }
        self.depth += 1;
        let result = self.parse_prefixed();
        self.depth -= 1;
        result
    }

    fn parse_prefixed(&mut self) -> ExprResult<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Not) => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;

        // Fold negative literals so `-1` stays a literal
        if let (UnaryOp::Neg, Expr::Literal(Scalar::Number(n))) = (op, &operand) {
            return Ok(Expr::Literal(Scalar::Number(-n)));
        }
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        let position = self.position();
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Scalar::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Scalar::Text(s))),
            Some(Token::Field(name)) => Ok(Expr::Field(name)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.parse_call(name, position),
            Some(_) => Err(ExprError::syntax(position, "unexpected token")),
            None => Err(ExprError::syntax(position, "unexpected end of expression")),
        }
    }

    fn parse_call(&mut self, name: String, position: usize) -> ExprResult<Expr> {
        match name.to_ascii_lowercase().as_str() {
            "true" => return Ok(Expr::Literal(Scalar::Bool(true))),
            "false" => return Ok(Expr::Literal(Scalar::Bool(false))),
            "null" => return Ok(Expr::Literal(Scalar::Null)),
            _ => {}
        }

        if self.peek() != Some(&Token::LParen) {
            return Err(ExprError::syntax(
                position,
                format!("expected '(' after '{}'; fields are written '@{}'", name, name),
            ));
        }
        self.pos += 1;

        let function = Function::lookup(&name).ok_or(ExprError::UnknownFunction(name))?;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, "',' or ')'")?;
            }
        }

        function.check_arity(args.len())?;
        Ok(Expr::Call { function, args })
    }
}
