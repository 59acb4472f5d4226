//! Recursive-descent parser for rules, custom-function bodies and parameter
//! lists.

use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::{Spanned, Token, tokenize};
use crate::value::{Value, format_number};

/// Deepest expression/statement nesting accepted.
const MAX_NESTING: usize = 64;
/// Operator and postfix links allowed along one path of an expression tree.
const MAX_CHAIN: usize = 256;

/// Parameters of a custom function.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Params {
    pub names: Vec<String>,
    pub rest: Option<String>,
}

/// Parses a rule: a single expression, optionally followed by `;`.
///
/// Returns `None` for blank input.
pub(crate) fn parse_rule(source: &str) -> Result<Option<Expr>, SyntaxError> {
    let mut parser = Parser::new(source)?;
    parser.skip_semicolons();
    if parser.at_eof() {
        return Ok(None);
    }
    let expr = parser.expression()?;
    parser.skip_semicolons();
    parser.expect_eof()?;
    Ok(Some(expr))
}

/// Parses a function body: a sequence of statements.
pub(crate) fn parse_body(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let mut parser = Parser::new(source)?;
    let mut body = Vec::new();
    while !parser.at_eof() {
        if let Some(stmt) = parser.statement()? {
            body.push(stmt);
        }
    }
    Ok(body)
}

/// Parses a parameter list such as `a, b, ...rest`.
pub(crate) fn parse_params(source: &str) -> Result<Params, SyntaxError> {
    let mut parser = Parser::new(source)?;
    let mut params = Params::default();
    while !parser.at_eof() {
        if parser.eat(&Token::Ellipsis) {
            params.rest = Some(parser.ident()?);
            parser.eat(&Token::Comma);
            parser.expect_eof()?;
            break;
        }
        params.names.push(parser.ident()?);
        if !parser.eat(&Token::Comma) {
            parser.expect_eof()?;
        }
    }
    Ok(params)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    links: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, SyntaxError> {
        Ok(Parser {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
            links: 0,
        })
    }

    // ─── Token cursor ───────────────────────────────────────────────────────

    fn current(&self) -> &Spanned {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        *self.peek() == Token::Eof
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let at = self.current();
        SyntaxError {
            message: message.into(),
            line: at.line,
            column: at.column,
        }
    }

    fn unexpected(&self, wanted: &str) -> SyntaxError {
        self.error(format!(
            "expected {}, found {}",
            wanted,
            self.peek().describe()
        ))
    }

    fn expect(&mut self, token: Token, wanted: &str) -> Result<(), SyntaxError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(wanted))
        }
    }

    fn expect_eof(&self) -> Result<(), SyntaxError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn skip_semicolons(&mut self) {
        while self.eat(&Token::Semicolon) {}
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Counts one more operator in a left-leaning chain. Callers restore
    /// `links` once their chain is complete.
    fn link(&mut self) -> Result<(), SyntaxError> {
        self.links += 1;
        if self.links > MAX_CHAIN {
            return Err(self.error("expression too long"));
        }
        Ok(())
    }

    // ─── Statements ─────────────────────────────────────────────────────────

    /// Returns `None` for an empty statement.
    fn statement(&mut self) -> Result<Option<Stmt>, SyntaxError> {
        self.enter()?;
        let result = self.statement_inner();
        self.leave();
        result
    }

    fn statement_inner(&mut self) -> Result<Option<Stmt>, SyntaxError> {
        let token = self.peek().clone();
        let stmt = match token {
            Token::Semicolon => {
                self.advance();
                return Ok(None);
            }
            Token::LBrace => {
                self.advance();
                Stmt::Block(self.block_rest()?)
            }
            Token::If => {
                self.advance();
                self.expect(Token::LParen, "'('")?;
                let cond = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                let then = self.branch()?;
                let otherwise = if self.eat(&Token::Else) {
                    Some(self.branch()?)
                } else {
                    None
                };
                Stmt::If(cond, then, otherwise)
            }
            Token::Return => {
                self.advance();
                let value = match self.peek() {
                    Token::Semicolon | Token::RBrace | Token::Eof => None,
                    _ => Some(self.expression()?),
                };
                self.end_of_statement()?;
                Stmt::Return(value)
            }
            Token::Let => {
                self.advance();
                let name = self.ident()?;
                self.expect(Token::Assign, "'='")?;
                let value = self.expression()?;
                self.end_of_statement()?;
                Stmt::Let(name, value)
            }
            Token::Ident(name) if *self.peek_nth(1) == Token::Assign => {
                self.advance();
                self.advance();
                let value = self.expression()?;
                self.end_of_statement()?;
                Stmt::Assign(name, value)
            }
            _ => {
                let expr = self.expression()?;
                self.end_of_statement()?;
                Stmt::Expr(expr)
            }
        };
        Ok(Some(stmt))
    }

    /// Statements up to and including the closing `}`.
    fn block_rest(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    return Ok(body);
                }
                Token::Eof => return Err(self.unexpected("'}'")),
                _ => {
                    if let Some(stmt) = self.statement()? {
                        body.push(stmt);
                    }
                }
            }
        }
    }

    fn branch(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        if self.eat(&Token::LBrace) {
            self.block_rest()
        } else {
            Ok(self.statement()?.into_iter().collect())
        }
    }

    /// A statement ends at `;`, before `}`, or at end of input.
    fn end_of_statement(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            Token::Semicolon => {
                self.advance();
                Ok(())
            }
            Token::RBrace | Token::Eof => Ok(()),
            _ => Err(self.unexpected("';'")),
        }
    }

    // ─── Expressions ────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let result = self.conditional();
        self.leave();
        result
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxError> {
        let cond = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect(Token::Colon, "':'")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn logical_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.logical_and()?;
        let mark = self.links;
        loop {
            let op = match self.peek() {
                Token::OrOr => LogicalOp::Or,
                Token::QuestionQuestion => LogicalOp::Nullish,
                _ => break,
            };
            self.advance();
            self.link()?;
            let right = self.logical_and()?;
            left = Expr::Logical(op, Box::new(left), Box::new(right));
        }
        self.links = mark;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.equality()?;
        let mark = self.links;
        while self.eat(&Token::AndAnd) {
            self.link()?;
            let right = self.equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        self.links = mark;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.relational()?;
        let mark = self.links;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                Token::EqEqEq => BinaryOp::StrictEq,
                Token::NotEqEq => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            self.link()?;
            let right = self.relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.links = mark;
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.additive()?;
        let mark = self.links;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            self.link()?;
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.links = mark;
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.multiplicative()?;
        let mark = self.links;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.link()?;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.links = mark;
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.unary()?;
        let mark = self.links;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            self.link()?;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.links = mark;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.leave();
        Ok(Expr::Unary(op, Box::new(operand?)))
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        let mark = self.links;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    self.link()?;
                    let name = self.ident()?;
                    if *self.peek() == Token::LParen {
                        return Err(self.error(format!(
                            "method calls are not supported ('.{}(...)')",
                            name
                        )));
                    }
                    expr = Expr::Member(Box::new(expr), name);
                }
                Token::LBracket => {
                    self.advance();
                    self.link()?;
                    let index = self.expression()?;
                    self.expect(Token::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Token::LParen => {
                    return Err(self.error("only named functions can be called"));
                }
                _ => break,
            }
        }
        self.links = mark;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek().clone();
        match token {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(n)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            Token::Undefined => {
                self.advance();
                Ok(Expr::Literal(Value::Undefined))
            }
            Token::Ident(name) => {
                self.advance();
                if self.eat(&Token::LParen) {
                    let args = self.arguments(Token::RParen, "')'")?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                Ok(Expr::Array(self.arguments(Token::RBracket, "']'")?))
            }
            Token::LBrace => {
                self.advance();
                self.object()
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Comma-separated list (with spreads) up to and including `close`.
    fn arguments(&mut self, close: Token, wanted: &str) -> Result<Vec<Arg>, SyntaxError> {
        let mut args = Vec::new();
        loop {
            if self.eat(&close) {
                return Ok(args);
            }
            if self.eat(&Token::Ellipsis) {
                args.push(Arg::Spread(self.expression()?));
            } else {
                args.push(Arg::Expr(self.expression()?));
            }
            if !self.eat(&Token::Comma) {
                self.expect(close, wanted)?;
                return Ok(args);
            }
        }
    }

    fn object(&mut self) -> Result<Expr, SyntaxError> {
        let mut fields: Vec<(String, Expr)> = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(fields));
            }
            let (key, shorthand) = match self.peek().clone() {
                Token::Ident(name) => (name, true),
                Token::Str(s) => (s, false),
                Token::Number(n) => (format_number(n), false),
                _ => return Err(self.unexpected("property name")),
            };
            self.advance();
            let value = if self.eat(&Token::Colon) {
                self.expression()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected("':'"));
            };
            // Later duplicates win, as in object literals elsewhere.
            fields.retain(|(k, _)| *k != key);
            fields.push((key, value));
            if !self.eat(&Token::Comma) {
                self.expect(Token::RBrace, "'}'")?;
                return Ok(Expr::Object(fields));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(src: &str) -> Expr {
        parse_rule(src).unwrap().unwrap()
    }

    #[test]
    fn parses_canonical_rule() {
        let expr = rule(r#"{ disabled: true, value: sum("n1", "n2") }"#);
        let Expr::Object(fields) = expr else {
            panic!("expected object literal");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].0, "disabled");
        assert_eq!(
            fields[1].1,
            Expr::Call(
                "sum".into(),
                vec![
                    Arg::Expr(Expr::Literal(Value::String("n1".into()))),
                    Arg::Expr(Expr::Literal(Value::String("n2".into()))),
                ]
            )
        );
    }

    #[test]
    fn precedence_of_arithmetic_and_ternary() {
        let expr = rule("a + b * 2 > 3 ? 1 : 0");
        let Expr::Conditional(cond, _, _) = expr else {
            panic!("expected conditional");
        };
        let Expr::Binary(BinaryOp::Gt, left, _) = *cond else {
            panic!("expected comparison");
        };
        assert!(matches!(*left, Expr::Binary(BinaryOp::Add, _, _)));
    }

    #[test]
    fn blank_rule_is_none() {
        assert_eq!(parse_rule("  ;; ").unwrap(), None);
    }

    #[test]
    fn trailing_semicolon_allowed() {
        assert!(parse_rule("{ value: 1 };").unwrap().is_some());
    }

    #[test]
    fn rejects_method_calls() {
        let err = parse_rule("elements.find(1)").unwrap_err();
        assert!(err.message.contains("method calls"));
    }

    #[test]
    fn rejects_statements_in_rules() {
        assert!(parse_rule("return 1").is_err());
        assert!(parse_rule("{ value: 1 } { value: 2 }").is_err());
    }

    #[test]
    fn parses_function_body() {
        let body = parse_body(
            "const total = sum(...ids);\nif (total > 10) { return 5 } else return 0;",
        )
        .unwrap();
        assert_eq!(body.len(), 2);
        assert!(matches!(body[0], Stmt::Let(ref name, _) if name == "total"));
        assert!(matches!(body[1], Stmt::If(_, _, Some(_))));
    }

    #[test]
    fn parses_params_with_rest() {
        let params = parse_params("a, b, ...rest").unwrap();
        assert_eq!(params.names, vec!["a", "b"]);
        assert_eq!(params.rest.as_deref(), Some("rest"));
        assert_eq!(parse_params("  ").unwrap(), Params::default());
    }

    #[test]
    fn rejects_bad_params() {
        assert!(parse_params("a b").is_err());
        assert!(parse_params("...a, b").is_err());
        assert!(parse_params("1").is_err());
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let src = "(".repeat(10_000) + "1" + &")".repeat(10_000);
        assert!(parse_rule(&src).is_err());
    }

    #[test]
    fn long_operator_chains_are_an_error_not_a_crash() {
        let src = vec!["1"; 20_000].join(" + ");
        let err = parse_rule(&src).unwrap_err();
        assert!(err.message.contains("too long"));

        let src = format!("elements{}", "[0]".repeat(20_000));
        assert!(parse_rule(&src).is_err());
    }

    #[test]
    fn chains_within_the_limit_parse() {
        let src = vec!["1"; 200].join(" + ");
        assert!(parse_rule(&src).unwrap().is_some());
        let src = format!("{} && {}", vec!["a"; 100].join(" || "), vec!["b"; 100].join(" * "));
        assert!(parse_rule(&src).unwrap().is_some());
    }
}
