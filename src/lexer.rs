//! Tokenizer for rule and custom-function source text.

use crate::error::SyntaxError;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Undefined,
    Return,
    Let,
    If,
    Else,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Ellipsis,
    Question,
    QuestionQuestion,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Eof,
}

impl Token {
    /// Human-readable rendering for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string {:?}", s),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Undefined => "undefined",
            Token::Return => "return",
            Token::Let => "let",
            Token::If => "if",
            Token::Else => "else",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Dot => ".",
            Token::Ellipsis => "...",
            Token::Question => "?",
            Token::QuestionQuestion => "??",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Assign => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::EqEqEq => "===",
            Token::NotEqEq => "!==",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Number(_) | Token::Str(_) | Token::Ident(_) | Token::Eof => "",
        }
    }
}

/// A token plus the 1-based position it starts at.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut lexer = Lexer {
        chars: input.chars().peekable(),
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl Lexer<'_> {
    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            line,
            column,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek() {
                        Some('/') => {
                            while let Some(c) = self.chars.peek() {
                                if *c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            let (line, column) = (self.line, self.column);
                            self.bump();
                            self.bump();
                            loop {
                                match self.bump() {
                                    Some('*') if self.eat('/') => break,
                                    Some(_) => {}
                                    None => {
                                        return Err(self.error(line, column, "unterminated comment"));
                                    }
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, SyntaxError> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let spanned = |token| Spanned {
            token,
            line,
            column,
        };

        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(spanned(Token::Eof)),
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '.' => {
                if self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Ok(spanned(self.number(c, line, column)?));
                }
                if self.eat('.') {
                    if self.eat('.') {
                        Token::Ellipsis
                    } else {
                        return Err(self.error(line, column, "unexpected '..'"));
                    }
                } else {
                    Token::Dot
                }
            }
            '?' => {
                if self.eat('?') {
                    Token::QuestionQuestion
                } else {
                    Token::Question
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        Token::NotEqEq
                    } else {
                        Token::NotEq
                    }
                } else {
                    Token::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        Token::EqEqEq
                    } else {
                        Token::EqEq
                    }
                } else {
                    Token::Assign
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    Token::AndAnd
                } else {
                    return Err(self.error(line, column, "bitwise '&' is not supported"));
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::OrOr
                } else {
                    return Err(self.error(line, column, "bitwise '|' is not supported"));
                }
            }
            '"' | '\'' => self.string(c, line, column)?,
            c if c.is_ascii_digit() => self.number(c, line, column)?,
            c if is_ident_start(c) => self.word(c),
            other => {
                return Err(self.error(line, column, format!("unexpected character '{}'", other)));
            }
        };

        Ok(spanned(token))
    }

    fn number(&mut self, first: char, line: usize, column: usize) -> Result<Token, SyntaxError> {
        let mut text = String::new();
        text.push(first);
        let mut seen_dot = first == '.';
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !seen_dot {
                let mut ahead = self.chars.clone();
                ahead.next();
                // `1..` is never a number; leave the dots for the parser to reject.
                if ahead.peek() == Some(&'.') {
                    break;
                }
                seen_dot = true;
                text.push(c);
            } else if c == 'e' || c == 'E' {
                text.push(c);
                self.bump();
                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        text.push(sign);
                        self.bump();
                    }
                }
                if !self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error(line, column, format!("invalid number '{}'", text)));
                }
                continue;
            } else {
                break;
            }
            self.bump();
        }

        if self.chars.peek().is_some_and(|c| is_ident_start(*c)) {
            return Err(self.error(line, column, "identifier starts immediately after number"));
        }

        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error(line, column, format!("invalid number '{}'", text)))
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> Result<Token, SyntaxError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error(line, column, "unterminated string")),
                Some(c) if c == quote => return Ok(Token::Str(value)),
                Some('\\') => {
                    let (esc_line, esc_column) = (self.line, self.column);
                    match self.bump() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('0') => value.push('\0'),
                        Some('u') => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = self
                                    .bump()
                                    .and_then(|c| c.to_digit(16))
                                    .ok_or_else(|| {
                                        self.error(esc_line, esc_column, "invalid unicode escape")
                                    })?;
                                code = code * 16 + digit;
                            }
                            let c = char::from_u32(code).ok_or_else(|| {
                                self.error(esc_line, esc_column, "invalid unicode escape")
                            })?;
                            value.push(c);
                        }
                        Some(c) => value.push(c),
                        None => return Err(self.error(line, column, "unterminated string")),
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn word(&mut self, first: char) -> Token {
        let mut word = String::new();
        word.push(first);
        while let Some(&c) = self.chars.peek() {
            if !is_ident_continue(c) {
                break;
            }
            word.push(c);
            self.bump();
        }
        match word.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "undefined" => Token::Undefined,
            "return" => Token::Return,
            "const" | "let" | "var" => Token::Let,
            "if" => Token::If,
            "else" => Token::Else,
            _ => Token::Ident(word),
        }
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
