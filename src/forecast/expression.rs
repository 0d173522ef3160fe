//! Restricted algebraic expression language for the fitted county models.
//!
//! Equations arrive as text such as `"y = L * sigmoid(0.21 * (x - 2031.5))"`.
//! Only the text between the first and second `=` is compiled, so a trailing
//! `= ...` is ignored. The grammar knows
//! numeric literals, the free variable `x`, the constant `L`, the four
//! arithmetic operators, `^`/`**` for powers, parentheses and the functions
//! `sigmoid`, `exp`, `log` and `sqrt`. Nothing else can be named, so an
//! equation cannot reach anything outside this module.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | 'x' | 'L' | func '(' expr ')' | '(' expr ')'
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ForecastError;

/// Value bound to the `L` symbol (logistic ceiling of an adoption fraction).
pub const L_VALUE: f64 = 1.0;

/// Deepest nesting of parentheses, calls, signs and exponents accepted.
pub const MAX_DEPTH: usize = 128;

/// Longest equation body, in tokens.
pub const MAX_TOKENS: usize = 4096;

/// Largest `-z` for which `exp(-z)` stays finite.
const SIGMOID_SATURATION: f64 = 709.0;

/// Why an equation could not be compiled or evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("missing '=' between label and expression")]
    MissingAssignment,

    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("'{0}' is a function and must be called")]
    BareFunction(String),

    #[error("'{0}' is not a function")]
    NotCallable(String),

    #[error("{0}() takes exactly one argument")]
    Arity(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("math domain error: {0}")]
    Domain(String),

    #[error("result is not a finite number")]
    NonFinite,

    #[error("expression is nested more than {} levels deep", MAX_DEPTH)]
    TooDeep,

    #[error("expression is longer than {} tokens", MAX_TOKENS)]
    TooLong,
}

/// Functions callable from an equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Function {
    Sigmoid,
    Exp,
    Log,
    Sqrt,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sigmoid" => Some(Function::Sigmoid),
            "exp" => Some(Function::Exp),
            "log" => Some(Function::Log),
            "sqrt" => Some(Function::Sqrt),
            _ => None,
        }
    }

    fn apply(self, z: f64) -> Result<f64, ExpressionError> {
        match self {
            Function::Sigmoid => Ok(sigmoid(z)),
            Function::Exp => {
                let v = z.exp();
                if v.is_finite() {
                    Ok(v)
                } else {
                    Err(ExpressionError::Domain(format!("exp({z}) overflows")))
                }
            }
            Function::Log => {
                if z > 0.0 {
                    Ok(z.ln())
                } else {
                    Err(ExpressionError::Domain(format!("log of non-positive value {z}")))
                }
            }
            Function::Sqrt => {
                if z >= 0.0 {
                    Ok(z.sqrt())
                } else {
                    Err(ExpressionError::Domain(format!("sqrt of negative value {z}")))
                }
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Sigmoid => write!(f, "sigmoid"),
            Function::Exp => write!(f, "exp"),
            Function::Log => write!(f, "log"),
            Function::Sqrt => write!(f, "sqrt"),
        }
    }
}

/// Saturating logistic `1 / (1 + e^-z)`.
pub fn sigmoid(z: f64) -> f64 {
    if -z > SIGMOID_SATURATION {
        0.0
    } else if z > SIGMOID_SATURATION {
        1.0
    } else {
        1.0 / (1.0 + (-z).exp())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Parsed equation body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Variable,
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        arg: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate with `x` bound to the given value.
    pub fn eval(&self, x: f64) -> Result<f64, ExpressionError> {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Variable => Ok(x),
            Expr::Neg(inner) => Ok(-inner.eval(x)?),
            Expr::Call { func, arg } => func.apply(arg.eval(x)?),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval(x)?;
                let b = rhs.eval(x)?;
                match op {
                    BinaryOp::Add => Ok(a + b),
                    BinaryOp::Sub => Ok(a - b),
                    BinaryOp::Mul => Ok(a * b),
                    BinaryOp::Div => {
                        if b == 0.0 {
                            Err(ExpressionError::DivisionByZero)
                        } else {
                            Ok(a / b)
                        }
                    }
                    BinaryOp::Pow => power(a, b),
                }
            }
        }
    }
}

fn power(base: f64, exponent: f64) -> Result<f64, ExpressionError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(ExpressionError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(ExpressionError::Domain(format!(
            "{base} raised to fractional power {exponent}"
        )));
    }
    Ok(base.powf(exponent))
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(v) => write!(f, "number {v}"),
            Token::Ident(name) => write!(f, "'{name}'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Caret => write!(f, "'^'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if tokens.len() > MAX_TOKENS {
            return Err(ExpressionError::TooLong);
        }
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => tokens.push(lex_number(&mut chars)?),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            '*' => {
                chars.next();
                // `**` is the same operator as `^`
                if matches!(chars.peek(), Some(&(_, '*'))) {
                    chars.next();
                    tokens.push(Token::Caret);
                } else {
                    tokens.push(Token::Star);
                }
            }
            _ => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '/' => Token::Slash,
                    '^' => Token::Caret,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    other => return Err(ExpressionError::UnexpectedChar(other, pos)),
                };
                chars.next();
                tokens.push(token);
            }
        }
    }

    if tokens.len() > MAX_TOKENS {
        return Err(ExpressionError::TooLong);
    }
    Ok(tokens)
}

fn lex_number(chars: &mut Peekable<CharIndices<'_>>) -> Result<Token, ExpressionError> {
    let mut text = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }

    // Scientific notation: `e` only belongs to the literal when digits follow.
    if let Some(&(_, e)) = chars.peek() {
        if e == 'e' || e == 'E' {
            let mut lookahead = chars.clone();
            lookahead.next();
            let mut exponent = String::from(e);
            if let Some(&(_, sign)) = lookahead.peek() {
                if sign == '+' || sign == '-' {
                    exponent.push(sign);
                    lookahead.next();
                }
            }
            let mut digits = 0;
            while let Some(&(_, d)) = lookahead.peek() {
                if d.is_ascii_digit() {
                    exponent.push(d);
                    lookahead.next();
                    digits += 1;
                } else {
                    break;
                }
            }
            if digits > 0 {
                text.push_str(&exponent);
                *chars = lookahead;
            }
        }
    }

    text.parse::<f64>()
        .map(Token::Number)
        .map_err(|_| ExpressionError::InvalidNumber(text))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        match self.advance() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(ExpressionError::UnexpectedToken(t.to_string())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// Parentheses, call arguments, signs and exponents all re-enter here.
    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        self.depth += 1;
        let result = self.parse_signed();
        self.depth -= 1;
        result
    }

    fn parse_signed(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.parse_primary()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            // Right-associative; the exponent may carry its own sign.
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.advance() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.parse_identifier(name),
            Some(t) => Err(ExpressionError::UnexpectedToken(t.to_string())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Expr, ExpressionError> {
        let is_call = matches!(self.peek(), Some(Token::LParen));
        let symbol = match name.as_str() {
            "x" => Some(Expr::Variable),
            "L" => Some(Expr::Number(L_VALUE)),
            _ => None,
        };

        if let Some(expr) = symbol {
            if is_call {
                return Err(ExpressionError::NotCallable(name));
            }
            return Ok(expr);
        }

        let Some(func) = Function::from_name(&name) else {
            return Err(ExpressionError::UnknownIdentifier(name));
        };
        if !is_call {
            return Err(ExpressionError::BareFunction(name));
        }
        self.advance();
        let arg = self.parse_expr()?;
        if matches!(self.peek(), Some(Token::Comma)) {
            return Err(ExpressionError::Arity(name));
        }
        self.expect(Token::RParen)?;
        Ok(Expr::Call {
            func,
            arg: Box::new(arg),
        })
    }
}

/// Compile an expression body (no `label =` prefix).
pub fn parse_expression(body: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expr()?;
    match parser.advance() {
        None => Ok(expr),
        Some(t) => Err(ExpressionError::UnexpectedToken(t.to_string())),
    }
}

/// A compiled `label = expression` model equation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub label: String,
    pub source: String,
    pub expr: Expr,
}

impl Equation {
    /// Parse `"<label> = <expression>"`. Anything after a second `=` is
    /// dropped.
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let mut parts = text.split('=');
        let label = parts.next().unwrap_or_default();
        let body = parts.next().ok_or(ExpressionError::MissingAssignment)?;
        Ok(Self {
            label: label.trim().to_string(),
            source: text.to_string(),
            expr: parse_expression(body)?,
        })
    }

    /// Evaluate at `x`; non-finite results are rejected.
    pub fn eval(&self, x: f64) -> Result<f64, ExpressionError> {
        let value = self.expr.eval(x)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExpressionError::NonFinite)
        }
    }
}

/// Parse and evaluate an equation in one step.
///
/// Failures carry the equation text so the caller can log it; the text is not
/// part of the error's display message.
///
/// # Examples
///
/// ```
/// use ev_forecast::forecast::evaluate;
///
/// let v = evaluate("y = sigmoid(x)", 0.0).unwrap();
/// assert!((v - 0.5).abs() < 1e-9);
/// assert!(evaluate("y = 1/x", 0.0).is_err());
/// ```
pub fn evaluate(text: &str, x: f64) -> Result<f64, ForecastError> {
    Equation::parse(text)
        .and_then(|eq| eq.eval(x))
        .map_err(|e| ForecastError::ModelEvaluationFailed {
            expression: text.to_string(),
            reason: e.to_string(),
        })
}
