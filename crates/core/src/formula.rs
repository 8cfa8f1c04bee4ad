//! Operator-editable formula overrides for the derived metrics, plus the
//! arithmetic expression evaluator that applies them.
//!
//! Formulas are plain arithmetic over a fixed variable set: `+ - * /`,
//! unary minus, parentheses, and the functions `ceil`, `floor`, `round`,
//! `abs`, `max`, `min`. Expressions are compiled with a hand-rolled
//! tokenizer and recursive-descent parser; evaluation never panics and
//! never yields a non-finite value.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Formula identifiers
// ---------------------------------------------------------------------------

/// The four derived metrics whose formulas an operator may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaId {
    RevenueDeficit,
    OrderDeficit,
    CurrentConversion,
    OrdersToTarget,
}

impl FormulaId {
    /// Return the identifier as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RevenueDeficit => "revenue_deficit",
            Self::OrderDeficit => "order_deficit",
            Self::CurrentConversion => "current_conversion",
            Self::OrdersToTarget => "orders_to_target",
        }
    }

    /// Parse an identifier string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "revenue_deficit" => Some(Self::RevenueDeficit),
            "order_deficit" => Some(Self::OrderDeficit),
            "current_conversion" => Some(Self::CurrentConversion),
            "orders_to_target" => Some(Self::OrdersToTarget),
            _ => None,
        }
    }

    /// All valid identifier values.
    pub const ALL: &'static [&'static str] = &[
        "revenue_deficit",
        "order_deficit",
        "current_conversion",
        "orders_to_target",
    ];
}

impl std::fmt::Display for FormulaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// One stored formula override: expression text plus an enabled toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaOverride {
    /// One of [`FormulaId::ALL`].
    pub id: String,
    /// Display label.
    pub name: String,
    /// Arithmetic expression over [`VARIABLES`].
    pub formula: String,
    pub enabled: bool,
}

/// The seeded default overrides. `resetFormulas` restores exactly these;
/// with all four enabled they reproduce the built-in derivation.
pub fn default_formulas() -> Vec<FormulaOverride> {
    vec![
        FormulaOverride {
            id: FormulaId::RevenueDeficit.as_str().to_string(),
            name: "Revenue Deficit".to_string(),
            formula: "targetRevenue - newRevenue".to_string(),
            enabled: true,
        },
        FormulaOverride {
            id: FormulaId::OrderDeficit.as_str().to_string(),
            name: "Order Deficit".to_string(),
            formula: "targetOrders - orders".to_string(),
            enabled: true,
        },
        FormulaOverride {
            id: FormulaId::CurrentConversion.as_str().to_string(),
            name: "Current Conversion".to_string(),
            formula: "orders / chatCount * 100".to_string(),
            enabled: true,
        },
        FormulaOverride {
            id: FormulaId::OrdersToTarget.as_str().to_string(),
            name: "Orders to Reach Target Conversion".to_string(),
            formula: "max(0, ceil(targetConversion / 100 * chatCount - orders))".to_string(),
            enabled: true,
        },
    ]
}

// ---------------------------------------------------------------------------
// Variables and scope
// ---------------------------------------------------------------------------

/// The variable names available inside formulas.
pub const VARIABLES: &[&str] = &[
    "orders",
    "newRevenue",
    "targetOrders",
    "targetRevenue",
    "chatCount",
    "targetConversion",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    Orders,
    NewRevenue,
    TargetOrders,
    TargetRevenue,
    ChatCount,
    TargetConversion,
}

impl Variable {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "orders" => Some(Self::Orders),
            "newRevenue" => Some(Self::NewRevenue),
            "targetOrders" => Some(Self::TargetOrders),
            "targetRevenue" => Some(Self::TargetRevenue),
            "chatCount" => Some(Self::ChatCount),
            "targetConversion" => Some(Self::TargetConversion),
            _ => None,
        }
    }

    fn resolve(&self, scope: &Scope) -> f64 {
        match self {
            Self::Orders => scope.orders,
            Self::NewRevenue => scope.new_revenue,
            Self::TargetOrders => scope.target_orders,
            Self::TargetRevenue => scope.target_revenue,
            Self::ChatCount => scope.chat_count,
            Self::TargetConversion => scope.target_conversion,
        }
    }
}

/// The per-row values a formula is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scope {
    pub orders: f64,
    pub new_revenue: f64,
    pub target_orders: f64,
    pub target_revenue: f64,
    pub chat_count: f64,
    pub target_conversion: f64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Compilation and evaluation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("Unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("Unexpected end of formula")]
    UnexpectedEnd,

    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Unknown variable '{0}'. Available: {avail}", avail = VARIABLES.join(", "))]
    UnknownVariable(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{0}' expects {1} argument(s)")]
    WrongArity(&'static str, usize),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Formula produced a non-finite result")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Num(value));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(FormulaError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Ceil,
    Floor,
    Round,
    Abs,
    Max,
    Min,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ceil" => Some(Self::Ceil),
            "floor" => Some(Self::Floor),
            "round" => Some(Self::Round),
            "abs" => Some(Self::Abs),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Ceil => "ceil",
            Self::Floor => "floor",
            Self::Round => "round",
            Self::Abs => "abs",
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    fn arity(&self) -> usize {
        match self {
            Self::Ceil | Self::Floor | Self::Round | Self::Abs => 1,
            Self::Max | Self::Min => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(f64),
    Var(Variable),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, FormulaError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(FormulaError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(FormulaError::UnexpectedToken(format!("{token:?}")))
        }
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next()? {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.pos += 1;
                    let func = Func::from_name(&name)
                        .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
                    let args = self.arguments()?;
                    if args.len() != func.arity() {
                        return Err(FormulaError::WrongArity(func.name(), func.arity()));
                    }
                    Ok(Expr::Call(func, args))
                } else {
                    let var = Variable::from_name(&name)
                        .ok_or(FormulaError::UnknownVariable(name))?;
                    Ok(Expr::Var(var))
                }
            }
            other => Err(FormulaError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = vec![self.expression()?];
        loop {
            match self.next()? {
                Token::Comma => args.push(self.expression()?),
                Token::RParen => return Ok(args),
                other => return Err(FormulaError::UnexpectedToken(format!("{other:?}"))),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

impl Expr {
    fn eval(&self, scope: &Scope) -> Result<f64, FormulaError> {
        match self {
            Expr::Num(n) => Ok(*n),
            Expr::Var(var) => Ok(var.resolve(scope)),
            Expr::Neg(inner) => Ok(-inner.eval(scope)?),
            Expr::Bin(op, lhs, rhs) => {
                let a = lhs.eval(scope)?;
                let b = rhs.eval(scope)?;
                match op {
                    BinOp::Add => Ok(a + b),
                    BinOp::Sub => Ok(a - b),
                    BinOp::Mul => Ok(a * b),
                    BinOp::Div => {
                        if b == 0.0 {
                            Err(FormulaError::DivisionByZero)
                        } else {
                            Ok(a / b)
                        }
                    }
                }
            }
            Expr::Call(func, args) => {
                let a = args[0].eval(scope)?;
                match func {
                    Func::Ceil => Ok(a.ceil()),
                    Func::Floor => Ok(a.floor()),
                    Func::Round => Ok(a.round()),
                    Func::Abs => Ok(a.abs()),
                    Func::Max => Ok(a.max(args[1].eval(scope)?)),
                    Func::Min => Ok(a.min(args[1].eval(scope)?)),
                }
            }
        }
    }
}

/// A compiled formula, ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    /// Compile an expression. Unknown variables and functions are rejected
    /// here, so a compiled formula can only fail at division or overflow.
    pub fn compile(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(FormulaError::UnexpectedEnd);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression()?;
        if parser.pos != parser.tokens.len() {
            return Err(FormulaError::UnexpectedToken(format!(
                "{:?}",
                parser.tokens[parser.pos]
            )));
        }
        Ok(Self { expr })
    }

    /// Evaluate against a row scope. Guaranteed finite on success.
    pub fn eval(&self, scope: &Scope) -> Result<f64, FormulaError> {
        let value = self.expr.eval(scope)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

/// Validate formula text for the admin save path.
pub fn validate_formula(source: &str) -> Result<(), CoreError> {
    Formula::compile(source)
        .map(|_| ())
        .map_err(|e| CoreError::Validation(format!("Invalid formula: {e}")))
}

/// Validate a formula identifier string.
pub fn validate_formula_id(id: &str) -> Result<(), CoreError> {
    if FormulaId::from_str(id).is_some() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown formula id '{}'. Must be one of: {}",
            id,
            FormulaId::ALL.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
