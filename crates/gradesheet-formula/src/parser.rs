//! Formula parser
//!
//! A recursive descent parser for column formulas with proper operator precedence.
//! Only literals, column names, arithmetic and comparison operators, and calls
//! are accepted; anything else is a parse error.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};

/// Deepest allowed nesting of parentheses, calls and unary operators
const MAX_NESTING_DEPTH: usize = 100;

/// Tallest expression tree the parser will build
const MAX_EXPRESSION_HEIGHT: usize = 200;

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use gradesheet_formula::parse_formula;
///
/// let ast = parse_formula("lab1 * 2").unwrap();
/// let ast = parse_formula("round((exam + project) / 2, 1)").unwrap();
/// let ast = parse_formula("max(lab1, lab2) >= 10").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let mut parser = FormulaParser::new(formula)?;
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if parser.current_token != Token::Eof {
        return Err(FormulaError::Parse(format!(
            "Unexpected {} at position {}",
            parser.current_token.describe(),
            parser.token_start
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),

    // Column or function name
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    EqualEqual,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    // End of input
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::String(s) => format!("string {:?}", s),
            Token::Identifier(name) => format!("name `{}`", name),
            Token::Eof => "end of formula".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::DoubleStar => "**",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::EqualEqual => "==",
            Token::NotEqual => "!=",
            Token::LessThan => "<",
            Token::LessEqual => "<=",
            Token::GreaterThan => ">",
            Token::GreaterEqual => ">=",
            Token::Comma => ",",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            _ => "",
        }
    }

    fn comparison_operator(&self) -> Option<BinaryOperator> {
        match self {
            Token::EqualEqual => Some(BinaryOperator::Equal),
            Token::NotEqual => Some(BinaryOperator::NotEqual),
            Token::LessThan => Some(BinaryOperator::LessThan),
            Token::LessEqual => Some(BinaryOperator::LessEqual),
            Token::GreaterThan => Some(BinaryOperator::GreaterThan),
            Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        }
    }
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    /// Byte offset where `current_token` starts
    token_start: usize,
    current_token: Token,
    /// Current recursion depth through `parse_unary`
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            token_start: 0,
            current_token: Token::Eof,
            depth: 0,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.current_token = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '%' => Some(Token::Percent),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // One- or two-character operators
        match c {
            '*' => {
                self.advance();
                return Ok(if self.eat('*') {
                    Token::DoubleStar
                } else {
                    Token::Star
                });
            }
            '/' => {
                self.advance();
                return Ok(if self.eat('/') {
                    Token::DoubleSlash
                } else {
                    Token::Slash
                });
            }
            '<' => {
                self.advance();
                return Ok(if self.eat('=') {
                    Token::LessEqual
                } else {
                    Token::LessThan
                });
            }
            '>' => {
                self.advance();
                return Ok(if self.eat('=') {
                    Token::GreaterEqual
                } else {
                    Token::GreaterThan
                });
            }
            '=' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::EqualEqual);
                }
                return Err(self.error_at(self.token_start, "assignment is not allowed, use `==`"));
            }
            '!' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::NotEqual);
                }
                return Err(self.error_at(self.token_start, "unexpected character '!'"));
            }
            _ => {}
        }

        // String literal
        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier (column or function name)
        if c.is_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }

        Err(self.error_at(self.pos, &format!("unexpected character {:?}", c)))
    }

    fn scan_string(&mut self, quote: char) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.error_at(start, "unterminated string literal")),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token::String(s));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c) => c,
                        None => return Err(self.error_at(start, "unterminated string literal")),
                    };
                    s.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error_at(start, &format!("invalid number '{}'", num_str)))
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier(self.input[start..self.pos].to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn error_at(&self, position: usize, message: &str) -> FormulaError {
        FormulaError::Parse(format!("{} at position {}", message, position))
    }

    fn too_deep(&self) -> FormulaError {
        self.error_at(self.token_start, "formula nested too deeply")
    }

    /// Reject trees the evaluator could not walk safely
    fn checked(&self, expr: FormulaExpr) -> FormulaResult<FormulaExpr> {
        if expression_height(&expr) > MAX_EXPRESSION_HEIGHT {
            return Err(self.too_deep());
        }
        Ok(expr)
    }

    fn binary(
        &self,
        op: BinaryOperator,
        left: FormulaExpr,
        right: FormulaExpr,
    ) -> FormulaResult<FormulaExpr> {
        self.checked(FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if &self.current_token == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(self.error_at(
                self.token_start,
                &format!(
                    "expected `{}`, found {}",
                    expected.symbol(),
                    self.current_token.describe()
                ),
            ))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: ==, !=, <, <=, >, >= (not chained)
    // 2. Addition/Subtraction: +, -
    // 3. Multiplication/Division: *, /, //, %
    // 4. Unary: -, +
    // 5. Exponentiation: ** (right associative, binds tighter than a unary on its left)
    // 6. Primary: literals, column names, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_additive()?;

        let op = match self.current_token.comparison_operator() {
            Some(op) => op,
            None => return Ok(left),
        };
        self.consume()?;
        let right = self.parse_additive()?;

        if self.current_token.comparison_operator().is_some() {
            return Err(self.error_at(self.token_start, "chained comparisons are not supported"));
        }

        self.binary(op, left, right)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_multiplicative()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::DoubleSlash => BinaryOperator::FloorDivide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_unary()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    /// Every recursive path (parentheses, call arguments, unary chains and
    /// the right side of `**`) passes through here, so the depth is counted once.
    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = self.parse_unary_inner();
        self.depth -= 1;
        result
    }

    fn parse_unary_inner(&mut self) -> FormulaResult<FormulaExpr> {
        let op = match self.current_token {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_power(),
        };

        self.consume()?;
        let operand = self.parse_unary()?;
        self.checked(FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        if matches!(self.current_token, Token::DoubleStar) {
            self.consume()?;
            let right = self.parse_unary()?; // Right associative
            return self.binary(BinaryOperator::Power, left, right);
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.consume()?;
                Ok(FormulaExpr::Number(n))
            }

            Token::String(s) => {
                self.consume()?;
                Ok(FormulaExpr::String(s))
            }

            Token::LeftParen => {
                self.consume()?;
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => {
                self.consume()?;
                // Check if it's a function call
                if matches!(self.current_token, Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(FormulaExpr::ColumnRef(name))
                }
            }

            other => Err(self.error_at(
                self.token_start,
                &format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token, Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token, Token::Comma) {
                self.consume()?;
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        self.checked(FormulaExpr::Function { name, args })
    }
}

/// Height of an expression tree; children were checked when they were built
fn expression_height(expr: &FormulaExpr) -> usize {
    match expr {
        FormulaExpr::Number(_) | FormulaExpr::String(_) | FormulaExpr::ColumnRef(_) => 1,
        FormulaExpr::UnaryOp { operand, .. } => 1 + expression_height(operand),
        FormulaExpr::BinaryOp { left, right, .. } => {
            1 + expression_height(left).max(expression_height(right))
        }
        FormulaExpr::Function { args, .. } => {
            1 + args.iter().map(expression_height).max().unwrap_or(0)
        }
    }
}
