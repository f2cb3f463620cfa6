use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("The formula is empty")]
    Empty,
    #[error("Unexpected end of formula")]
    UnexpectedEnd,
    #[error("Unexpected '{found}' at position {position}")]
    Unexpected { found: char, position: usize },
    #[error("Unknown function '{0}'")]
    UnknownFunction (char),
}

/// Evaluates the transfer formula grammar: numbers, `+ - * /`, parentheses
/// and the rounding functions `r`, `d`/`f` and `u`/`c`.
pub fn evaluate(formula: &str) -> Result<f64, FormulaError> {
    let mut parser = Parser { chars: formula.chars().collect(), position: 0 };
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(FormulaError::Empty);
    }
    let value = parser.expression()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some(found) => Err(FormulaError::Unexpected { found, position: parser.position }),
    }
}

struct Parser {
    chars: Vec<char>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn next_token(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.peek()
    }

    fn expect(&mut self, expected: char) -> Result<(), FormulaError> {
        match self.next_token() {
            Some(found) if found == expected => {
                self.position += 1;
                Ok(())
            }
            Some(found) => Err(FormulaError::Unexpected { found, position: self.position }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.next_token() {
            self.position += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.unary()?;
        while let Some(op @ ('*' | '/')) = self.next_token() {
            self.position += 1;
            let rhs = self.unary()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, FormulaError> {
        match self.next_token() {
            Some('-') => {
                self.position += 1;
                Ok(-self.unary()?)
            }
            Some('+') => {
                self.position += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, FormulaError> {
        let Some(c) = self.next_token() else {
            return Err(FormulaError::UnexpectedEnd);
        };
        match c {
            '(' => {
                self.position += 1;
                let value = self.expression()?;
                self.expect(')')?;
                Ok(value)
            }
            '0'..='9' | '.' => self.number(),
            c if c.is_ascii_alphabetic() => {
                self.position += 1;
                let round: fn(f64) -> f64 = match c.to_ascii_lowercase() {
                    'r' => |x: f64| (x + 0.5).floor(),
                    'd' | 'f' => f64::floor,
                    'u' | 'c' => f64::ceil,
                    other => return Err(FormulaError::UnknownFunction(other)),
                };
                self.expect('(')?;
                let value = self.expression()?;
                self.expect(')')?;
                Ok(round(value))
            }
            found => Err(FormulaError::Unexpected { found, position: self.position }),
        }
    }

    fn number(&mut self) -> Result<f64, FormulaError> {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.position += 1;
        }
        let text: String = self.chars[start..self.position].iter().collect();
        text.parse().map_err(|_| FormulaError::Unexpected { found: '.', position: start })
    }
}

/// Renders a number the way the page writes it into an attribute.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() }
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(evaluate("2*21"), Ok(42.0));
        assert_eq!(evaluate("2*(6-2)+8"), Ok(16.0));
        assert_eq!(evaluate(" -9 "), Ok(-9.0));
        assert_eq!(evaluate("10/4"), Ok(2.5));
    }

    #[test]
    fn rounding_functions() {
        assert_eq!(evaluate("r(5/3)"), Ok(2.0));
        assert_eq!(evaluate("d(5/3)"), Ok(1.0));
        assert_eq!(evaluate("u(5/3)"), Ok(2.0));
        assert_eq!(evaluate("f(5/3)"), Ok(1.0));
        assert_eq!(evaluate("r(-2.5)"), Ok(-2.0));
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        assert_eq!(evaluate("1/0"), Ok(f64::INFINITY));
        assert!(evaluate("0/0").unwrap().is_nan());
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(42.0), "42");
    }

    #[test]
    fn broken_formulas() {
        assert_eq!(evaluate(""), Err(FormulaError::Empty));
        assert_eq!(evaluate("2*("), Err(FormulaError::UnexpectedEnd));
        assert_eq!(evaluate("x(2)"), Err(FormulaError::UnknownFunction('x')));
        assert!(matches!(evaluate("2 3"), Err(FormulaError::Unexpected { found: '3', .. })));
    }
}
