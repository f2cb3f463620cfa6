/// What typing into the formula input asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormulaCheck {
    /// Nothing to show.
    Neutral,
    /// Ends in an operator; the user is still typing.
    AwaitMore,
    /// A plain number, no need to ask the page.
    Immediate (f64),
    /// Needs the page to evaluate it.
    Remote,
}

pub fn classify(formula: &str) -> FormulaCheck {
    let formula = formula.trim();
    if matches!(formula, "" | "+" | "-") {
        return FormulaCheck::Neutral;
    }
    if formula.ends_with(['+', ',', '-', '.', '/', '*']) {
        return FormulaCheck::AwaitMore;
    }
    match formula.parse::<f64>() {
        Ok(value) if value.is_finite() => FormulaCheck::Immediate(value),
        _ => FormulaCheck::Remote,
    }
}

/// Status line and submit button of the transaction form.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormStatus {
    #[default]
    Neutral,
    Amount (f64),
    NonInteger (f64),
    Infinite,
    BadFormula { detail: String },
}

pub const BAD_FORMULA_HINT: &str = "Bad formula. Hover to see why.";
pub const NON_INTEGER_HINT: &str = "Make whole by r(..), u(..) or d(..)";
pub const INFINITE_HINT: &str = "Result is infinite!";

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl FormStatus {
    pub fn for_value(value: f64) -> FormStatus {
        if value.is_nan() {
            FormStatus::BadFormula { detail: "The result is not a number".to_owned() }
        } else if value.is_infinite() {
            FormStatus::Infinite
        } else if value.fract() == 0.0 {
            FormStatus::Amount(value)
        } else {
            FormStatus::NonInteger(value)
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            FormStatus::Neutral | FormStatus::Amount(_) => "",
            FormStatus::NonInteger(_) => NON_INTEGER_HINT,
            FormStatus::Infinite => INFINITE_HINT,
            FormStatus::BadFormula { .. } => BAD_FORMULA_HINT,
        }
    }

    pub fn hover(&self) -> Option<&str> {
        match self {
            FormStatus::BadFormula { detail } => Some(detail),
            _ => None,
        }
    }

    pub fn submit_label(&self) -> String {
        match self {
            FormStatus::Amount(value) | FormStatus::NonInteger(value) => {
                let verb = if *value >= 0.0 { "Gain" } else { "Lose" };
                format!("{verb} {}", format_amount(value.abs()))
            }
            _ => "Gain / Lose".to_owned(),
        }
    }

    pub fn submit_enabled(&self) -> bool {
        matches!(self, FormStatus::Amount(_))
    }

    pub fn in_error(&self) -> bool {
        !matches!(self, FormStatus::Neutral | FormStatus::Amount(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char (char),
    Enter { shift: bool },
    Escape,
    Backspace,
    Left,
    Right,
    Other (String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Submit { close: bool },
    Blur,
    /// The text changed and needs checking.
    Edited,
    /// Left to the page underneath.
    PassThrough,
}

/// Maps a typed character onto the formula alphabet. `=` stands in for `+`
/// so the sign can be typed without shift.
pub fn accept_char(c: char) -> Option<char> {
    let c = c.to_ascii_lowercase();
    match c {
        '=' => Some('+'),
        'r' | 'd' | 'u' | '(' | ' ' | ')' | '0'..='9' | '+' | '*' | '/' | '-' => Some(c),
        _ => None,
    }
}

/// Text and caret of the formula input. The text only ever holds ASCII.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaInput {
    text: String,
    cursor: usize,
}

impl FormulaInput {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn handle_key(&mut self, key: &Key) -> KeyOutcome {
        match key {
            Key::Enter { shift } => KeyOutcome::Submit { close: *shift },
            Key::Escape => KeyOutcome::Blur,
            Key::Char(c) => match accept_char(*c) {
                Some(c) => {
                    self.text.insert(self.cursor, c);
                    self.cursor += 1;
                    KeyOutcome::Edited
                }
                None => KeyOutcome::PassThrough,
            },
            Key::Backspace => {
                if self.cursor == 0 {
                    return KeyOutcome::PassThrough;
                }
                self.cursor -= 1;
                self.text.remove(self.cursor);
                KeyOutcome::Edited
            }
            Key::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                KeyOutcome::PassThrough
            }
            Key::Right => {
                self.cursor = (self.cursor + 1).min(self.text.len());
                KeyOutcome::PassThrough
            }
            Key::Other(_) => KeyOutcome::PassThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(keys: &str) -> FormulaInput {
        let mut input = FormulaInput::default();
        for c in keys.chars() {
            input.handle_key(&Key::Char(c));
        }
        input
    }

    #[test]
    fn empty_and_lone_signs_are_neutral() {
        assert_eq!(classify(""), FormulaCheck::Neutral);
        assert_eq!(classify("-"), FormulaCheck::Neutral);
        assert_eq!(classify("+"), FormulaCheck::Neutral);
        assert_eq!(classify("  "), FormulaCheck::Neutral);
    }

    #[test]
    fn trailing_operators_wait() {
        assert_eq!(classify("2*"), FormulaCheck::AwaitMore);
        assert_eq!(classify("2 -"), FormulaCheck::AwaitMore);
    }

    #[test]
    fn plain_numbers_skip_the_page() {
        assert_eq!(classify("42"), FormulaCheck::Immediate(42.0));
        assert_eq!(classify("-9"), FormulaCheck::Immediate(-9.0));
        assert_eq!(classify("2*21"), FormulaCheck::Remote);
        assert_eq!(classify("r(5/3)"), FormulaCheck::Remote);
    }

    #[test]
    fn statuses_read_like_the_form() {
        let status = FormStatus::for_value(42.0);
        assert_eq!(status.submit_label(), "Gain 42");
        assert!(status.submit_enabled());
        assert_eq!(status.hint(), "");

        let status = FormStatus::for_value(5.0 / 3.0);
        assert_eq!(status.hint(), NON_INTEGER_HINT);
        assert!(!status.submit_enabled());

        assert_eq!(FormStatus::for_value(-7.0).submit_label(), "Lose 7");
        assert_eq!(FormStatus::for_value(f64::INFINITY).hint(), INFINITE_HINT);
        assert_eq!(FormStatus::for_value(f64::NAN).hint(), BAD_FORMULA_HINT);
        assert_eq!(FormStatus::Neutral.submit_label(), "Gain / Lose");
    }

    #[test]
    fn keys_are_filtered_and_mapped() {
        let input = typed("2=3X*R(1)");
        assert_eq!(input.text(), "2+3*r(1)");

        let mut input = typed("12");
        input.handle_key(&Key::Left);
        input.handle_key(&Key::Char('0'));
        assert_eq!(input.text(), "102");
        assert_eq!(input.handle_key(&Key::Backspace), KeyOutcome::Edited);
        assert_eq!(input.text(), "12");
        assert_eq!(input.handle_key(&Key::Enter { shift: true }), KeyOutcome::Submit { close: true });
        assert_eq!(input.handle_key(&Key::Escape), KeyOutcome::Blur);
        assert_eq!(input.handle_key(&Key::Other("Tab".into())), KeyOutcome::PassThrough);
    }
}
