//! Comparison operators.

use std::fmt;
use std::str::FromStr;

use crate::field::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    IsIn,
    IsNotIn,
    MatchRegex,
    NotMatchRegex,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    After,
    Before,
    NewerThan,
    OlderThan,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::Contains,
        Operator::NotContains,
        Operator::IsIn,
        Operator::IsNotIn,
        Operator::MatchRegex,
        Operator::NotMatchRegex,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThanOrEqual,
        Operator::After,
        Operator::Before,
        Operator::NewerThan,
        Operator::OlderThan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "Equal",
            Operator::NotEqual => "NotEqual",
            Operator::Contains => "Contains",
            Operator::NotContains => "NotContains",
            Operator::IsIn => "IsIn",
            Operator::IsNotIn => "IsNotIn",
            Operator::MatchRegex => "MatchRegex",
            Operator::NotMatchRegex => "NotMatchRegex",
            Operator::GreaterThan => "GreaterThan",
            Operator::LessThan => "LessThan",
            Operator::GreaterThanOrEqual => "GreaterThanOrEqual",
            Operator::LessThanOrEqual => "LessThanOrEqual",
            Operator::After => "After",
            Operator::Before => "Before",
            Operator::NewerThan => "NewerThan",
            Operator::OlderThan => "OlderThan",
        }
    }

    /// The positive form of a negated operator, if this is one
    pub fn negated_form_of(&self) -> Option<Operator> {
        match self {
            Operator::NotEqual => Some(Operator::Equal),
            Operator::NotContains => Some(Operator::Contains),
            Operator::IsNotIn => Some(Operator::IsIn),
            Operator::NotMatchRegex => Some(Operator::MatchRegex),
            _ => None,
        }
    }

    /// Whether this operator makes sense for values of `kind`
    pub fn applies_to(&self, kind: ValueKind) -> bool {
        use Operator::*;
        match kind {
            ValueKind::Text | ValueKind::TextList => matches!(
                self,
                Equal | NotEqual | Contains | NotContains | IsIn | IsNotIn | MatchRegex | NotMatchRegex
            ),
            ValueKind::Number => matches!(
                self,
                Equal | NotEqual | GreaterThan | LessThan | GreaterThanOrEqual | LessThanOrEqual
            ),
            ValueKind::Date => matches!(self, Equal | After | Before | NewerThan | OlderThan),
            ValueKind::Boolean => matches!(self, Equal | NotEqual),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let wanted = match wanted {
            "Equals" | "=" | "==" => "Equal",
            "NotEquals" | "!=" => "NotEqual",
            ">" => "GreaterThan",
            "<" => "LessThan",
            ">=" => "GreaterThanOrEqual",
            "<=" => "LessThanOrEqual",
            "Matches" | "Regex" => "MatchRegex",
            other => other,
        };
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(">=".parse::<Operator>(), Ok(Operator::GreaterThanOrEqual));
        assert_eq!("equals".parse::<Operator>(), Ok(Operator::Equal));
        assert_eq!("matchregex".parse::<Operator>(), Ok(Operator::MatchRegex));
        assert!("Between".parse::<Operator>().is_err());
    }

    #[test]
    fn test_operator_applicability() {
        assert!(Operator::Contains.applies_to(ValueKind::TextList));
        assert!(!Operator::Contains.applies_to(ValueKind::Number));
        assert!(Operator::NewerThan.applies_to(ValueKind::Date));
        assert!(!Operator::GreaterThan.applies_to(ValueKind::Boolean));
    }
}
