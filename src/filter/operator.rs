//! Relational operators of the filter language

use std::fmt;

use serde::Serialize;

use crate::query::{QueryError, QueryResult};

/// Comparison operator of a `Filter:` or `Stats:` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelationalOperator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `~` regex match
    Matches,
    /// `!~`
    DoesntMatch,
    /// `=~` case-insensitive equality
    EqualIcase,
    /// `!=~`
    DoesntEqualIcase,
    /// `~~` case-insensitive regex match
    MatchesIcase,
    /// `!~~`
    DoesntMatchIcase,
    /// `<`
    Less,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
}

impl RelationalOperator {
    pub const ALL: [RelationalOperator; 12] = [
        RelationalOperator::Equal,
        RelationalOperator::NotEqual,
        RelationalOperator::Matches,
        RelationalOperator::DoesntMatch,
        RelationalOperator::EqualIcase,
        RelationalOperator::DoesntEqualIcase,
        RelationalOperator::MatchesIcase,
        RelationalOperator::DoesntMatchIcase,
        RelationalOperator::Less,
        RelationalOperator::GreaterOrEqual,
        RelationalOperator::Greater,
        RelationalOperator::LessOrEqual,
    ];

    pub fn parse(token: &str) -> QueryResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == token)
            .ok_or_else(|| QueryError::UnknownOperator(token.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Matches => "~",
            Self::DoesntMatch => "!~",
            Self::EqualIcase => "=~",
            Self::DoesntEqualIcase => "!=~",
            Self::MatchesIcase => "~~",
            Self::DoesntMatchIcase => "!~~",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
        }
    }

    /// The operator accepting exactly the values this one rejects
    pub fn negate(&self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::Matches => Self::DoesntMatch,
            Self::DoesntMatch => Self::Matches,
            Self::EqualIcase => Self::DoesntEqualIcase,
            Self::DoesntEqualIcase => Self::EqualIcase,
            Self::MatchesIcase => Self::DoesntMatchIcase,
            Self::DoesntMatchIcase => Self::MatchesIcase,
            Self::Less => Self::GreaterOrEqual,
            Self::GreaterOrEqual => Self::Less,
            Self::Greater => Self::LessOrEqual,
            Self::LessOrEqual => Self::Greater,
        }
    }

    /// True for the operators defined as the negation of another
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Self::NotEqual
                | Self::DoesntMatch
                | Self::DoesntEqualIcase
                | Self::DoesntMatchIcase
                | Self::GreaterOrEqual
                | Self::LessOrEqual
        )
    }

    /// Ordering operators (`< <= > >=`)
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::Less | Self::GreaterOrEqual | Self::Greater | Self::LessOrEqual
        )
    }

    pub fn is_regex(&self) -> bool {
        matches!(
            self,
            Self::Matches | Self::DoesntMatch | Self::MatchesIcase | Self::DoesntMatchIcase
        )
    }

    pub fn is_case_insensitive(&self) -> bool {
        matches!(
            self,
            Self::EqualIcase | Self::DoesntEqualIcase | Self::MatchesIcase | Self::DoesntMatchIcase
        )
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_operator() {
        for op in RelationalOperator::ALL {
            assert_eq!(RelationalOperator::parse(op.as_str()).unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operator() {
        let err = RelationalOperator::parse("<>").unwrap_err();
        assert_eq!(err, QueryError::UnknownOperator("<>".into()));
    }

    #[test]
    fn test_negate_is_involution() {
        for op in RelationalOperator::ALL {
            assert_eq!(op.negate().negate(), op);
            assert_ne!(op.negate().is_negative(), op.is_negative());
        }
    }
}
