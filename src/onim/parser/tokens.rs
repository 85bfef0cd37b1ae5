// src/onim/parser/tokens.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// One whitespace-separated word of a record, decoded to its narrowest type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Token {
    /// Decodes a word: a float without fractional part becomes an integer,
    /// any other float stays a float, everything else is kept as text.
    pub fn parse(word: &str) -> Token {
        let Ok(value) = word.parse::<f64>() else {
            return Token::Str(word.to_string());
        };
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Token::Int(value as i64)
        } else {
            Token::Float(value)
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Token::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an integer or float token.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Token::Int(i) => Some(*i as f64),
            Token::Float(f) => Some(*f),
            Token::Str(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    pub fn is_key(&self, key: &str) -> bool {
        self.as_str() == Some(key)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(i) => write!(f, "{}", i),
            Token::Float(v) => write!(f, "{}", v),
            Token::Str(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_words_become_ints() {
        assert_eq!(Token::parse("8"), Token::Int(8));
        assert_eq!(Token::parse("8.0"), Token::Int(8));
        assert_eq!(Token::parse("-3"), Token::Int(-3));
        assert_eq!(Token::parse("1e3"), Token::Int(1000));
    }

    #[test]
    fn fractional_words_stay_floats() {
        assert_eq!(Token::parse("8.5"), Token::Float(8.5));
        assert_eq!(Token::parse("-0.25"), Token::Float(-0.25));
        assert_eq!(Token::parse("1.5e-2"), Token::Float(0.015));
    }

    #[test]
    fn other_words_stay_strings() {
        assert_eq!(Token::parse("Static"), Token::Str("Static".into()));
        assert_eq!(Token::parse("crAnimation"), Token::Str("crAnimation".into()));
        assert_eq!(
            Token::parse("anims\\walk.onim"),
            Token::Str("anims\\walk.onim".into())
        );
    }

    #[test]
    fn non_finite_values_are_not_ints() {
        assert!(matches!(Token::parse("inf"), Token::Float(v) if v.is_infinite()));
        assert!(matches!(Token::parse("NaN"), Token::Float(v) if v.is_nan()));
    }
}
