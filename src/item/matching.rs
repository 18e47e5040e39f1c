//! Match rules used by filters and entry predicates
//!
//! Case sensitivity is carried as a separate flag alongside the rule.

use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

/// Comparison operator applied to a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchRule {
    Invalid,
    Equals,
    NotEqual,
    Active,
    Inactive,
    Present,
    NotPresent,
    Set,
    NotSet,
    Is,
    IsNot,
    Begins,
    NotBegin,
    Ends,
    NotEnd,
    Contains,
    NotContain,
    ContainsAny,
    NotContainsAny,
    ContainsAll,
    NotContainsAll,
    Between,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Before,
    After,
    Expired,
    WillExpire,
}

impl MatchRule {
    const CODES: &'static [(MatchRule, &'static str)] = &[
        (MatchRule::Invalid, "  "),
        (MatchRule::Equals, "EQ"),
        (MatchRule::NotEqual, "NE"),
        (MatchRule::Active, "AC"),
        (MatchRule::Inactive, "IA"),
        (MatchRule::Present, "PR"),
        (MatchRule::NotPresent, "NP"),
        (MatchRule::Set, "SE"),
        (MatchRule::NotSet, "NS"),
        (MatchRule::Is, "IS"),
        (MatchRule::IsNot, "NI"),
        (MatchRule::Begins, "BE"),
        (MatchRule::NotBegin, "NB"),
        (MatchRule::Ends, "EN"),
        (MatchRule::NotEnd, "ND"),
        (MatchRule::Contains, "CO"),
        (MatchRule::NotContain, "NC"),
        (MatchRule::ContainsAny, "CY"),
        (MatchRule::NotContainsAny, "NY"),
        (MatchRule::ContainsAll, "CA"),
        (MatchRule::NotContainsAll, "NA"),
        (MatchRule::Between, "BT"),
        (MatchRule::LessThan, "LT"),
        (MatchRule::LessEqual, "LE"),
        (MatchRule::GreaterThan, "GT"),
        (MatchRule::GreaterEqual, "GE"),
        (MatchRule::Before, "BF"),
        (MatchRule::After, "AF"),
        (MatchRule::Expired, "EX"),
        (MatchRule::WillExpire, "WX"),
    ];

    /// Two-letter code used in filter XML
    pub fn code(self) -> &'static str {
        Self::CODES
            .iter()
            .find(|(rule, _)| *rule == self)
            .map(|(_, code)| *code)
            .unwrap_or("  ")
    }

    /// Look up a rule by its two-letter code
    pub fn from_code(code: &str) -> MatchRule {
        Self::CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(rule, _)| *rule)
            .unwrap_or(MatchRule::Invalid)
    }

    /// True for rules whose outcome is the negation of another rule
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            MatchRule::NotEqual
                | MatchRule::NotPresent
                | MatchRule::NotSet
                | MatchRule::IsNot
                | MatchRule::NotBegin
                | MatchRule::NotEnd
                | MatchRule::NotContain
                | MatchRule::NotContainsAny
                | MatchRule::NotContainsAll
                | MatchRule::Inactive
        )
    }
}

fn fold(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

/// Match a text value
pub fn match_string(pattern: &str, case_sensitive: bool, value: &str, rule: MatchRule) -> bool {
    let p = fold(pattern, case_sensitive);
    let v = fold(value, case_sensitive);
    let words = || p.split_whitespace().filter(|w| !w.is_empty());

    match rule {
        MatchRule::Equals => v == p,
        MatchRule::NotEqual => v != p,
        MatchRule::Present => !v.is_empty(),
        MatchRule::NotPresent => v.is_empty(),
        MatchRule::Begins => v.starts_with(&p),
        MatchRule::NotBegin => !v.starts_with(&p),
        MatchRule::Ends => v.ends_with(&p),
        MatchRule::NotEnd => !v.ends_with(&p),
        MatchRule::Contains => v.contains(&p),
        MatchRule::NotContain => !v.contains(&p),
        MatchRule::ContainsAny => words().any(|w| v.contains(w)),
        MatchRule::NotContainsAny => !words().any(|w| v.contains(w)),
        MatchRule::ContainsAll => words().all(|w| v.contains(w)),
        MatchRule::NotContainsAll => !words().all(|w| v.contains(w)),
        _ => false,
    }
}

/// Match an integer value; `Between` is inclusive
pub fn match_integer(num1: i64, num2: i64, value: i64, rule: MatchRule) -> bool {
    match rule {
        MatchRule::Equals => value == num1,
        MatchRule::NotEqual => value != num1,
        MatchRule::Between => value >= num1 && value <= num2,
        MatchRule::LessThan => value < num1,
        MatchRule::LessEqual => value <= num1,
        MatchRule::GreaterThan => value > num1,
        MatchRule::GreaterEqual => value >= num1,
        MatchRule::Present => value != 0,
        MatchRule::NotPresent => value == 0,
        _ => false,
    }
}

/// Match a timestamp at day granularity; an unset time (0) only matches presence rules
pub fn match_date(t1: i64, t2: i64, value: i64, rule: MatchRule) -> bool {
    match rule {
        MatchRule::Present => return value != 0,
        MatchRule::NotPresent => return value == 0,
        _ => {}
    }
    if value == 0 {
        return false;
    }
    let day = value.div_euclid(SECONDS_PER_DAY);
    let d1 = t1.div_euclid(SECONDS_PER_DAY);
    let d2 = t2.div_euclid(SECONDS_PER_DAY);
    match rule {
        MatchRule::Equals => day == d1,
        MatchRule::NotEqual => day != d1,
        MatchRule::Before => day < d1,
        MatchRule::After => day > d1,
        MatchRule::Between => day >= d1 && day <= d2,
        _ => false,
    }
}

/// Match a yes/no property such as field presence or protection
pub fn match_bool(value: bool, rule: MatchRule) -> bool {
    match rule {
        MatchRule::Present | MatchRule::Set | MatchRule::Active | MatchRule::Is => value,
        MatchRule::NotPresent | MatchRule::NotSet | MatchRule::Inactive | MatchRule::IsNot => !value,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for (rule, code) in MatchRule::CODES {
            assert_eq!(rule.code(), *code);
            assert_eq!(MatchRule::from_code(code), *rule);
        }
        assert_eq!(MatchRule::from_code("??"), MatchRule::Invalid);
    }

    #[test]
    fn test_match_string_case() {
        assert!(match_string("bank", false, "My Bank", MatchRule::Contains));
        assert!(!match_string("bank", true, "My Bank", MatchRule::Contains));
        assert!(match_string("my", false, "My Bank", MatchRule::Begins));
        assert!(match_string("BANK", true, "MY BANK", MatchRule::Ends));
        assert!(match_string("x", false, "My Bank", MatchRule::NotContain));
        assert!(match_string("", false, "", MatchRule::NotPresent));
    }

    #[test]
    fn test_match_string_words() {
        assert!(match_string("foo bar", false, "a bar b", MatchRule::ContainsAny));
        assert!(!match_string("foo bar", false, "a bar b", MatchRule::ContainsAll));
        assert!(match_string("foo bar", false, "bar foo", MatchRule::ContainsAll));
    }

    #[test]
    fn test_match_integer() {
        assert!(match_integer(5, 10, 7, MatchRule::Between));
        assert!(match_integer(5, 10, 10, MatchRule::Between));
        assert!(!match_integer(5, 10, 11, MatchRule::Between));
        assert!(match_integer(5, 0, 4, MatchRule::LessThan));
        assert!(match_integer(5, 0, 5, MatchRule::GreaterEqual));
    }

    #[test]
    fn test_match_date() {
        let day = 86_400;
        assert!(match_date(10 * day, 0, 10 * day + 500, MatchRule::Equals));
        assert!(match_date(10 * day, 0, 9 * day, MatchRule::Before));
        assert!(match_date(10 * day, 12 * day, 11 * day, MatchRule::Between));
        assert!(!match_date(10 * day, 0, 0, MatchRule::Before));
        assert!(match_date(0, 0, 0, MatchRule::NotPresent));
    }

    #[test]
    fn test_match_bool() {
        assert!(match_bool(true, MatchRule::Set));
        assert!(match_bool(false, MatchRule::NotSet));
        assert!(!match_bool(true, MatchRule::Between));
    }
}
