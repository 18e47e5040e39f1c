//! Password generation driven by a [`PasswordPolicy`]
//!
//! The policy's minimum counts for each character class are honoured first,
//! the remaining length is filled from the union of all enabled classes and
//! the result is shuffled.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::item::PasswordPolicy;

const LOWER_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const HEX_DIGITS: &str = "0123456789abcdef";

/// Default symbol set used when a policy does not name its own
pub const DEFAULT_SYMBOLS: &str = "+-=_@#$%^&;:,.<>/~\\[](){}?!|*";

/// Characters that are easy to confuse with each other
const CONFUSABLE: &str = "Il1O0|";

const VOWELS: &str = "aeiou";
const CONSONANTS: &str = "bcdfghjklmnpqrstvwxz";

fn pool(chars: &str, easy_vision: bool) -> Vec<char> {
    chars
        .chars()
        .filter(|c| !easy_vision || !CONFUSABLE.contains(*c))
        .collect()
}

fn pick(rng: &mut impl Rng, chars: &[char]) -> Option<char> {
    if chars.is_empty() {
        None
    } else {
        Some(chars[rng.random_range(0..chars.len())])
    }
}

/// Generate a random password satisfying the policy
///
/// # Example
/// ```
/// use pwstore::item::PasswordPolicy;
/// use pwstore::crypto::generate_password;
///
/// let policy = PasswordPolicy { length: 12, ..Default::default() };
/// let password = generate_password(&policy);
/// assert_eq!(password.chars().count(), 12);
/// ```
pub fn generate_password(policy: &PasswordPolicy) -> String {
    if policy.make_pronounceable() {
        return generate_pronounceable_password(policy.length);
    }

    let mut rng = rand::rng();

    if policy.use_hex_digits() {
        let hex: Vec<char> = HEX_DIGITS.chars().collect();
        return (0..policy.length)
            .filter_map(|_| pick(&mut rng, &hex))
            .collect();
    }

    let easy = policy.use_easy_vision();
    let symbols = if policy.symbols.is_empty() {
        DEFAULT_SYMBOLS
    } else {
        policy.symbols.as_str()
    };

    let mut classes: Vec<(Vec<char>, usize)> = Vec::new();
    if policy.use_lowercase() {
        classes.push((pool(LOWER_LETTERS, easy), policy.lower_min_length));
    }
    if policy.use_uppercase() {
        classes.push((pool(UPPER_LETTERS, easy), policy.upper_min_length));
    }
    if policy.use_digits() {
        classes.push((pool(DIGITS, easy), policy.digit_min_length));
    }
    if policy.use_symbols() {
        classes.push((pool(symbols, easy), policy.symbol_min_length));
    }

    // If nothing selected, use lowercase as fallback
    if classes.is_empty() {
        classes.push((pool(LOWER_LETTERS, easy), 0));
    }

    let mut password: Vec<char> = Vec::with_capacity(policy.length);

    for (chars, min) in &classes {
        for _ in 0..*min {
            if let Some(c) = pick(&mut rng, chars) {
                password.push(c);
            }
        }
    }

    let all: Vec<char> = classes.iter().flat_map(|(chars, _)| chars.iter().copied()).collect();
    while password.len() < policy.length {
        match pick(&mut rng, &all) {
            Some(c) => password.push(c),
            None => break,
        }
    }

    password.shuffle(&mut rng);
    password.into_iter().collect()
}

/// Generate a password alternating consonants and vowels
pub fn generate_pronounceable_password(length: usize) -> String {
    let mut rng = rand::rng();
    let vowels: Vec<char> = VOWELS.chars().collect();
    let consonants: Vec<char> = CONSONANTS.chars().collect();

    (0..length)
        .filter_map(|i| {
            if i % 2 == 0 {
                pick(&mut rng, &consonants)
            } else {
                pick(&mut rng, &vowels)
            }
        })
        .collect()
}
