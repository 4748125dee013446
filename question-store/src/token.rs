//! Random answer tokens

use rand::Rng;

/// Length of the token handed out with every new question
pub const QUESTION_TOKEN_LENGTH: usize = 6;

/// Generate a random alphanumeric token of `length` characters.
///
/// Tokens are drawn independently on every call; uniqueness is not enforced.
#[must_use]
pub fn generate(length: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
