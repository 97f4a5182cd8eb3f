use crate::Generator;
use tinylink_core::shortcode::{ALPHABET, MAX_LENGTH};
use tinylink_core::{CoreError, ShortCode};

pub const DEFAULT_LENGTH: usize = 6;

/// Draws each character of the code uniformly and independently from the
/// 62-character alphanumeric alphabet.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// Creates a generator producing codes of `length` characters.
    ///
    /// `length` must fit the storage column, i.e. be in `1..=10`.
    pub fn new(length: usize) -> Result<Self, CoreError> {
        if length == 0 || length > MAX_LENGTH {
            return Err(CoreError::InvalidShortCode(format!(
                "generated code length must be between 1 and {}, got {}",
                MAX_LENGTH, length
            )));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let code: String = std::iter::repeat_with(|| {
            ALPHABET[rand::random_range(0..ALPHABET.len())] as char
        })
        .take(self.length)
        .collect();
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_length_is_six() {
        let generator = RandomGenerator::default();
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), 6);
        }
    }

    #[test]
    fn codes_are_valid_short_codes() {
        let generator = RandomGenerator::new(10).unwrap();
        for _ in 0..100 {
            let code = generator.generate();
            assert!(ShortCode::new(code.as_str()).is_ok());
            assert!(code.as_str().bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        assert!(RandomGenerator::new(0).is_err());
        assert!(RandomGenerator::new(11).is_err());
        assert_eq!(RandomGenerator::new(1).unwrap().length(), 1);
    }

    #[test]
    fn covers_the_whole_alphabet() {
        let generator = RandomGenerator::new(10).unwrap();
        let mut seen = HashSet::new();
        // 10k draws from 62 symbols; missing one has negligible probability.
        for _ in 0..1_000 {
            seen.extend(generator.generate().as_str().bytes());
        }
        assert_eq!(seen.len(), ALPHABET.len());
    }

    #[test]
    fn successive_codes_differ() {
        let generator = RandomGenerator::default();
        let codes: HashSet<_> = (0..50).map(|_| generator.generate()).collect();
        assert!(codes.len() > 45);
    }
}
