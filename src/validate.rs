//! Round-trip acceptance gate for trained and loaded tokenizers.

use log::{error, info};

use crate::error::{Result, SbpeError};
use crate::model::Tokenizer;

/// Samples every tokenizer produced or loaded by the service must round trip.
pub const DEFAULT_VALIDATION_SAMPLES: &[&str] = &[
    "Hello there! Can you assist me with my code?",
    "Absolutely! Could you please share your code with me?",
    "Sure, here it is: \n\"\"\"python\ndef hello():\n print(\"Hello, World!\")\nhello()\n\"\"\"",
    "I see. Is there a specific part of the code you're having trouble with?",
    "I am actually not sure what this code does.",
    "This code defines a function called `hello` that prints \"Hello, World!\" when called. The last line `hello()` calls the function.",
    "Makes sense, thank you!",
    "You're welcome! Let me know if you have any other questions.",
    "Sure, I've another question. What is the difference between a list and a tuple in Python?",
    "A list is mutable, meaning you can change its content. Lists are defined by having values between square brackets [], On the other hand, a tuple is immutable and cannot be changed. Tuples are written with round brackets (). ",
    "Understood, thank you for explaining!",
    "No problem at all! Don't hesitate to ask if you have more questions in the future. ",
    "Sure thing! I'll reach out if I need more help.",
    "Perfect! Have a great day!",
    "Decoding error: Unsupported character in string.",
];

/// Returns the samples whose `decode_text(encode(s))` differs from `s`, in input order.
///
/// A sample whose encoding fails counts as failing.
pub fn validate<S: AsRef<str>>(tokenizer: &Tokenizer, samples: &[S]) -> Vec<String> {
    let mut failures = Vec::new();
    for sample in samples {
        let sample = sample.as_ref();
        match tokenizer.encode(sample) {
            Ok(ids) => {
                let decoded = tokenizer.decode_text(&ids);
                if decoded != sample {
                    error!("round trip failed on input {sample:?}; output was {decoded:?}");
                    failures.push(sample.to_owned());
                }
            }
            Err(err) => {
                error!("encoding failed on input {sample:?}: {err}");
                failures.push(sample.to_owned());
            }
        }
    }
    info!(
        "validation completed: {} sample(s), {} failing",
        samples.len(),
        failures.len()
    );
    failures
}

/// Fails with [`SbpeError::ValidationFailure`] unless every sample round trips.
pub fn ensure_valid<S: AsRef<str>>(tokenizer: &Tokenizer, samples: &[S]) -> Result<()> {
    let failures = validate(tokenizer, samples);
    if failures.is_empty() {
        Ok(())
    } else {
        Err(SbpeError::ValidationFailure { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::DEFAULT_PATTERN;
    use crate::trainer::train;

    #[test]
    fn hello_world_passes() {
        let tokenizer = train("Hello, world! Hello again, world.", 300, DEFAULT_PATTERN).unwrap();
        assert!(validate(&tokenizer, &["Hello, world!"]).is_empty());
    }

    #[test]
    fn default_samples_pass_on_a_trained_tokenizer() {
        let corpus = DEFAULT_VALIDATION_SAMPLES.join("\n");
        let tokenizer = train(&corpus, 512, DEFAULT_PATTERN).unwrap();
        assert!(validate(&tokenizer, DEFAULT_VALIDATION_SAMPLES).is_empty());
        assert!(ensure_valid(&tokenizer, DEFAULT_VALIDATION_SAMPLES).is_ok());
    }

    #[test]
    fn text_outside_the_pattern_fails_the_gate() {
        // "." never matches a newline, so it is dropped during segmentation.
        let tokenizer = train("ab\ncd", 260, ".").unwrap();
        let failures = validate(&tokenizer, &["ok", "line\nbreak", "fine"]);
        assert_eq!(failures, vec!["line\nbreak".to_string()]);

        let err = ensure_valid(&tokenizer, &["line\nbreak"]).expect_err("gate must reject");
        assert!(matches!(
            err,
            SbpeError::ValidationFailure { failures } if failures.len() == 1
        ));
    }
}
