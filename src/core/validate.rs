// Submission validation. Rules apply in order: presence first, then length.
// Trimming and the length bound both operate on Unicode scalar values, not bytes.
use crate::core::error::{Error, ErrorKind};

/// Upper bound on the trimmed message length, in Unicode scalar values.
pub const MAX_MESSAGE_CHARS: usize = 250;

/// Rejection for missing, null, empty, or whitespace-only input.
pub const MESSAGE_REQUIRED: &str = "Message is required";

/// Rejection for input longer than `MAX_MESSAGE_CHARS` after trimming.
pub const MESSAGE_TOO_LONG: &str = "Message is required and must be between 1-250 characters";

/// Validate a submitted message, returning the trimmed slice to store.
pub fn validate_message(message: Option<&str>) -> Result<&str, Error> {
    let trimmed = message.unwrap_or_default().trim();
    if trimmed.is_empty() {
        return Err(Error::new(ErrorKind::Validation).with_message(MESSAGE_REQUIRED));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(Error::new(ErrorKind::Validation).with_message(MESSAGE_TOO_LONG));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{validate_message, MAX_MESSAGE_CHARS, MESSAGE_REQUIRED, MESSAGE_TOO_LONG};
    use crate::core::error::ErrorKind;

    fn rejection(message: Option<&str>) -> String {
        let err = validate_message(message).expect_err("should reject");
        assert_eq!(err.kind(), ErrorKind::Validation);
        err.message().expect("message").to_string()
    }

    #[test]
    fn missing_message_is_required() {
        assert_eq!(rejection(None), MESSAGE_REQUIRED);
    }

    #[test]
    fn empty_message_is_required() {
        assert_eq!(rejection(Some("")), MESSAGE_REQUIRED);
    }

    #[test]
    fn whitespace_only_message_is_required() {
        for input in ["   ", "\t\t", "\n\n", " \t\n "] {
            assert_eq!(rejection(Some(input)), MESSAGE_REQUIRED);
        }
    }

    #[test]
    fn single_character_is_accepted() {
        assert_eq!(validate_message(Some("a")).expect("accept"), "a");
    }

    #[test]
    fn length_boundary_is_exact() {
        let at_limit = "a".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(validate_message(Some(&at_limit)).expect("accept"), at_limit);

        let over_limit = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(rejection(Some(&over_limit)), MESSAGE_TOO_LONG);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let emoji_at_limit = "\u{1F44D}".repeat(MAX_MESSAGE_CHARS);
        assert!(emoji_at_limit.len() > MAX_MESSAGE_CHARS);
        assert_eq!(
            validate_message(Some(&emoji_at_limit)).expect("accept"),
            emoji_at_limit
        );

        let emoji_over_limit = "\u{1F44D}".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(rejection(Some(&emoji_over_limit)), MESSAGE_TOO_LONG);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_both_rules() {
        assert_eq!(validate_message(Some("  hello  ")).expect("accept"), "hello");

        let padded = format!("  {}  ", "a".repeat(MAX_MESSAGE_CHARS));
        assert_eq!(
            validate_message(Some(&padded)).expect("accept"),
            "a".repeat(MAX_MESSAGE_CHARS)
        );
    }
}
