pub const MIN_CHARS: usize = 5;
pub const MAX_CHARS: usize = 50;

/// Reasons a submission is rejected before any processing happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Vui lòng nhập nội dung")]
    EmptyInput,
    #[error("Câu quá ngắn (tối thiểu 5 ký tự)")]
    TooShort,
    #[error("Câu quá dài (tối đa 50 ký tự)")]
    TooLong,
}

/// Length gate applied to raw user input. Lengths count characters of the
/// trimmed text, not bytes.
pub fn validate(text: &str) -> Result<(), ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let chars = trimmed.chars().count();
    if chars < MIN_CHARS {
        return Err(ValidationError::TooShort);
    }
    if chars > MAX_CHARS {
        return Err(ValidationError::TooLong);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(validate(""), Err(ValidationError::EmptyInput));
        assert_eq!(validate("   "), Err(ValidationError::EmptyInput));
        assert_eq!(validate("\n\t"), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn length_boundaries() {
        assert_eq!(validate("abcd"), Err(ValidationError::TooShort));
        assert_eq!(validate("abcde"), Ok(()));
        assert_eq!(validate(&"a".repeat(50)), Ok(()));
        assert_eq!(validate(&"a".repeat(51)), Err(ValidationError::TooLong));
    }

    #[test]
    fn surrounding_whitespace_is_not_counted() {
        assert_eq!(validate("   abcd   "), Err(ValidationError::TooShort));
        assert_eq!(validate(&format!("  {}  ", "a".repeat(50))), Ok(()));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Five accented characters take more than five bytes.
        assert_eq!(validate("được"), Err(ValidationError::TooShort));
        assert_eq!(validate("tuyệt"), Ok(()));
        assert_eq!(validate(&"ệ".repeat(50)), Ok(()));
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(ValidationError::EmptyInput.to_string(), "Vui lòng nhập nội dung");
        assert_eq!(
            ValidationError::TooLong.to_string(),
            "Câu quá dài (tối đa 50 ký tự)"
        );
    }
}
