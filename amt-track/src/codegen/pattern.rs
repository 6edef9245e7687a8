//! Code pattern builder
//!
//! Pure formatting of a tag/code string from already-resolved part codes
//! and a sequence number. No I/O, fully deterministic.

use amt_common::{Error, Result};

/// Concatenate part codes and append the sequence zero-padded to
/// `digit_width`. A sequence wider than the width renders at its natural
/// width; it is never truncated.
pub fn build_code(parts: &[&str], sequence: i64, digit_width: i64) -> Result<String> {
    if sequence < 1 {
        return Err(Error::Validation(format!(
            "Sequence must be positive, got {}",
            sequence
        )));
    }
    if digit_width < 1 {
        return Err(Error::Validation(format!(
            "Digit width must be positive, got {}",
            digit_width
        )));
    }

    let mut code = String::with_capacity(parts.iter().map(|p| p.len()).sum::<usize>() + 8);
    for part in parts {
        code.push_str(part);
    }
    code.push_str(&format!("{:0width$}", sequence, width = digit_width as usize));

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_parts_and_pads_sequence() {
        let code = build_code(&["CAT", "VND", "BNK"], 1, 5).unwrap();
        assert_eq!(code, "CATVNDBNK00001");
    }

    #[test]
    fn test_padding_boundary_at_full_width() {
        assert_eq!(build_code(&["AB"], 99999, 5).unwrap(), "AB99999");
    }

    #[test]
    fn test_sequence_wider_than_width_is_not_truncated() {
        assert_eq!(build_code(&["AB"], 100000, 5).unwrap(), "AB100000");
    }

    #[test]
    fn test_width_one_has_no_padding_beyond_value() {
        assert_eq!(build_code(&["X"], 7, 1).unwrap(), "X7");
        assert_eq!(build_code(&["X"], 42, 1).unwrap(), "X42");
    }

    #[test]
    fn test_no_parts_yields_bare_sequence() {
        assert_eq!(build_code(&[], 3, 4).unwrap(), "0003");
    }

    #[test]
    fn test_rejects_non_positive_sequence() {
        assert!(build_code(&["A"], 0, 5).is_err());
        assert!(build_code(&["A"], -7, 5).is_err());
    }

    #[test]
    fn test_rejects_non_positive_width() {
        assert!(build_code(&["A"], 1, 0).is_err());
        assert!(build_code(&["A"], 1, -5).is_err());
    }

    #[test]
    fn test_deterministic_for_equal_inputs() {
        let a = build_code(&["PRJ", "TX"], 12, 5).unwrap();
        let b = build_code(&["PRJ", "TX"], 12, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "PRJTX00012");
    }
}
