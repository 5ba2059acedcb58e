//! Message validation rules.

use relay_core::error::AppError;

/// Validates a raw inbound frame before parsing.
pub fn validate_inbound(raw: &str, max_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_rejected() {
        let raw = "x".repeat(11);
        assert!(validate_inbound(&raw, 10).is_err());
        assert!(validate_inbound(&raw, 11).is_ok());
    }

    #[test]
    fn test_blank_rejected() {
        assert!(validate_inbound("  \n", 1024).is_err());
    }
}
