//! Unit tests for join validation

#[cfg(test)]
mod tests {
    use super::super::join::*;
    use crate::domain::{Category, DomainError};
    use crate::error::AppError;

    fn req(category: &str, wait_time: &str) -> JoinRequest {
        JoinRequest {
            category: category.to_string(),
            wait_time: wait_time.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_known_category_and_wait_time() {
        let (category, wait) = validate_request(&req("consoles", "00:30")).unwrap();
        assert_eq!(category, Category::Consoles);
        assert_eq!(wait.minutes(), 30);
    }

    #[test]
    fn test_validate_unknown_category() {
        let err = validate_request(&req("Pinball", "00:30")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_validate_malformed_wait_time() {
        let err = validate_request(&req("PCs", "half an hour")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::MalformedWaitAllotment(_))
        ));
    }

    #[test]
    fn test_validate_zero_wait_time() {
        let err = validate_request(&req("PCs", "00:00")).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }
}
