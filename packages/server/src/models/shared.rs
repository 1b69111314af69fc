use serde::Serialize;

use crate::error::AppError;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Clamp a requested page size to the 0-50 range the listing endpoints allow.
pub fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(10).min(50)
}

/// Validate a trimmed username (3-50 Unicode characters).
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let username = username.trim();
    if username.chars().count() < 3 || username.chars().count() > 50 {
        return Err(AppError::Validation(
            "Username must be 3-50 characters".into(),
        ));
    }
    Ok(())
}

/// Minimal email shape check; deliverability is the mailer's problem.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let well_formed = email.len() <= 150
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 6 || password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 6-128 characters".into(),
        ));
    }
    Ok(())
}

/// Validate an optional photo description (at most 250 characters).
pub fn validate_description(description: Option<&str>) -> Result<(), AppError> {
    if let Some(description) = description
        && description.chars().count() > 250
    {
        return Err(AppError::Validation(
            "Description must be at most 250 characters".into(),
        ));
    }
    Ok(())
}

/// Validate comment text (1-250 characters after trimming).
pub fn validate_comment_text(text: &str) -> Result<(), AppError> {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > 250 {
        return Err(AppError::Validation(
            "Comment text must be 1-250 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a tag name (1-50 characters after trimming).
pub fn validate_tag_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 50 {
        return Err(AppError::Validation(
            "Tag name must be 1-50 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_done\\"), "50\\%\\_done\\\\");
        assert_eq!(escape_like("sunset"), "sunset");
    }

    #[test]
    fn clamp_limit_caps_at_fifty() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 0);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(500)), 50);
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn description_cap_is_250_characters() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some(&"x".repeat(250))).is_ok());
        assert!(validate_description(Some(&"x".repeat(251))).is_err());
    }

    #[test]
    fn comment_text_must_not_be_blank() {
        assert!(validate_comment_text("nice shot").is_ok());
        assert!(validate_comment_text("   ").is_err());
        assert!(validate_comment_text(&"x".repeat(251)).is_err());
    }
}
