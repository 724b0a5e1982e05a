use crate::error::AppError;

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Validate a trimmed title (1-256 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a display name (1-100 characters after trimming).
pub fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::Validation("Name must be 1-100 characters".into()));
    }
    Ok(())
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = email.len() <= 254
        && !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
    if !valid {
        return Err(AppError::Validation("Email address is invalid".into()));
    }
    Ok(())
}
