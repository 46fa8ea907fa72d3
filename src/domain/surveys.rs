//! Survey content rules.

use crate::domain::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 2_000;

pub fn normalize_title(raw: &str) -> Result<String, DomainError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title", "title is required"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("title must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(title.to_string())
}

/// Blank descriptions are stored as absent.
pub fn normalize_description(raw: Option<&str>) -> Result<Option<String>, DomainError> {
    let Some(description) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(DomainError::validation(
            "description",
            format!("description must be at most {DESCRIPTION_MAX_CHARS} characters"),
        ));
    }
    Ok(Some(description.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(normalize_title("  Team pulse ").unwrap(), "Team pulse");
        assert!(normalize_title("   ").is_err());
        assert!(normalize_title(&"x".repeat(TITLE_MAX_CHARS)).is_ok());
        assert!(normalize_title(&"x".repeat(TITLE_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn blank_description_becomes_none() {
        assert_eq!(normalize_description(Some("  ")).unwrap(), None);
        assert_eq!(normalize_description(None).unwrap(), None);
        assert_eq!(
            normalize_description(Some(" Quarterly ")).unwrap().as_deref(),
            Some("Quarterly")
        );
    }
}
