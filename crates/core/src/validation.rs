//! Validation utilities for campaign and profile inputs
//!
//! Derive-based checks live on the model types via `validator`; this
//! module holds the conversion into [`AdssimsimError`] and the handful of
//! rules the derive macro cannot express.

use crate::error::AdssimsimError;
use url::Url;
use validator::{Validate, ValidateEmail};

/// Run derive-based validation and convert failures
///
/// The first failing field is reported; callers fix one error at a time
/// anyway.
pub fn validate_input<T: Validate>(value: &T) -> Result<(), AdssimsimError> {
    value.validate().map_err(|errors| {
        let detail = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), message)
            });

        match detail {
            Some((field, message)) => AdssimsimError::validation_field(message, field),
            None => AdssimsimError::validation("invalid input"),
        }
    })
}

/// Validate a URL is well formed and uses http or https
///
/// # Examples
///
/// ```
/// use adssimsim_core::validation::validate_http_url;
///
/// assert!(validate_http_url("https://example.com/ad.mp4", "creative_url").is_ok());
/// assert!(validate_http_url("ftp://example.com", "creative_url").is_err());
/// assert!(validate_http_url("not-a-url", "creative_url").is_err());
/// ```
pub fn validate_http_url(url: &str, field: &str) -> Result<(), AdssimsimError> {
    let parsed = Url::parse(url)
        .map_err(|_| AdssimsimError::validation_field("Invalid URL format", field))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(AdssimsimError::validation_field(
            "URL must use http or https",
            field,
        )),
    }
}

/// Validate an email address
///
/// # Examples
///
/// ```
/// use adssimsim_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), AdssimsimError> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(AdssimsimError::validation_field(
            "Invalid email address format",
            "email",
        ))
    }
}

/// Validate a monetary amount is positive
pub fn validate_positive_amount(value: i64, field: &str) -> Result<(), AdssimsimError> {
    if value > 0 {
        Ok(())
    } else {
        Err(AdssimsimError::validation_field(
            format!("Field '{}' must be positive, got {}", field, value),
            field,
        ))
    }
}

/// Validate a per-view reward against the campaign budget
///
/// A single view may never pay out more than the whole budget.
pub fn validate_reward_within_budget(reward: i64, budget: i64) -> Result<(), AdssimsimError> {
    validate_positive_amount(reward, "reward")?;
    validate_positive_amount(budget, "budget")?;

    if reward > budget {
        return Err(AdssimsimError::validation_field(
            format!("Reward ({}) cannot exceed budget ({})", reward, budget),
            "reward",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignDraft, CampaignGoal, CampaignKind, CompanyInfo};
    use uuid::Uuid;

    fn draft() -> CampaignDraft {
        CampaignDraft {
            advertiser_id: Uuid::new_v4(),
            name: "Launch".to_string(),
            budget: 100,
            reward: 5,
            kind: CampaignKind::Video,
            goal: CampaignGoal::Sales,
            category: "Tech".to_string(),
            cta_text: "Shop now".to_string(),
            landing_page_url: "https://example.com".to_string(),
            creative_url: "https://example.com/ad.mp4".to_string(),
            thumbnail_url: None,
            duration: 30,
            company: CompanyInfo::named("Example"),
            client_ref: None,
        }
    }

    #[test]
    fn test_validate_input_accepts_valid_draft() {
        assert!(validate_input(&draft()).is_ok());
    }

    #[test]
    fn test_validate_input_reports_failing_field() {
        let mut bad = draft();
        bad.name = String::new();

        let err = validate_input(&bad).unwrap_err();
        match err {
            AdssimsimError::ValidationError { field, .. } => {
                assert_eq!(field.as_deref(), Some("name"));
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_http_url_validation() {
        assert!(validate_http_url("https://example.com", "url").is_ok());
        assert!(validate_http_url("http://example.com/path?q=1", "url").is_ok());

        assert!(validate_http_url("ftp://example.com", "url").is_err());
        assert!(validate_http_url("not-a-url", "url").is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("test.user+tag@domain.co.uk").is_ok());

        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(1, "budget").is_ok());
        assert!(validate_positive_amount(0, "budget").is_err());
        assert!(validate_positive_amount(-5, "budget").is_err());
    }

    #[test]
    fn test_reward_within_budget() {
        assert!(validate_reward_within_budget(5, 100).is_ok());
        assert!(validate_reward_within_budget(100, 100).is_ok());

        assert!(validate_reward_within_budget(101, 100).is_err());
        assert!(validate_reward_within_budget(0, 100).is_err());
    }
}
