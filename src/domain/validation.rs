//! Input validation for form submissions, decoupled from persistence.
//!
//! Handlers validate raw form input here before touching a repository; an
//! invalid submission re-renders the form with the returned field errors and
//! performs no mutation.

use serde::Serialize;
use url::Url;
use uuid::Uuid;

pub const MAX_POST_TEXT_CHARS: usize = 10_000;
pub const MAX_COMMENT_TEXT_CHARS: usize = 2_000;

/// Raw post form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_url: Option<String>,
}

/// Raw comment form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct CommentInput {
    pub text: String,
}

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Post fields that passed validation, trimmed and normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPost {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_url: Option<String>,
}

/// Comment fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedComment {
    pub text: String,
}

pub fn validate_post(input: &PostInput) -> Result<ValidatedPost, Vec<FieldError>> {
    let mut errors = Vec::new();

    let text = input.text.trim();
    if text.is_empty() {
        errors.push(FieldError::new("text", "Post text must not be empty"));
    } else if text.chars().count() > MAX_POST_TEXT_CHARS {
        errors.push(FieldError::new(
            "text",
            format!("Post text must not exceed {MAX_POST_TEXT_CHARS} characters"),
        ));
    }

    let image_url = match normalize_image_url(input.image_url.as_deref()) {
        Ok(value) => value,
        Err(error) => {
            errors.push(error);
            None
        }
    };

    if errors.is_empty() {
        Ok(ValidatedPost {
            text: text.to_string(),
            group_id: input.group_id,
            image_url,
        })
    } else {
        Err(errors)
    }
}

pub fn validate_comment(input: &CommentInput) -> Result<ValidatedComment, Vec<FieldError>> {
    let text = input.text.trim();
    if text.is_empty() {
        return Err(vec![FieldError::new(
            "text",
            "Comment text must not be empty",
        )]);
    }
    if text.chars().count() > MAX_COMMENT_TEXT_CHARS {
        return Err(vec![FieldError::new(
            "text",
            format!("Comment text must not exceed {MAX_COMMENT_TEXT_CHARS} characters"),
        )]);
    }

    Ok(ValidatedComment {
        text: text.to_string(),
    })
}

/// An empty image field means "no image"; a non-empty one must be an
/// absolute http(s) URL, since upload storage lives outside this system.
fn normalize_image_url(raw: Option<&str>) -> Result<Option<String>, FieldError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(url.into())),
        Ok(_) => Err(FieldError::new(
            "image_url",
            "Image URL must use http or https",
        )),
        Err(err) => Err(FieldError::new(
            "image_url",
            format!("Image URL is not valid: {err}"),
        )),
    }
}
