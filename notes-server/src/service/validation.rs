use serde_json::Value;

use crate::{dto::NoteRequest, envelope::FieldErrors, models::NoteDraft};

pub const TITLE_MAX_CHARS: usize = 255;

/// Trims both fields and checks the create/update rules. Blank strings and
/// `null` count as missing; any other non-string value is rejected as such.
pub fn validate(request: NoteRequest) -> Result<NoteDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = required("title", request.title, &mut errors);
    if let Some(title) = &title
        && title.chars().count() > TITLE_MAX_CHARS
    {
        errors.entry("title".to_string()).or_default().push(format!(
            "The title field must not be greater than {TITLE_MAX_CHARS} characters."
        ));
    }

    let content = required("content", request.content, &mut errors);

    match (title, content) {
        (Some(title), Some(content)) if errors.is_empty() => Ok(NoteDraft { title, content }),
        _ => Err(errors),
    }
}

fn required(field: &str, value: Option<Value>, errors: &mut FieldErrors) -> Option<String> {
    let message = match value {
        Some(Value::String(v)) if !v.trim().is_empty() => return Some(v.trim().to_string()),
        None | Some(Value::Null | Value::String(_)) => format!("The {field} field is required."),
        Some(_) => format!("The {field} field must be a string."),
    };

    errors.entry(field.to_string()).or_default().push(message);
    None
}
