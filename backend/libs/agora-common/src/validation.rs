//! Field-level validation errors in a stable `{field: [messages]}` shape,
//! plus the text-field helpers shared by the request bodies.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::{ValidationError, ValidationErrors};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let field = field.to_string();
            for error in field_errors.iter() {
                out.add(&field, describe(error));
            }
        }
        out
    }
}

pub const BLANK_MESSAGE: &str = "This field may not be blank.";

/// `#[validate(custom(function = "agora_common::validation::non_blank"))]`
pub fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(BLANK_MESSAGE.into());
        return Err(error);
    }
    Ok(())
}

/// `#[serde(deserialize_with = "trimmed")]` strips surrounding whitespace
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

/// Optional variant of [`trimmed`]; pair it with `#[serde(default)]`
pub fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_string()))
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let param = |name: &str| error.params.get(name).map(|v| v.to_string());
    match error.code.as_ref() {
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("Ensure this field has between {min} and {max} characters."),
            (Some(min), None) => format!("Ensure this field has at least {min} characters."),
            (None, Some(max)) => format!("Ensure this field has no more than {max} characters."),
            (None, None) => "Invalid length.".to_string(),
        },
        "email" => "Enter a valid email address.".to_string(),
        "required" => "This field is required.".to_string(),
        "blank" => BLANK_MESSAGE.to_string(),
        other => format!("Invalid value ({other})."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 3, max = 10))]
        username: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn converts_validator_errors_per_field() {
        let signup = Signup {
            username: "ab".into(),
            email: "nope".into(),
        };
        let errors = FieldErrors::from(signup.validate().unwrap_err());

        assert_eq!(
            errors.get("username").unwrap(),
            ["Ensure this field has between 3 and 10 characters."]
        );
        assert_eq!(errors.get("email").unwrap(), ["Enter a valid email address."]);
    }

    #[derive(Deserialize, Validate)]
    struct Note {
        #[serde(deserialize_with = "trimmed")]
        #[validate(custom(function = "non_blank"), length(max = 5))]
        title: String,
        #[serde(default, deserialize_with = "trimmed_opt")]
        #[validate(custom(function = "non_blank"))]
        body: Option<String>,
    }

    #[test]
    fn whitespace_only_text_is_blank() {
        let note: Note = serde_json::from_value(serde_json::json!({
            "title": "   ",
            "body": "\t\n",
        }))
        .unwrap();
        assert_eq!(note.title, "");

        let errors = FieldErrors::from(note.validate().unwrap_err());
        assert_eq!(errors.get("title").unwrap(), [BLANK_MESSAGE]);
        assert_eq!(errors.get("body").unwrap(), [BLANK_MESSAGE]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_length_check() {
        let note: Note = serde_json::from_value(serde_json::json!({ "title": "  abcde  " })).unwrap();
        assert_eq!(note.title, "abcde");
        assert!(note.body.is_none());
        assert!(note.validate().is_ok());
    }

    #[test]
    fn serializes_as_plain_map() {
        let errors = FieldErrors::single("publication_year", "too late");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"publication_year": ["too late"]}));
    }

    #[test]
    fn empty_collection_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("a", "b").into_result().is_err());
    }

    #[test]
    fn display_joins_messages() {
        let mut errors = FieldErrors::single("a", "first");
        errors.add("b", "second");
        assert_eq!(errors.to_string(), "a: first; b: second");
    }
}
