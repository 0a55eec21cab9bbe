/// Form validation
///
/// A [`Form`] wraps the submitted key/value pairs of an HTML form and accumulates
/// human-readable errors per field as rules are applied. Rules never short-circuit:
/// every rule runs and every failure is recorded, so the re-rendered form can show all
/// problems at once.
///
/// # Example
///
/// ```
/// use hearth_shared::forms::Form;
/// use std::collections::HashMap;
///
/// let mut values = HashMap::new();
/// values.insert("email".to_string(), "me@here.com".to_string());
///
/// let mut form = Form::new(values);
/// form.required(&["email", "first_name"]);
/// form.is_email("email");
///
/// assert!(!form.valid());
/// assert_eq!(form.errors().get("first_name"), Some("This field cannot be blank"));
/// assert_eq!(form.errors().get("email"), None);
/// ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::ValidateEmail;

/// Errors recorded per field, in the order they were added
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(HashMap<String, Vec<String>>);

impl FormErrors {
    /// Records a message for `field`
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// First message recorded for `field`
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Whether `field` has at least one error
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Names of the fields with errors
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Submitted form values plus the errors found so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    values: HashMap<String, String>,
    errors: FormErrors,
}

impl Form {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            errors: FormErrors::default(),
        }
    }

    /// Raw submitted value, empty if the field was not submitted
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Submitted value with surrounding whitespace removed
    pub fn trimmed(&self, field: &str) -> &str {
        self.get(field).trim()
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Records an error that no built-in rule covers
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Whether `field` was submitted with a non-blank value
    pub fn has(&self, field: &str) -> bool {
        !self.trimmed(field).is_empty()
    }

    /// Marks every listed field that is absent or blank
    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if !self.has(field) {
                self.errors.add(field, "This field cannot be blank");
            }
        }
    }

    /// Marks `field` if it is absent or shorter than `length` characters
    pub fn min_length(&mut self, field: &str, length: usize) -> bool {
        let actual = self.get(field).chars().count();
        if actual < length {
            self.errors
                .add(field, format!("This field must be at least {} characters long", length));
            return false;
        }
        true
    }

    /// Marks `field` unless it holds an address shaped like `local@domain.tld`
    pub fn is_email(&mut self, field: &str) -> bool {
        if !is_email_shaped(self.trimmed(field)) {
            self.errors.add(field, "Invalid email address");
            return false;
        }
        true
    }

    /// True while no rule has failed
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_email_shaped(value: &str) -> bool {
    if !value.validate_email() {
        return false;
    }
    match value.rsplit_once('@') {
        Some((_, domain)) => domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}
