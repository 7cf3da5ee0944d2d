use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Collects validation failures keyed by field name.
///
/// Only the first message recorded for a field is kept, later ones are dropped.
/// A fresh validator is created for every request.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        if !self.errors.contains_key(field) {
            self.errors.insert(field.to_string(), message.to_string());
        }
    }

    /// Records `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

/// Field to message map of a failed validation, serialized as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn test_first_error_wins() {
        let mut v = Validator::new();
        assert!(v.is_valid());
        v.check(false, "year", "must be provided");
        v.check(false, "year", "must be greater than 1888");
        v.check(true, "title", "must be provided");
        assert!(!v.is_valid());
        assert_eq!(1, v.errors().len());
        assert_eq!("must be provided", v.errors()["year"]);
    }

    #[test]
    fn test_into_result() {
        assert!(Validator::new().into_result().is_ok());

        let mut v = Validator::new();
        v.add_error("genres", "must contain at least 1 genre");
        v.add_error("title", "must be provided");
        let errors = v.into_result().unwrap_err();
        assert_eq!(2, errors.len());
        assert_eq!(Some("must be provided"), errors.get("title"));
        assert_eq!(
            "genres: must contain at least 1 genre; title: must be provided",
            errors.to_string()
        );
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            serde_json::json!({"genres": "must contain at least 1 genre", "title": "must be provided"}),
            json
        );
    }

    #[quickcheck]
    fn test_keeps_first_message_per_field(entries: Vec<(u8, String)>) -> bool {
        let mut v = Validator::new();
        for (key, message) in &entries {
            v.add_error(&format!("field{}", key % 4), message);
        }
        v.errors().iter().all(|(field, message)| {
            let first = entries
                .iter()
                .find(|(key, _)| &format!("field{}", key % 4) == field)
                .map(|(_, m)| m);
            first == Some(message)
        }) && v.is_valid() == entries.is_empty()
    }
}
