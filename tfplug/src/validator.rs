//! Attribute validators run against configuration values during planning.

use crate::types::{AttributePath, Diagnostic, Dynamic};

pub trait Validator: Send + Sync {
    /// Human-readable description of what the validator enforces
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic>;
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length within [{:?}, {:?}]", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        if let Some(s) = value.as_string() {
            if let Some(min) = self.min {
                if s.chars().count() < min {
                    diagnostics.push(Diagnostic::error(
                        format!("{} must be at least {} characters", path, min),
                        format!("got {} characters", s.chars().count()),
                    ));
                }
            }
            if let Some(max) = self.max {
                if s.chars().count() > max {
                    diagnostics.push(Diagnostic::error(
                        format!("{} must be at most {} characters", path, max),
                        format!("got {} characters", s.chars().count()),
                    ));
                }
            }
        }
        diagnostics
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: &str) -> Self {
        Self {
            pattern: regex::Regex::new(pattern).expect("validator pattern must compile"),
            description: description.to_string(),
        }
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        if let Some(s) = value.as_string() {
            if !self.pattern.is_match(s) {
                diagnostics.push(Diagnostic::error(
                    format!("{} must match {}", path, self.description),
                    format!("value '{}' does not match pattern", s),
                ));
            }
        }
        diagnostics
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number within [{:?}, {:?}]", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.push(Diagnostic::error(
                        format!("{} must be at least {}", path, min),
                        format!("got {}", n),
                    ));
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.push(Diagnostic::error(
                        format!("{} must be at most {}", path, max),
                        format!("got {}", n),
                    ));
                }
            }
        }
        diagnostics
    }
}

pub struct StringInSliceValidator {
    pub allowed: Vec<String>,
}

impl StringInSliceValidator {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator for StringInSliceValidator {
    fn description(&self) -> String {
        format!("one of {:?}", self.allowed)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        if let Some(s) = value.as_string() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(Diagnostic::error(
                    format!("{} must be one of {:?}", path, self.allowed),
                    format!("got '{}'", s),
                ));
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    #[test]
    fn length_validator_bounds() {
        let v = StringLengthValidator {
            min: Some(3),
            max: Some(5),
        };
        let path = AttributePath::new("name");

        assert!(v.validate(&Dynamic::String("abcd".into()), &path).is_empty());
        assert_eq!(v.validate(&Dynamic::String("ab".into()), &path).len(), 1);
        assert_eq!(
            v.validate(&Dynamic::String("abcdef".into()), &path).len(),
            1
        );
    }

    #[test]
    fn pattern_validator_rejects_mismatch() {
        let v = StringPatternValidator::new("^[a-z0-9-]+$", "lowercase alphanumeric name");
        let path = AttributePath::new("name");

        assert!(v.validate(&Dynamic::String("my-repo-1".into()), &path).is_empty());
        let diags = v.validate(&Dynamic::String("My Repo".into()), &path);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("lowercase alphanumeric"));
    }

    #[test]
    fn range_validator_bounds() {
        let v = NumberRangeValidator {
            min: Some(1.0),
            max: Some(100.0),
        };
        let path = AttributePath::new("quota_cpu_units");

        assert!(v.validate(&Dynamic::Number(50.0), &path).is_empty());
        assert_eq!(v.validate(&Dynamic::Number(0.0), &path).len(), 1);
        assert_eq!(v.validate(&Dynamic::Number(101.0), &path).len(), 1);
    }

    #[test]
    fn in_slice_validator() {
        let v = StringInSliceValidator::new(&["personal", "managers", "all"]);
        let path = AttributePath::new("access_scope");

        assert!(v.validate(&Dynamic::String("managers".into()), &path).is_empty());
        assert_eq!(v.validate(&Dynamic::String("nobody".into()), &path).len(), 1);
    }
}
