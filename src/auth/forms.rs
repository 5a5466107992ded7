//! Input checks the sign-in screens run before calling the controller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gender options offered by the signup form
pub const GENDER_OPTIONS: &[&str] = &["Male", "Female", "Other"];

/// Age brackets offered by the signup form
pub const AGE_GROUP_OPTIONS: &[&str] = &["18-24", "25-34", "35-44", "45-54", "55+"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please fill in all fields")]
    MissingFields {
        fields: Vec<&'static str>,
    },

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("'{value}' is not a valid {field}")]
    UnknownOption {
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        missing(&[("email", &self.email), ("password", &self.password)])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: String,
    pub age_group: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), FormError> {
        missing(&[
            ("email", &self.email),
            ("password", &self.password),
            ("confirmPassword", &self.confirm_password),
            ("gender", &self.gender),
            ("ageGroup", &self.age_group),
        ])?;

        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }

        check_option("gender", &self.gender, GENDER_OPTIONS)?;
        check_option("age group", &self.age_group, AGE_GROUP_OPTIONS)?;

        Ok(())
    }
}

fn missing(fields: &[(&'static str, &String)]) -> Result<(), FormError> {
    let empty: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if empty.is_empty() {
        Ok(())
    } else {
        Err(FormError::MissingFields { fields: empty })
    }
}

fn check_option(field: &'static str, value: &str, options: &[&str]) -> Result<(), FormError> {
    if options.contains(&value) {
        Ok(())
    } else {
        Err(FormError::UnknownOption {
            field,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_signup() -> SignupForm {
        SignupForm {
            email: "b@x.com".into(),
            password: "pw".into(),
            confirm_password: "pw".into(),
            gender: "Female".into(),
            age_group: "25-34".into(),
        }
    }

    #[test]
    fn test_valid_signup_passes() {
        assert_eq!(valid_signup().validate(), Ok(()));
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let form = SignupForm {
            gender: " ".into(),
            age_group: String::new(),
            ..valid_signup()
        };
        assert_eq!(
            form.validate(),
            Err(FormError::MissingFields {
                fields: vec!["gender", "ageGroup"]
            })
        );
        assert_eq!(
            form.validate().unwrap_err().to_string(),
            "Please fill in all fields"
        );
    }

    #[test]
    fn test_password_mismatch() {
        let form = SignupForm {
            confirm_password: "other".into(),
            ..valid_signup()
        };
        assert_eq!(form.validate(), Err(FormError::PasswordMismatch));
    }

    #[test]
    fn test_unknown_options_rejected() {
        let form = SignupForm {
            age_group: "12-17".into(),
            ..valid_signup()
        };
        assert!(matches!(
            form.validate(),
            Err(FormError::UnknownOption { field: "age group", .. })
        ));
    }

    #[test]
    fn test_login_form() {
        assert_eq!(LoginForm::new("a@example.com", "pw").validate(), Ok(()));
        assert!(LoginForm::new("a@example.com", "").validate().is_err());
    }
}
