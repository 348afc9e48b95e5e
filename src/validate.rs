use crate::error::Error;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// Validates a username.
///
/// A valid username is:
/// - At least 3 characters
/// - Only ASCII letters, digits, and underscores
#[must_use]
pub fn is_valid_username(s: &str) -> bool {
    s.chars().count() >= MIN_USERNAME_LEN
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Registration input as entered by the user, before it is sent to the backend.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Checks the form the way the registration screen does, first failure wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with a user-facing message.
    pub fn validate(&self) -> Result<(), Error> {
        if self.username.chars().count() < MIN_USERNAME_LEN {
            return Err(Error::Validation(
                "Username must be at least 3 characters".into(),
            ));
        }
        if !is_valid_username(&self.username) {
            return Err(Error::Validation(
                "Username can only contain letters, numbers, and underscores".into(),
            ));
        }
        if self.password != self.confirm_password {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(
                "Password must be at least 6 characters".into(),
            ));
        }
        Ok(())
    }
}
