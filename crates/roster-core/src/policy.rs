//! Password policy abstraction.

/// User attributes a policy may compare a candidate password against.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordContext<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

impl<'a> PasswordContext<'a> {
    pub fn for_user(user: &'a crate::models::user::User) -> Self {
        Self {
            username: Some(&user.username),
            email: Some(&user.email),
            first_name: Some(&user.first_name),
            last_name: Some(&user.last_name),
        }
    }
}

/// Complexity rules a new credential must satisfy.
///
/// `check` returns every violated rule as a human-readable message.
pub trait PasswordPolicy: Send + Sync {
    fn check(&self, password: &str, context: Option<&PasswordContext<'_>>)
    -> Result<(), Vec<String>>;
}

impl<P: PasswordPolicy + ?Sized> PasswordPolicy for &P {
    fn check(
        &self,
        password: &str,
        context: Option<&PasswordContext<'_>>,
    ) -> Result<(), Vec<String>> {
        (**self).check(password, context)
    }
}
