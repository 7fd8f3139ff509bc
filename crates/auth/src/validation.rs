//! Checks run before any auth request leaves the process.

use proto::{AuthError, LoginCredentials, PasswordUpdate, RegisterData};

fn required(value: &str, message: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

fn email(value: &str) -> Result<(), AuthError> {
    required(value, "Email is required")?;
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation("Email address is invalid".to_string()))
    }
}

pub fn login(credentials: &LoginCredentials) -> Result<(), AuthError> {
    email(&credentials.email)?;
    required(&credentials.password, "Password is required")
}

pub fn register(data: &RegisterData) -> Result<(), AuthError> {
    required(&data.name, "Name is required")?;
    email(&data.email)?;
    required(&data.password, "Password is required")?;
    if data.password != data.confirm_password {
        return Err(AuthError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

pub fn password_update(data: &PasswordUpdate) -> Result<(), AuthError> {
    required(&data.current_password, "Current password is required")?;
    required(&data.new_password, "New password is required")?;
    if data.new_password != data.confirm_password {
        return Err(AuthError::Validation(
            "New passwords do not match".to_string(),
        ));
    }
    Ok(())
}
