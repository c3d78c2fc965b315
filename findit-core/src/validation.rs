use std::sync::LazyLock;

use findit_types::{ContactUpdate, LoginRequest, RegisterRequest};
use regex::Regex;

pub const MIN_PASSWORD_CHARS: usize = 8;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZáéíóúüñÁÉÍÓÚÜÑ]{3,}$").expect("name pattern compiles"));
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]+$").expect("phone pattern compiles"));
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

/// Form problems caught before any call to the identity service.
/// The messages are shown to players as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Por favor, completa todos los campos")]
    MissingFields,
    #[error("El nombre debe contener solo letras y al menos 3 caracteres.")]
    InvalidName,
    #[error("El teléfono solo puede contener números y el símbolo '+'.")]
    InvalidPhone,
    #[error("El correo electrónico no es válido.")]
    InvalidEmail,
    #[error("La contraseña debe tener al menos 8 caracteres.")]
    PasswordTooShort,
    #[error("Las contraseñas no coinciden")]
    PasswordMismatch,
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), ValidationError> {
    let fields = [
        &request.name,
        &request.phone,
        &request.email,
        &request.password,
        &request.password_confirmation,
    ];
    if fields.iter().any(|field| field.is_empty()) {
        return Err(ValidationError::MissingFields);
    }

    if !NAME_PATTERN.is_match(&request.name) {
        return Err(ValidationError::InvalidName);
    }
    if !PHONE_PATTERN.is_match(&request.phone) {
        return Err(ValidationError::InvalidPhone);
    }
    validate_credentials(&request.email, &request.password)?;

    if request.password != request.password_confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn validate_login(request: &LoginRequest) -> Result<(), ValidationError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    validate_credentials(&request.email, &request.password)
}

/// Settings edits only require both fields to be filled in
pub fn validate_contact(update: &ContactUpdate) -> Result<(), ValidationError> {
    if update.name.trim().is_empty() || update.phone.trim().is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}
