use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::FieldErrors;
use crate::models::auth::requests::RegisterRequest;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.@+-]+$").expect("Invalid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid email regex")
});

const COMMON_PASSWORDS: [&str; 9] = [
    "password",
    "12345678",
    "123456789",
    "qwerty123",
    "admin123",
    "password1",
    "letmein1",
    "iloveyou",
    "abcd1234",
];

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    // 3 <= 长度 <= 150
    if username.chars().count() < 3 || username.chars().count() > 150 {
        return Err("Username length must be between 3 and 150 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Username may contain only letters, digits and @/./+/-/_ characters");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if !EMAIL_RE.is_match(email) {
        return Err("Enter a valid email address.");
    }
    Ok(())
}

/// 密码策略：至少 8 位、不能全是数字、不能是常见弱密码、需同时包含字母和数字
pub fn validate_password(password: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();
    if password.chars().count() < 8 {
        errors.push("This password is too short. It must contain at least 8 characters.");
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.");
    } else if !password.chars().any(|c| c.is_ascii_digit())
        || !password.chars().any(|c| c.is_alphabetic())
    {
        errors.push("Password must contain both letters and digits.");
    }
    if COMMON_PASSWORDS
        .iter()
        .any(|weak| password.eq_ignore_ascii_case(weak))
    {
        errors.push("This password is too common.");
    }
    errors
}

/// 注册表单的全部字段校验
pub fn validate_registration(req: &RegisterRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate_username(req.username.trim()) {
        errors.entry("username".into()).or_default().push(msg.into());
    }
    if let Err(msg) = validate_email(req.email.trim()) {
        errors.entry("email".into()).or_default().push(msg.into());
    }
    for msg in validate_password(&req.password) {
        errors.entry("password".into()).or_default().push(msg.into());
    }
    for (field, value) in [("first_name", &req.first_name), ("last_name", &req.last_name)] {
        if value.trim().is_empty() {
            errors
                .entry(field.into())
                .or_default()
                .push("This field may not be blank.".into());
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ada.l+cs@uni").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Sup3rSecret").is_empty());
        assert_eq!(
            validate_password("12345678"),
            vec![
                "This password is entirely numeric.",
                "This password is too common."
            ]
        );
        assert!(validate_password("short1").contains(
            &"This password is too short. It must contain at least 8 characters."
        ));
        assert!(validate_password("lettersonly").contains(&"Password must contain both letters and digits."));
    }

    #[test]
    fn test_registration_collects_field_errors() {
        let req = RegisterRequest {
            username: "ok_name".into(),
            email: "nope".into(),
            password: "abc".into(),
            first_name: " ".into(),
            last_name: "Turing".into(),
        };
        let errors = validate_registration(&req).unwrap_err();
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
        assert!(errors.contains_key("first_name"));
        assert!(!errors.contains_key("username"));
        assert!(!errors.contains_key("last_name"));
    }
}
