use rand::Rng;

const URL_SAFE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const PASSWORD_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%";

/// 注册令牌长度，与 64 字节 base64url 编码后的长度一致
pub const REGISTRATION_TOKEN_LEN: usize = 86;

fn random_from(charset: &[u8], length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

/// 分组自助注册令牌
pub fn generate_registration_token() -> String {
    random_from(URL_SAFE, REGISTRATION_TOKEN_LEN)
}

/// 初始管理员密码
pub fn generate_random_password(length: usize) -> String {
    random_from(PASSWORD_CHARS, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_and_charset() {
        let pwd = generate_random_password(16);
        assert_eq!(pwd.len(), 16);
        assert!(pwd.bytes().all(|b| PASSWORD_CHARS.contains(&b)));
    }
}
