//! Authorization 头解析
//!
//! 两种格式都必须是 `<scheme> <token>`，多余或缺少的空格段都视为格式错误。

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::{AppError, AppResult};

const MALFORMED: &str = "令牌格式错误";

/// Basic 头中解码出的账号密码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub email: String,
    pub password: String,
}

fn split_scheme<'a>(raw: &'a str, scheme: &str) -> AppResult<&'a str> {
    let parts: Vec<&str> = raw.split(' ').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(MALFORMED.into()));
    }

    let (keyword, token) = (parts[0], parts[1]);
    if !keyword.eq_ignore_ascii_case(scheme) || token.is_empty() {
        return Err(AppError::BadRequest(MALFORMED.into()));
    }

    Ok(token)
}

/// 解析 `Basic base64(email:password)`
pub fn parse_basic(raw: &str) -> AppResult<BasicCredentials> {
    let token = split_scheme(raw, "basic")?;

    let decoded = STANDARD
        .decode(token)
        .map_err(|_| AppError::BadRequest(MALFORMED.into()))?;
    let decoded = String::from_utf8(decoded).map_err(|_| AppError::BadRequest(MALFORMED.into()))?;

    let parts: Vec<&str> = decoded.split(':').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(MALFORMED.into()));
    }

    Ok(BasicCredentials {
        email: parts[0].to_string(),
        password: parts[1].to_string(),
    })
}

/// 解析 `Bearer <token>`，返回原始令牌
pub fn parse_bearer(raw: &str) -> AppResult<&str> {
    split_scheme(raw, "bearer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_basic_credentials() {
        let creds = parse_basic("Basic dGVzdEBleGFtcGxlLmNvbToxMjM0").unwrap();
        assert_eq!(creds.email, "test@example.com");
        assert_eq!(creds.password, "1234");
    }

    #[test]
    fn basic_scheme_is_case_insensitive() {
        assert!(parse_basic("basic dGVzdEBleGFtcGxlLmNvbToxMjM0").is_ok());
        assert!(parse_basic("BASIC dGVzdEBleGFtcGxlLmNvbToxMjM0").is_ok());
    }

    #[test]
    fn basic_rejects_wrong_scheme_and_segments() {
        for raw in [
            "Bearer dGVzdEBleGFtcGxlLmNvbToxMjM0",
            "Basic",
            "Basic  dGVzdEBleGFtcGxlLmNvbToxMjM0",
            "Basic a b",
            "dGVzdEBleGFtcGxlLmNvbToxMjM0",
        ] {
            assert!(
                matches!(parse_basic(raw), Err(AppError::BadRequest(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn basic_requires_exactly_one_colon() {
        // "admin@example.com:pass:word"
        assert!(parse_basic("Basic YWRtaW5AZXhhbXBsZS5jb206cGFzczp3b3Jk").is_err());
        // "nocolon"
        assert!(parse_basic("Basic bm9jb2xvbg==").is_err());
    }

    #[test]
    fn basic_rejects_invalid_base64() {
        assert!(matches!(
            parse_basic("Basic !!!notbase64"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn bearer_returns_raw_token() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(parse_bearer("bearer abc").unwrap(), "abc");
        assert!(parse_bearer("Basic abc").is_err());
        assert!(parse_bearer("Bearer").is_err());
        assert!(parse_bearer("Bearer a b").is_err());
    }
}
