use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStore, TokenCacheOperations};
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 用户角色，数值越小权限越高
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "camelCase")]
#[repr(i16)]
pub enum Role {
    Admin = 0,
    PaidUser = 1,
    User = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64, // 用户ID
    pub role: Role,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// 剩余有效秒数，已过期时为负
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.exp - now
    }
}

/// 未验签时读取的类型字段
#[derive(Debug, Deserialize)]
struct TypePeek {
    #[serde(rename = "type")]
    token_type: Option<String>,
}

/// 签发与验证访问令牌、刷新令牌，两种类型使用不同的密钥
#[derive(Clone)]
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.access_token_secret.clone(),
            config.refresh_token_secret.clone(),
            config.access_token_expiration().as_secs() as i64,
            config.refresh_token_expiration().as_secs() as i64,
        )
    }

    fn secret(&self, token_type: TokenType) -> &[u8] {
        match token_type {
            TokenType::Access => self.access_secret.as_bytes(),
            TokenType::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    pub fn issue(&self, user_id: i64, role: Role, token_type: TokenType) -> AppResult<String> {
        self.issue_at(user_id, role, token_type, Utc::now().timestamp())
    }

    /// 以指定时间为签发时间生成令牌
    pub fn issue_at(
        &self,
        user_id: i64,
        role: Role,
        token_type: TokenType,
        issued_at: i64,
    ) -> AppResult<String> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };

        let claims = Claims {
            sub: user_id,
            role,
            token_type,
            iat: issued_at,
            exp: issued_at + ttl,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(token_type)),
        )
        .map_err(|e| AppError::Internal(format!("生成令牌失败: {}", e)))
    }

    /// 不验签读取令牌类型，只用于挑选验签密钥
    pub fn peek_type(token: &str) -> AppResult<TokenType> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let peek = decode::<TypePeek>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|_| AppError::Unauthorized("无效的令牌".into()))?;

        match peek.claims.token_type.as_deref() {
            Some("access") => Ok(TokenType::Access),
            Some("refresh") => Ok(TokenType::Refresh),
            _ => Err(AppError::Unauthorized("无效的令牌".into())),
        }
    }

    /// 验签并检查过期，`expected` 为 Some 时类型也必须一致
    pub fn verify(&self, token: &str, expected: Option<TokenType>) -> AppResult<Claims> {
        let token_type = match expected {
            Some(t) => t,
            None => Self::peek_type(token)?,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(token_type)),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("令牌已过期".into()),
            _ => AppError::Unauthorized("无效的令牌".into()),
        })?;

        if data.claims.token_type != token_type {
            return Err(AppError::Unauthorized(match token_type {
                TokenType::Access => "请提供访问令牌".into(),
                TokenType::Refresh => "请提供刷新令牌".into(),
            }));
        }

        Ok(data.claims)
    }

    /// Bearer 令牌的完整校验流程：封禁检查、载荷缓存、验签
    pub async fn authenticate(&self, cache: &dyn CacheStore, token: &str) -> AppResult<Claims> {
        if TokenCacheOperations::is_blocked(cache, token).await? {
            return Err(AppError::Unauthorized("令牌已被封禁".into()));
        }

        let now = Utc::now().timestamp();

        // 缓存的 TTL 只是上限，令牌本身的 exp 优先
        if let Some(claims) = TokenCacheOperations::get_payload(cache, token).await? {
            if claims.remaining_secs(now) > 0 {
                tracing::debug!(sub = claims.sub, "token payload served from cache");
                return Ok(claims);
            }
        }

        let claims = self.verify(token, None)?;
        TokenCacheOperations::cache_payload(cache, token, &claims, now).await?;

        Ok(claims)
    }

    /// 封禁令牌直到其自然过期；过期或无效的令牌无需封禁，直接拒绝
    pub async fn block(&self, cache: &dyn CacheStore, token: &str) -> AppResult<Claims> {
        let claims = self.verify(token, None)?;
        TokenCacheOperations::block(cache, token, &claims, Utc::now().timestamp()).await?;
        tracing::info!(sub = claims.sub, "token blocked");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn service() -> TokenService {
        TokenService::new("access-secret", "refresh-secret", 300, 86400)
    }

    #[test]
    fn issues_and_verifies_access_token() {
        let tokens = service();
        let token = tokens.issue(27, Role::User, TokenType::Access).unwrap();

        let claims = tokens.verify(&token, Some(TokenType::Access)).unwrap();
        assert_eq!(claims.sub, 27);
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn payload_uses_type_field() {
        let tokens = service();
        let token = tokens.issue(1, Role::Admin, TokenType::Refresh).unwrap();
        assert_eq!(TokenService::peek_type(&token).unwrap(), TokenType::Refresh);
    }

    #[test]
    fn rejects_wrong_expected_type() {
        let tokens = service();
        let refresh = tokens.issue(1, Role::User, TokenType::Refresh).unwrap();
        assert!(matches!(
            tokens.verify(&refresh, Some(TokenType::Access)),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_foreign_signature() {
        let other = TokenService::new("x", "y", 300, 86400);
        let token = other.issue(1, Role::User, TokenType::Access).unwrap();
        assert!(matches!(
            service().verify(&token, None),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let tokens = service();
        let issued = Utc::now().timestamp() - 1000;
        let token = tokens.issue_at(1, Role::User, TokenType::Access, issued).unwrap();
        match tokens.verify(&token, None) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "令牌已过期"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(TokenService::peek_type("not-a-jwt").is_err());
    }

    #[test]
    fn role_ordering_admin_first() {
        assert!(Role::Admin < Role::PaidUser);
        assert!(Role::PaidUser < Role::User);
        assert_eq!(serde_json::to_string(&Role::PaidUser).unwrap(), "\"paidUser\"");
    }

    #[tokio::test]
    async fn authenticate_caches_payload() {
        let tokens = service();
        let cache = MemoryCache::new();
        let token = tokens.issue(5, Role::User, TokenType::Access).unwrap();

        let claims = tokens.authenticate(&cache, &token).await.unwrap();
        assert_eq!(claims.sub, 5);
        assert!(
            TokenCacheOperations::get_payload(&cache, &token)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn blocked_token_is_rejected_even_if_valid() {
        let tokens = service();
        let cache = MemoryCache::new();
        let token = tokens.issue(5, Role::User, TokenType::Access).unwrap();

        tokens.authenticate(&cache, &token).await.unwrap();
        tokens.block(&cache, &token).await.unwrap();

        for _ in 0..3 {
            match tokens.authenticate(&cache, &token).await {
                Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "令牌已被封禁"),
                other => panic!("unexpected {other:?}"),
            }
        }

        // 其他令牌不受影响
        let fresh = tokens.issue(6, Role::User, TokenType::Access).unwrap();
        assert!(tokens.authenticate(&cache, &fresh).await.is_ok());
    }
}
