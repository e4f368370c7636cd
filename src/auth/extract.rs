use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::token::{Claims, Role, TokenType};
use crate::error::{AppError, AppResult};

/// 需要有效访问令牌的请求者
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.sub
    }

    /// 角色数值不大于 `required` 时放行
    pub fn require_role(&self, required: Role) -> AppResult<()> {
        if self.0.role <= required {
            Ok(())
        } else {
            Err(AppError::Forbidden("权限不足".into()))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Claims>() {
            None => Err(AppError::Unauthorized("需要登录".into())),
            Some(claims) if claims.token_type != TokenType::Access => {
                Err(AppError::Forbidden("请提供访问令牌".into()))
            }
            Some(claims) => Ok(AuthUser(claims.clone())),
        }
    }
}

/// 持有刷新令牌的请求者
#[derive(Debug, Clone)]
pub struct RefreshUser(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for RefreshUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Claims>() {
            None => Err(AppError::Unauthorized("需要登录".into())),
            Some(claims) if claims.token_type != TokenType::Refresh => {
                Err(AppError::Forbidden("请提供刷新令牌".into()))
            }
            Some(claims) => Ok(RefreshUser(claims.clone())),
        }
    }
}

/// 公开接口上的可选用户
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Claims>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|c| c.sub)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Claims>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn claims(role: Role, token_type: TokenType) -> Claims {
        Claims {
            sub: 1,
            role,
            token_type,
            iat: 0,
            exp: i64::MAX,
        }
    }

    async fn extract_auth(c: Option<Claims>) -> Result<AuthUser, AppError> {
        let mut req = Request::builder().body(()).unwrap();
        if let Some(c) = c {
            req.extensions_mut().insert(c);
        }
        let (mut parts, _) = req.into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        assert!(matches!(extract_auth(None).await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn refresh_token_cannot_access_guarded_routes() {
        let result = extract_auth(Some(claims(Role::User, TokenType::Refresh))).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn role_guard() {
        let user = extract_auth(Some(claims(Role::User, TokenType::Access)))
            .await
            .unwrap();
        assert!(user.require_role(Role::Admin).is_err());
        assert!(user.require_role(Role::User).is_ok());

        let admin = extract_auth(Some(claims(Role::Admin, TokenType::Access)))
            .await
            .unwrap();
        assert!(admin.require_role(Role::Admin).is_ok());
        assert!(admin.require_role(Role::PaidUser).is_ok());
    }
}
