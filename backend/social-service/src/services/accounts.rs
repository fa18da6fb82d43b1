use actix_middleware::Principal;
use crypto_core::{password, JwtKeys};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use super::decode_body;
use crate::domain::models::{NewUser, User, UserChanges};
use crate::domain::views::UserView;
use crate::error::{AppError, Result};
use crate::permissions;
use crate::repository::SocialStore;

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserView,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn SocialStore>,
    keys: Arc<JwtKeys>,
}

impl AccountService {
    pub fn new(store: Arc<dyn SocialStore>, keys: Arc<JwtKeys>) -> Self {
        Self { store, keys }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<AuthPayload> {
        input.validate()?;
        let username = input.username.trim().to_string();
        if self.store.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::field(
                "username",
                "A user with that username already exists.",
            ));
        }

        let user = self
            .store
            .create_user(NewUser {
                username,
                email: input.email.trim().to_lowercase(),
                password_hash: password::hash_password(&input.password)?,
                bio: input.bio.unwrap_or_default(),
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        self.issue(user).await
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthPayload> {
        input.validate()?;
        let Some(user) = self.store.find_user_by_username(input.username.trim()).await? else {
            tracing::warn!(username = %input.username, "login for unknown user");
            return Err(AppError::BadRequest(BAD_CREDENTIALS.to_string()));
        };
        if !password::verify_password(&input.password, &user.password_hash)? {
            tracing::warn!(user_id = user.id, "login with wrong password");
            return Err(AppError::BadRequest(BAD_CREDENTIALS.to_string()));
        }

        self.issue(user).await
    }

    pub async fn profile(&self, actor: &Principal) -> Result<UserView> {
        let me = permissions::require_user(actor)?;
        let user = self.load(me.id).await?;
        let counts = self.store.follow_counts(user.id).await?;
        Ok(UserView::private(&user, counts))
    }

    pub async fn update_profile(&self, actor: &Principal, body: Value) -> Result<UserView> {
        let me = permissions::require_user(actor)?;
        let patch: ProfilePatch = decode_body(body)?;
        patch.validate()?;

        let changes = UserChanges {
            email: patch.email.map(|e| e.trim().to_lowercase()),
            bio: patch.bio,
        };
        let user = self
            .store
            .update_user(me.id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        let counts = self.store.follow_counts(user.id).await?;
        Ok(UserView::private(&user, counts))
    }

    pub async fn public_profile(&self, user_id: i64) -> Result<UserView> {
        let user = self.load(user_id).await?;
        let counts = self.store.follow_counts(user.id).await?;
        Ok(UserView::public(&user, counts))
    }

    async fn issue(&self, user: User) -> Result<AuthPayload> {
        let token = self.keys.generate_access_token(user.id, &user.username)?;
        let counts = self.store.follow_counts(user.id).await?;
        Ok(AuthPayload {
            token,
            user: UserView::private(&user, counts),
        })
    }

    async fn load(&self, id: i64) -> Result<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }
}
