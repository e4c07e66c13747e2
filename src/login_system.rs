use crate::{
    argon_hasher::verify,
    constants::get_user_cache_options,
    entities::{prelude::*, sea_orm_active_enums::Role, user},
    utils::normalize_email,
};
use axum_login::{AuthUser, AuthnBackend, AuthzBackend, UserId};
use redis::{AsyncCommands, aio::MultiplexedConnection};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;
use utoipa::ToSchema;

pub type AuthSession = axum_login::AuthSession<AuthBackend>;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl AuthUser for user::Model {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.id.to_owned()
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.password.as_bytes()
    }
}

/// Route-layer permissions. `Dashboard` is the email-allowlist gate: granted
/// per account by staff, or implied by the admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Admin,
    Dashboard,
}

#[derive(Clone)]
pub struct AuthBackend {
    db: DatabaseConnection,
    redis: MultiplexedConnection,
}

impl AuthBackend {
    pub fn new(db: DatabaseConnection, redis: MultiplexedConnection) -> Self {
        Self { db, redis }
    }
}

impl AuthnBackend for AuthBackend {
    type User = user::Model;
    type Credentials = Credentials;
    type Error = sea_orm::DbErr;

    async fn authenticate(
        &self,
        Credentials { email, password }: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let user = User::find()
            .filter(user::Column::Email.eq(normalize_email(&email)))
            .one(&self.db)
            .await?;

        if let Some(ref user) = user {
            if verify(password.as_bytes(), &user.password).await {
                // Cache on successful login (best effort, errors ignored)
                let mut redis = self.redis.clone();
                let _: Result<(), _> = redis
                    .set_options(
                        format!("user_{}", user.id),
                        serde_json::to_string(user).unwrap(),
                        get_user_cache_options(),
                    )
                    .await;
                return Ok(Some(user.clone()));
            }
        }
        Ok(None)
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        let mut redis = self.redis.clone();

        let cached: Option<String> = redis
            .get(format!("user_{}", user_id.to_owned()))
            .await
            .unwrap_or(None);
        if let Some(user_str) = cached {
            if let Ok(user) = serde_json::from_str::<user::Model>(&user_str) {
                return Ok(Some(user));
            }
        }

        let user = User::find_by_id(user_id.to_owned()).one(&self.db).await?;

        if let Some(user) = &user {
            let _: Result<(), _> = redis
                .set_options(
                    format!("user_{}", user_id.to_owned()),
                    serde_json::to_string(user).unwrap(),
                    get_user_cache_options(),
                )
                .await;
        }
        Ok(user)
    }
}

impl AuthzBackend for AuthBackend {
    type Permission = Permission;

    async fn has_perm(
        &self,
        user: &Self::User,
        perm: Self::Permission,
    ) -> Result<bool, Self::Error> {
        Ok(match perm {
            Permission::Admin => user.role == Role::Admin,
            Permission::Dashboard => user.is_allowed_dashboard || user.role == Role::Admin,
        })
    }
}
