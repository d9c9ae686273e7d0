use super::storefront::Storefront;
use crate::domain::user::{NewUser, ProfileUpdate, Role, User, UserId, normalize_email};
use crate::error::{Result, ShopError};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

/// Sign-up form.
#[derive(Debug, Deserialize, Clone)]
pub struct Registration {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
    #[serde(rename = "confirmar_senha")]
    pub password_confirmation: String,
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ShopError::InternalError(Box::new(e)))?
        .map_err(ShopError::from)
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ShopError::InternalError(Box::new(e)))?
        .map_err(ShopError::from)
}

impl Storefront {
    /// Creates a customer account.
    pub async fn register(&self, form: Registration) -> Result<User> {
        if form.password != form.password_confirmation {
            return Err(ShopError::ValidationError(
                "As senhas não conferem!".to_string(),
            ));
        }
        if form.name.trim().is_empty() || form.email.trim().is_empty() || form.password.is_empty()
        {
            return Err(ShopError::ValidationError(
                "Nome, e-mail e senha são obrigatórios.".to_string(),
            ));
        }

        let password_hash = hash_password(form.password, self.password_cost).await?;
        let user = self
            .users
            .insert(NewUser {
                name: form.name.trim().to_string(),
                email: form.email,
                password_hash,
                role: Role::Customer,
            })
            .await?;
        info!(user_id = user.id, "customer registered");
        Ok(user)
    }

    /// Checks credentials. Unknown emails and wrong passwords fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            return Err(ShopError::InvalidCredentials);
        };

        if verify_password(password.to_string(), user.password_hash.clone()).await? {
            Ok(user)
        } else {
            warn!(user_id = user.id, "failed login attempt");
            Err(ShopError::InvalidCredentials)
        }
    }

    pub async fn user(&self, id: UserId) -> Result<Option<User>> {
        self.users.get(id).await
    }

    pub async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<User> {
        update.validate()?;
        let mut user = self.users.get(id).await?.ok_or(ShopError::NotFound("User"))?;

        let new_email = normalize_email(&update.email);
        if new_email != user.email
            && let Some(other) = self.users.find_by_email(&new_email).await?
            && other.id != user.id
        {
            return Err(ShopError::Conflict("Email already in use".to_string()));
        }

        user.apply_profile(update, Utc::now());
        self.users.update(user.clone()).await?;
        info!(user_id = id, "profile updated");
        Ok(user)
    }

    /// Creates the merchant account unless the email is already registered.
    /// Returns whether an account was created.
    pub async fn seed_merchant(&self, name: &str, email: &str, password: &str) -> Result<bool> {
        if self.users.find_by_email(&normalize_email(email)).await?.is_some() {
            info!(email, "merchant account already exists");
            return Ok(false);
        }

        let password_hash = hash_password(password.to_string(), self.password_cost).await?;
        self.users
            .insert(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::Merchant,
            })
            .await?;
        info!(email, "merchant account created");
        Ok(true)
    }
}
