use crate::error::ShopError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    #[serde(rename = "cliente")]
    Customer,
    #[serde(rename = "lojista")]
    Merchant,
}

impl Role {
    /// Landing page after login.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Customer => "/cliente/dashboard",
            Role::Merchant => "/lojista/dashboard",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct Address {
    pub cep: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

/// A registered account, either a customer or the merchant.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique, stored trimmed and lowercased.
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub address: Address,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Profile fields a user can edit.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct ProfileUpdate {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefone", default)]
    pub phone: String,
    #[serde(default)]
    pub cep: String,
    #[serde(rename = "rua", default)]
    pub street: String,
    #[serde(rename = "numero", default)]
    pub number: String,
    #[serde(rename = "complemento", default)]
    pub complement: String,
    #[serde(rename = "bairro", default)]
    pub district: String,
    #[serde(rename = "cidade", default)]
    pub city: String,
    #[serde(rename = "estado", default)]
    pub state: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), ShopError> {
    if value.chars().count() > max {
        Err(ShopError::ValidationError(format!(
            "O campo {field} deve ter no máximo {max} caracteres."
        )))
    } else {
        Ok(())
    }
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ShopError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(ShopError::ValidationError(
                "Nome e E-mail são obrigatórios.".to_string(),
            ));
        }
        check_len("telefone", &self.phone, 20)?;
        check_len("cep", &self.cep, 10)?;
        check_len("rua", &self.street, 255)?;
        check_len("numero", &self.number, 20)?;
        check_len("complemento", &self.complement, 100)?;
        check_len("bairro", &self.district, 100)?;
        check_len("cidade", &self.city, 100)?;
        check_len("estado", &self.state, 2)?;
        Ok(())
    }
}

impl User {
    pub fn new(id: UserId, new_user: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new_user.name,
            email: normalize_email(&new_user.email),
            password_hash: new_user.password_hash,
            phone: String::new(),
            address: Address::default(),
            role: new_user.role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_profile(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        self.name = update.name.trim().to_string();
        self.email = normalize_email(&update.email);
        self.phone = update.phone;
        self.address = Address {
            cep: update.cep,
            street: update.street,
            number: update.number,
            complement: update.complement,
            district: update.district,
            city: update.city,
            state: update.state,
        };
        self.updated_at = now;
    }

    pub fn is_merchant(&self) -> bool {
        self.role == Role::Merchant
    }
}
