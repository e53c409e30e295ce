//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use minimart_core::{Email, UserId};

/// A registered user (domain type).
///
/// The password hash is intentionally not part of this type; repositories
/// return it separately on the login path only.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address. Also the identity key for carts, orders, and
    /// notification channels.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Whether this user holds administrative privilege.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Partial update to a user's own profile.
///
/// Only fields that are present are applied; absent fields are left
/// untouched. An entirely empty patch is rejected at the route layer.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UserPatch {
    /// New display name.
    pub name: Option<String>,
    /// New plaintext password (hashed before storage).
    pub password: Option<String>,
}

impl UserPatch {
    /// Whether the patch carries no changes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.password.is_none()
    }
}
