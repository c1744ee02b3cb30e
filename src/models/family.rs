// SPDX-License-Identifier: MIT

//! Family grouping models.

use serde::Serialize;

/// A family unit owning members and records.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Family {
    pub id: i64,
    pub name: String,
    pub created_by: i64,
    pub created_at: String,
}

/// Family membership entry joined with the user's profile fields.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FamilyUser {
    pub user_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    /// 'admin' or 'member'
    pub role: String,
    pub joined_at: String,
}

/// Pending invitation into a family.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FamilyInvite {
    pub id: i64,
    pub family_id: i64,
    pub email: String,
    pub token: String,
    pub invited_by: i64,
    pub created_at: String,
}
