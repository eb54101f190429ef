// src/models/restaurant.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_not_blank;

// ---
// 1. Restaurant (O "Tenant")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub perm_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. RestaurantMember (A "Ponte" Usuário-Restaurante)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantMember {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
}

// Membro com o e-mail, para a tela de equipe
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberListing {
    pub user_id: Uuid,
    pub email: String,
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRestaurantPayload {
    #[validate(custom(function = "validate_not_blank", message = "O nome do restaurante é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
}
