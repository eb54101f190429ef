// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_not_blank;

// O que sai do banco (Tabela roles)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    // NULL para cargos de sistema
    pub restaurant_id: Option<Uuid>,
    pub key: String,
    pub name: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Cargos que o restaurante pode enxergar e atribuir: os seus e os de sistema.
    pub fn is_visible_to(&self, restaurant_id: Uuid) -> bool {
        self.restaurant_id.is_none() || self.restaurant_id == Some(restaurant_id)
    }

    /// Cargos que o restaurante pode alterar: só os seus, nunca os de sistema.
    pub fn is_editable_by(&self, restaurant_id: Uuid) -> bool {
        !self.is_system && self.restaurant_id == Some(restaurant_id)
    }
}

// Permissão de um cargo, já com as chaves do catálogo
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionView {
    pub role_id: Uuid,
    pub feature_id: Uuid,
    pub feature_key: String,
    pub feature_name: String,
    pub action_id: i16,
    pub action_key: String,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleAssignment {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub role_id: Uuid,
    pub role_key: String,
    pub role_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserOverrideView {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub feature_id: Uuid,
    pub feature_key: String,
    pub feature_name: String,
    pub action_id: i16,
    pub action_key: String,
    pub allowed: bool,
}

// Linha crua usada pelo resolvedor: (funcionalidade, ação) -> permitido
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct PermissionRow {
    pub feature_id: Uuid,
    pub action_id: i16,
    pub allowed: bool,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(
        length(max = 64, message = "A chave do cargo tem no máximo 64 caracteres."),
        custom(function = "validate_not_blank", message = "A chave do cargo é obrigatória.")
    )]
    pub key: String,

    #[validate(custom(function = "validate_not_blank", message = "O nome do cargo é obrigatório."))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    #[validate(custom(function = "validate_not_blank", message = "O nome do cargo é obrigatório."))]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub feature_id: Uuid,
    pub action_id: i16,
    pub allowed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRolePermissionsPayload {
    pub permissions: Vec<PermissionGrant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserOverridesPayload {
    pub overrides: Vec<PermissionGrant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolePayload {
    pub role_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(restaurant_id: Option<Uuid>, is_system: bool) -> Role {
        Role {
            id: Uuid::new_v4(),
            restaurant_id,
            key: "cashier".into(),
            name: "Caixa".into(),
            is_system,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn system_roles_are_visible_but_not_editable() {
        let restaurant = Uuid::new_v4();
        let system = role(None, true);
        assert!(system.is_visible_to(restaurant));
        assert!(!system.is_editable_by(restaurant));
    }

    #[test]
    fn tenant_roles_stay_inside_their_restaurant() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let tenant_role = role(Some(owner), false);
        assert!(tenant_role.is_visible_to(owner));
        assert!(tenant_role.is_editable_by(owner));
        assert!(!tenant_role.is_visible_to(other));
        assert!(!tenant_role.is_editable_by(other));
    }

    #[test]
    fn create_role_payload_requires_key_and_name() {
        let payload = CreateRolePayload { key: String::new(), name: "Caixa".into() };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("key"));
    }

    #[test]
    fn whitespace_role_key_and_name_are_blank() {
        let payload = CreateRolePayload { key: "  ".into(), name: " ".into() };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("key"));
        assert!(errors.field_errors().contains_key("name"));

        assert!(UpdateRolePayload { name: "\n".into() }.validate().is_err());
    }
}
