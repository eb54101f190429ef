// src/models/permission.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{common::validation::validate_not_blank, models::entitlement::EntitlementStatus};

/// Motivo da decisão, exposto para a tela de permissões e para os logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Superadmin,
    EntitlementLocked,
    Owner,
    OverrideAllow,
    OverrideDeny,
    RoleAllow,
    RoleDeny,
    DefaultDeny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    pub allowed: bool,
    // true quando a negação vem do entitlement (plano), não do papel do usuário
    pub locked: bool,
    pub reason: DecisionReason,
}

impl PermissionDecision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self { allowed: true, locked: false, reason }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, locked: false, reason }
    }

    pub fn locked() -> Self {
        Self { allowed: false, locked: true, reason: DecisionReason::EntitlementLocked }
    }
}

// ---
// Snapshot: a árvore do catálogo com a decisão de cada (funcionalidade, ação)
// ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionView {
    pub id: i16,
    pub key: String,
    pub allowed: bool,
    pub locked: bool,
    pub reason: DecisionReason,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureView {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub status: Option<EntitlementStatus>,
    pub locked: bool,
    pub hidden: bool,
    pub actions: Vec<ActionView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmoduleView {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub status: Option<EntitlementStatus>,
    pub locked: bool,
    pub hidden: bool,
    pub features: Vec<FeatureView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub status: Option<EntitlementStatus>,
    pub locked: bool,
    pub hidden: bool,
    pub submodules: Vec<SubmoduleView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSnapshot {
    pub restaurant_id: Uuid,
    pub user_id: Uuid,
    pub perm_version: i32,
    pub is_superadmin: bool,
    pub is_owner: bool,
    pub modules: Vec<ModuleView>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckPermissionPayload {
    #[validate(custom(function = "validate_not_blank", message = "O campo 'featureKey' é obrigatório."))]
    pub feature_key: String,

    #[validate(custom(function = "validate_not_blank", message = "O campo 'actionKey' é obrigatório."))]
    pub action_key: String,
}
