// src/models/entitlement.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_not_blank;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entitlement_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntitlementStatus {
    Active,
    Locked,
    Hidden,
    Trial,
}

impl EntitlementStatus {
    /// Só `active` libera o nó do catálogo; ausência de linha conta como bloqueado.
    pub fn grants_access(status: Option<Self>) -> bool {
        matches!(status, Some(EntitlementStatus::Active))
    }

    pub fn is_hidden(status: Option<Self>) -> bool {
        matches!(status, Some(EntitlementStatus::Hidden))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entitlement_entity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Module,
    Submodule,
    Feature,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Module => "module",
            EntityType::Submodule => "submodule",
            EntityType::Feature => "feature",
        }
    }
}

// O que sai do banco (Tabela restaurant_entitlements)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub restaurant_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub status: EntitlementStatus,
    pub source: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Resultado do upsert de um entitlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementInput {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub status: EntitlementStatus,

    #[validate(custom(function = "validate_not_blank", message = "A origem (source) é obrigatória."))]
    pub source: String,

    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetEntitlementPayload {
    pub restaurant_id: Uuid,

    #[serde(flatten)]
    #[validate(nested)]
    pub entitlement: EntitlementInput,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkEntitlementsPayload {
    pub restaurant_id: Uuid,

    #[validate(length(min = 1, message = "Informe ao menos um entitlement."), nested)]
    pub entitlements: Vec<EntitlementInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveEntitlementPayload {
    pub restaurant_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkEntitlementsResult {
    pub created_count: usize,
    pub updated_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_active_grants_access() {
        assert!(EntitlementStatus::grants_access(Some(EntitlementStatus::Active)));
        assert!(!EntitlementStatus::grants_access(Some(EntitlementStatus::Trial)));
        assert!(!EntitlementStatus::grants_access(Some(EntitlementStatus::Locked)));
        assert!(!EntitlementStatus::grants_access(Some(EntitlementStatus::Hidden)));
        assert!(!EntitlementStatus::grants_access(None));
    }

    #[test]
    fn bulk_payload_rejects_empty_list_and_blank_source() {
        let empty: BulkEntitlementsPayload = serde_json::from_value(json!({
            "restaurantId": Uuid::new_v4(),
            "entitlements": []
        }))
        .unwrap();
        assert!(empty.validate().is_err());

        let blank_source: BulkEntitlementsPayload = serde_json::from_value(json!({
            "restaurantId": Uuid::new_v4(),
            "entitlements": [{
                "entityType": "module",
                "entityId": Uuid::new_v4(),
                "status": "active",
                "source": ""
            }]
        }))
        .unwrap();
        assert!(blank_source.validate().is_err());
    }

    #[test]
    fn bulk_payload_with_entries_is_valid() {
        let payload: BulkEntitlementsPayload = serde_json::from_value(json!({
            "restaurantId": Uuid::new_v4(),
            "entitlements": [
                { "entityType": "module", "entityId": Uuid::new_v4(), "status": "active", "source": "billing" },
                { "entityType": "feature", "entityId": Uuid::new_v4(), "status": "hidden", "source": "manual" }
            ]
        }))
        .unwrap();
        assert!(payload.validate().is_ok());

        // A lista volta no parâmetro do erro de tamanho
        let echoed = serde_json::to_value(&payload.entitlements[0]).unwrap();
        assert_eq!(echoed["entityType"], "module");
    }

    #[test]
    fn whitespace_source_is_blank() {
        let payload: SetEntitlementPayload = serde_json::from_value(json!({
            "restaurantId": Uuid::new_v4(),
            "entityType": "module",
            "entityId": Uuid::new_v4(),
            "status": "active",
            "source": "   "
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn set_payload_reads_flattened_entitlement() {
        let payload: SetEntitlementPayload = serde_json::from_value(json!({
            "restaurantId": Uuid::new_v4(),
            "entityType": "feature",
            "entityId": Uuid::new_v4(),
            "status": "trial",
            "source": "billing"
        }))
        .unwrap();
        assert_eq!(payload.entitlement.entity_type, EntityType::Feature);
        assert_eq!(payload.entitlement.status, EntitlementStatus::Trial);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn unknown_status_is_rejected_at_deserialization() {
        let result: Result<EntitlementInput, _> = serde_json::from_value(json!({
            "entityType": "module",
            "entityId": Uuid::new_v4(),
            "status": "enabled",
            "source": "manual"
        }));
        assert!(result.is_err());
    }
}
