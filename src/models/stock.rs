// src/models/stock.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validation::{validate_money, validate_not_blank, validate_not_negative, validate_quantity};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stock_item_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StockItemKind {
    Product,
    Ingredient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stock_movement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StockMovementType {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stock_movement_reason", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum StockMovementReason {
    InitialStock,
    Purchase,
    Sale,
    Return,
    Spoilage,
    Correction,
}

impl StockMovementReason {
    /// Correção vale nos dois sentidos; os demais motivos têm sentido fixo.
    pub fn allows(self, movement_type: StockMovementType) -> bool {
        use StockMovementReason::*;
        match self {
            Correction => true,
            InitialStock | Purchase | Return => movement_type == StockMovementType::Entry,
            Sale | Spoilage => movement_type == StockMovementType::Exit,
        }
    }
}

// --- Tabelas ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub kind: StockItemKind,
    pub name: String,
    pub unit_of_measure: String,
    pub current_stock: Decimal,
    pub min_stock_level: Option<Decimal>,
    pub average_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    pub fn is_low_stock(&self) -> bool {
        matches!(self.min_stock_level, Some(min) if self.current_stock <= min)
    }
}

// Histórico (livro-razão) com o nome do item, para as telas
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub movement_type: StockMovementType,
    pub reason: StockMovementReason,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub stock_after: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDashboard {
    pub total_items: i64,
    pub low_stock_items: i64,
    pub recent_movements: Vec<StockMovement>,
}

// ---
// Cálculos
// ---

/// Novo saldo depois da movimentação; `None` se a saída deixaria o estoque negativo.
pub fn apply_movement(current: Decimal, movement_type: StockMovementType, quantity: Decimal) -> Option<Decimal> {
    let next = match movement_type {
        StockMovementType::Entry => current + quantity,
        StockMovementType::Exit => current - quantity,
    };
    (next >= Decimal::ZERO).then_some(next)
}

/// Custo médio ponderado após uma entrada.
pub fn new_average_cost(
    current_qty: Decimal,
    current_avg: Decimal,
    incoming_qty: Decimal,
    incoming_cost: Decimal,
) -> Decimal {
    let new_total_qty = current_qty + incoming_qty;
    if new_total_qty <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let total_value = current_qty * current_avg + incoming_qty * incoming_cost;
    (total_value / new_total_qty).round_dp(4)
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockItemPayload {
    pub kind: StockItemKind,

    #[validate(
        length(max = 120, message = "O nome tem no máximo 120 caracteres."),
        custom(function = "validate_not_blank", message = "O nome do item é obrigatório.")
    )]
    pub name: String,

    #[validate(custom(function = "validate_not_blank", message = "A unidade de medida é obrigatória."))]
    pub unit_of_measure: String,

    #[validate(custom(function = "validate_not_negative"))]
    pub min_stock_level: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementPayload {
    pub item_id: Uuid,
    pub movement_type: StockMovementType,
    pub reason: StockMovementReason,

    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_money"))]
    pub unit_cost: Option<Decimal>,

    #[validate(length(max = 500, message = "As observações têm no máximo 500 caracteres."))]
    pub notes: Option<String>,
}

impl StockMovementPayload {
    pub fn validate_consistency(&self) -> Result<(), ValidationError> {
        if !self.reason.allows(self.movement_type) {
            let mut err = ValidationError::new("ReasonDoesNotMatchType");
            err.message = Some("O motivo não combina com o tipo da movimentação.".into());
            return Err(err);
        }
        // Custo só faz sentido em entrada
        if self.unit_cost.is_some() && self.movement_type == StockMovementType::Exit {
            let mut err = ValidationError::new("CostOnExit");
            err.message = Some("Custo unitário só é aceito em entradas.".into());
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn exit_cannot_drive_stock_negative() {
        assert_eq!(apply_movement(dec("5"), StockMovementType::Exit, dec("5")), Some(Decimal::ZERO));
        assert_eq!(apply_movement(dec("5"), StockMovementType::Exit, dec("5.001")), None);
        assert_eq!(apply_movement(dec("0"), StockMovementType::Entry, dec("2.5")), Some(dec("2.5")));
    }

    #[test]
    fn average_cost_is_weighted_by_quantity() {
        // 10 un a 2,00 + 30 un a 4,00 = 3,50
        assert_eq!(new_average_cost(dec("10"), dec("2"), dec("30"), dec("4")), dec("3.5"));
        assert_eq!(new_average_cost(Decimal::ZERO, Decimal::ZERO, dec("3"), dec("1.99")), dec("1.99"));
        assert_eq!(new_average_cost(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, dec("9")), Decimal::ZERO);
    }

    #[test]
    fn reasons_have_a_direction() {
        assert!(StockMovementReason::Purchase.allows(StockMovementType::Entry));
        assert!(!StockMovementReason::Purchase.allows(StockMovementType::Exit));
        assert!(StockMovementReason::Spoilage.allows(StockMovementType::Exit));
        assert!(StockMovementReason::Correction.allows(StockMovementType::Exit));
        assert!(StockMovementReason::Correction.allows(StockMovementType::Entry));
    }

    #[test]
    fn movement_payload_checks_reason_and_cost() {
        let sale_as_entry: StockMovementPayload = serde_json::from_value(json!({
            "itemId": Uuid::new_v4(),
            "movementType": "entry",
            "reason": "SALE",
            "quantity": 1
        }))
        .unwrap();
        assert!(sale_as_entry.validate().is_ok());
        assert_eq!(sale_as_entry.validate_consistency().unwrap_err().code, "ReasonDoesNotMatchType");

        let costly_exit: StockMovementPayload = serde_json::from_value(json!({
            "itemId": Uuid::new_v4(),
            "movementType": "exit",
            "reason": "SPOILAGE",
            "quantity": 1,
            "unitCost": 3.5
        }))
        .unwrap();
        assert_eq!(costly_exit.validate_consistency().unwrap_err().code, "CostOnExit");
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let payload: StockMovementPayload = serde_json::from_value(json!({
            "itemId": Uuid::new_v4(),
            "movementType": "entry",
            "reason": "PURCHASE",
            "quantity": 0
        }))
        .unwrap();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("quantity"));
    }

    #[test]
    fn low_stock_needs_a_threshold() {
        let mut item = StockItem {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            kind: StockItemKind::Ingredient,
            name: "Farinha".into(),
            unit_of_measure: "kg".into(),
            current_stock: dec("2"),
            min_stock_level: None,
            average_cost: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!item.is_low_stock());
        item.min_stock_level = Some(dec("2"));
        assert!(item.is_low_stock());
    }
}
