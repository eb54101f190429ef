// src/models/goals.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{common::validation::validate_not_blank, models::finance::validate_period};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "goal_metric", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum GoalMetric {
    Revenue,       // Soma das entradas no período
    NetCashFlow,   // Entradas menos saídas no período
    NewCustomers,  // Clientes cadastrados no período
    CustomerSpend, // Gasto acumulado dos clientes que visitaram no período
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "goal_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Achieved,
    Failed,
}

impl GoalStatus {
    /// Atingida vence prazo: uma meta batida depois do fim continua "achieved".
    pub fn evaluate(current: Decimal, target: Decimal, end_date: NaiveDate, today: NaiveDate) -> Self {
        if current >= target {
            GoalStatus::Achieved
        } else if today > end_date {
            GoalStatus::Failed
        } else {
            GoalStatus::Active
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub metric: GoalMetric,
    pub target_value: Decimal,
    pub current_value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Serialize)]
pub struct GoalPage {
    pub goals: Vec<Goal>,
    pub pagination: Pagination,
}

// ---
// Payloads e filtros
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoalPayload {
    #[validate(
        length(max = 120, message = "O nome tem no máximo 120 caracteres."),
        custom(function = "validate_not_blank", message = "O nome da meta é obrigatório.")
    )]
    pub name: String,

    pub description: Option<String>,

    pub metric: GoalMetric,

    #[validate(custom(function = "validate_target"))]
    pub target_value: Decimal,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn validate_target(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO || val.normalize().scale() > 2 || *val >= Decimal::from(1_000_000_000_000i64) {
        let mut err = ValidationError::new("range");
        err.message = Some("O alvo deve ser positivo, com até duas casas decimais.".into());
        return Err(err);
    }
    Ok(())
}

impl GoalPayload {
    pub fn validate_consistency(&self) -> Result<(), ValidationError> {
        validate_period(Some(self.start_date), Some(self.end_date))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalFilter {
    pub status: Option<GoalStatus>,
    pub metric: Option<GoalMetric>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl GoalFilter {
    /// (página, tamanho, offset), com página >= 1 e tamanho em [1, 100].
    pub fn page_window(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, limit, (page - 1) * limit)
    }
}

impl Pagination {
    pub fn new(total_items: i64, page: i64, limit: i64) -> Self {
        Self {
            total_items,
            total_pages: (total_items + limit - 1) / limit,
            current_page: page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn status_follows_target_then_deadline() {
        let end = date("2025-06-30");
        assert_eq!(GoalStatus::evaluate(dec("100"), dec("100"), end, date("2025-06-01")), GoalStatus::Achieved);
        assert_eq!(GoalStatus::evaluate(dec("120"), dec("100"), end, date("2025-07-15")), GoalStatus::Achieved);
        assert_eq!(GoalStatus::evaluate(dec("99.99"), dec("100"), end, date("2025-06-30")), GoalStatus::Active);
        assert_eq!(GoalStatus::evaluate(dec("99.99"), dec("100"), end, date("2025-07-01")), GoalStatus::Failed);
    }

    #[test]
    fn page_window_is_clamped() {
        let filter = GoalFilter { page: Some(0), limit: Some(500), ..Default::default() };
        assert_eq!(filter.page_window(), (1, 100, 0));

        let filter = GoalFilter { page: Some(3), limit: None, ..Default::default() };
        assert_eq!(filter.page_window(), (3, 10, 20));
    }

    #[test]
    fn pagination_rounds_pages_up() {
        let p = Pagination::new(21, 1, 10);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
    }

    #[test]
    fn goal_payload_rejects_reversed_period_and_bad_target() {
        let payload: GoalPayload = serde_json::from_value(json!({
            "name": "Faturamento de março",
            "metric": "revenue",
            "targetValue": 50000,
            "startDate": "2025-03-31",
            "endDate": "2025-03-01"
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.validate_consistency().unwrap_err().code, "InvalidPeriod");

        let payload: GoalPayload = serde_json::from_value(json!({
            "name": "Novos clientes",
            "metric": "newCustomers",
            "targetValue": 0,
            "startDate": "2025-03-01",
            "endDate": "2025-03-31"
        }))
        .unwrap();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("target_value"));
    }
}
