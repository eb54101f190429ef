// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validation::{validate_money, validate_not_blank};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "financial_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FinancialType {
    Income,  // Entrada
    Expense, // Saída
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinancialCategory {
    pub id: Uuid,
    // NULL para categorias globais
    pub restaurant_id: Option<Uuid>,
    pub name: String,
    pub kind: FinancialType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTransaction {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub kind: FinancialType,
    pub amount: Decimal,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Totais de entradas e saídas num período (fluxo de caixa).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_cash_flow: Decimal,
}

impl CashFlowReport {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, total_income: Decimal, total_expense: Decimal) -> Self {
        Self {
            start_date,
            end_date,
            total_income,
            total_expense,
            net_cash_flow: total_income - total_expense,
        }
    }
}

// ---
// Payloads e filtros
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinancialCategoryPayload {
    #[validate(
        length(max = 120, message = "O nome tem no máximo 120 caracteres."),
        custom(function = "validate_not_blank", message = "O nome da categoria é obrigatório.")
    )]
    pub name: String,

    pub kind: FinancialType,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTransactionPayload {
    pub kind: FinancialType,

    #[validate(custom(function = "validate_money"), custom(function = "validate_positive_amount"))]
    pub amount: Decimal,

    #[validate(
        length(max = 255, message = "A descrição tem no máximo 255 caracteres."),
        custom(function = "validate_not_blank", message = "A descrição é obrigatória.")
    )]
    pub description: String,

    pub category_id: Option<Uuid>,

    pub transaction_date: NaiveDate,
}

fn validate_positive_amount(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_zero() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilter {
    pub kind: Option<FinancialType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub kind: Option<FinancialType>,
    pub category_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn validate_consistency(&self) -> Result<(), ValidationError> {
        validate_period(self.start_date, self.end_date)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CashFlowQuery {
    /// O relatório exige as duas datas, em ordem.
    pub fn period(&self) -> Result<(NaiveDate, NaiveDate), ValidationError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                validate_period(Some(start), Some(end))?;
                Ok((start, end))
            }
            _ => {
                let mut err = ValidationError::new("required");
                err.message = Some("Informe startDate e endDate.".into());
                Err(err)
            }
        }
    }
}

pub fn validate_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            let mut err = ValidationError::new("InvalidPeriod");
            err.message = Some("A data final não pode ser anterior à inicial.".into());
            return Err(err);
        }
    }
    Ok(())
}
