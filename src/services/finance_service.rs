// src/services/finance_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped_tx, error::AppError},
    db::{AuditRepository, FinanceRepository},
    models::finance::{
        CashFlowReport, FinancialCategory, FinancialCategoryPayload, FinancialTransaction,
        FinancialTransactionPayload, FinancialType, TransactionFilter,
    },
};

const CATEGORY: &str = "Categoria financeira";
const TRANSACTION: &str = "Lançamento";

#[derive(Clone)]
pub struct FinanceService {
    pool: PgPool,
    repo: FinanceRepository,
    audit_repo: AuditRepository,
}

impl FinanceService {
    pub fn new(pool: PgPool, repo: FinanceRepository, audit_repo: AuditRepository) -> Self {
        Self { pool, repo, audit_repo }
    }

    pub async fn list_categories(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        kind: Option<FinancialType>,
    ) -> Result<Vec<FinancialCategory>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let categories = self.repo.list_categories(&mut *tx, restaurant_id, kind).await?;
        tx.commit().await?;
        Ok(categories)
    }

    pub async fn create_category(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &FinancialCategoryPayload,
    ) -> Result<FinancialCategory, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let category = self
            .repo
            .create_category(&mut *tx, restaurant_id, payload.name.trim(), payload.kind)
            .await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "financial.category.create",
                "financial_category",
                json!({ "id": category.id, "name": category.name, "kind": category.kind }),
            )
            .await?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn create_transaction(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &FinancialTransactionPayload,
    ) -> Result<FinancialTransaction, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        // Categoria de outro restaurante é tratada como inexistente
        if let Some(category_id) = payload.category_id {
            let category = self
                .repo
                .find_category(&mut *tx, restaurant_id, category_id)
                .await?
                .ok_or(AppError::ResourceNotFound(CATEGORY))?;
            if category.kind != payload.kind {
                return Err(AppError::BadRequest(
                    "O tipo da categoria não corresponde ao tipo do lançamento.".into(),
                ));
            }
        }

        let transaction = self
            .repo
            .create_transaction(&mut *tx, restaurant_id, user_id, payload)
            .await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "financial.transaction.create",
                "financial_transaction",
                json!({
                    "id": transaction.id,
                    "kind": transaction.kind,
                    "amount": transaction.amount,
                    "date": transaction.transaction_date,
                }),
            )
            .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    pub async fn list_transactions(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinancialTransaction>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let transactions = self.repo.list_transactions(&mut *tx, restaurant_id, filter).await?;
        tx.commit().await?;
        Ok(transactions)
    }

    pub async fn get_transaction(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<FinancialTransaction, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let transaction = self
            .repo
            .find_transaction(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(TRANSACTION))?;
        tx.commit().await?;
        Ok(transaction)
    }

    pub async fn delete_transaction(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        if self.repo.delete_transaction(&mut *tx, restaurant_id, id).await? == 0 {
            return Err(AppError::ResourceNotFound(TRANSACTION));
        }
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "financial.transaction.delete",
                "financial_transaction",
                json!({ "id": id }),
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn cash_flow(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<CashFlowReport, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let (income, expense) = self.repo.period_totals(&mut *tx, restaurant_id, start, end).await?;
        tx.commit().await?;
        Ok(CashFlowReport::new(start, end, income, expense))
    }
}
