// src/db/finance_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{
        FinancialCategory, FinancialTransaction, FinancialTransactionPayload, FinancialType, TransactionFilter,
    },
};

#[derive(Clone, Default)]
pub struct FinanceRepository;

const TRANSACTION_COLUMNS: &str = r#"
    t.id, t.restaurant_id, t.user_id, t.category_id, c.name AS category_name, t.kind,
    t.amount, t.description, t.transaction_date, t.created_at, t.updated_at
"#;

impl FinanceRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CATEGORIAS (Plano de Contas)
    // =========================================================================

    /// Categorias do restaurante mais as globais (restaurant_id NULL).
    pub async fn list_categories<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        kind: Option<FinancialType>,
    ) -> Result<Vec<FinancialCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, FinancialCategory>(
            r#"
            SELECT * FROM financial_categories
            WHERE (restaurant_id IS NULL OR restaurant_id = $1)
              AND is_active
              AND ($2::financial_type IS NULL OR kind = $2)
            ORDER BY kind ASC, name ASC
            "#,
        )
        .bind(restaurant_id)
        .bind(kind)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    pub async fn find_category<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FinancialCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, FinancialCategory>(
            r#"
            SELECT * FROM financial_categories
            WHERE id = $1 AND (restaurant_id IS NULL OR restaurant_id = $2) AND is_active
            "#,
        )
        .bind(id)
        .bind(restaurant_id)
        .fetch_optional(executor)
        .await?;
        Ok(category)
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        name: &str,
        kind: FinancialType,
    ) -> Result<FinancialCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, FinancialCategory>(
            r#"
            INSERT INTO financial_categories (restaurant_id, name, kind)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(name)
        .bind(kind)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(format!(
                        "Já existe uma categoria financeira com o nome '{}'.",
                        name
                    ));
                }
            }
            e.into()
        })
    }

    // =========================================================================
    //  LANÇAMENTOS
    // =========================================================================

    pub async fn create_transaction<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &FinancialTransactionPayload,
    ) -> Result<FinancialTransaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH t AS (
                INSERT INTO financial_transactions
                    (restaurant_id, user_id, category_id, kind, amount, description, transaction_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {TRANSACTION_COLUMNS}
            FROM t LEFT JOIN financial_categories c ON c.id = t.category_id
            "#
        );
        let transaction = sqlx::query_as::<_, FinancialTransaction>(&sql)
            .bind(restaurant_id)
            .bind(user_id)
            .bind(payload.category_id)
            .bind(payload.kind)
            .bind(payload.amount)
            .bind(payload.description.trim())
            .bind(payload.transaction_date)
            .fetch_one(executor)
            .await?;
        Ok(transaction)
    }

    pub async fn list_transactions<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinancialTransaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM financial_transactions t
            LEFT JOIN financial_categories c ON c.id = t.category_id
            WHERE t.restaurant_id = $1
              AND ($2::financial_type IS NULL OR t.kind = $2)
              AND ($3::uuid IS NULL OR t.category_id = $3)
              AND ($4::date IS NULL OR t.transaction_date >= $4)
              AND ($5::date IS NULL OR t.transaction_date <= $5)
            ORDER BY t.transaction_date DESC, t.created_at DESC
            "#
        );
        let transactions = sqlx::query_as::<_, FinancialTransaction>(&sql)
            .bind(restaurant_id)
            .bind(filter.kind)
            .bind(filter.category_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_all(executor)
            .await?;
        Ok(transactions)
    }

    pub async fn find_transaction<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FinancialTransaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM financial_transactions t
            LEFT JOIN financial_categories c ON c.id = t.category_id
            WHERE t.id = $1 AND t.restaurant_id = $2
            "#
        );
        let transaction = sqlx::query_as::<_, FinancialTransaction>(&sql)
            .bind(id)
            .bind(restaurant_id)
            .fetch_optional(executor)
            .await?;
        Ok(transaction)
    }

    pub async fn delete_transaction<'e, E>(&self, executor: E, restaurant_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM financial_transactions WHERE id = $1 AND restaurant_id = $2")
            .bind(id)
            .bind(restaurant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// (entradas, saídas) no período, datas inclusivas.
    pub async fn period_totals<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Decimal, Decimal), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE kind = 'income'), 0)::numeric,
                COALESCE(SUM(amount) FILTER (WHERE kind = 'expense'), 0)::numeric
            FROM financial_transactions
            WHERE restaurant_id = $1 AND transaction_date BETWEEN $2 AND $3
            "#,
        )
        .bind(restaurant_id)
        .bind(start)
        .bind(end)
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }
}
