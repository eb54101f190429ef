// src/services/customer_service.rs

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped_tx, error::AppError},
    db::{AuditRepository, CustomerRepository},
    models::customers::{
        pick_segment, sort_for_evaluation, Customer, CustomerPayload, CustomerSegment, SegmentPayload,
        SegmentationResult,
    },
};

const CUSTOMER: &str = "Cliente";
const SEGMENT: &str = "Segmento";

#[derive(Clone)]
pub struct CustomerService {
    pool: PgPool,
    repo: CustomerRepository,
    audit_repo: AuditRepository,
}

impl CustomerService {
    pub fn new(pool: PgPool, repo: CustomerRepository, audit_repo: AuditRepository) -> Self {
        Self { pool, repo, audit_repo }
    }

    // ---
    // Clientes
    // ---

    pub async fn list_customers(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        segment_id: Option<Uuid>,
    ) -> Result<Vec<Customer>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let customers = self.repo.list_customers(&mut *tx, restaurant_id, segment_id).await?;
        tx.commit().await?;
        Ok(customers)
    }

    pub async fn get_customer(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<Customer, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let customer = self
            .repo
            .find_customer(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(CUSTOMER))?;
        tx.commit().await?;
        Ok(customer)
    }

    pub async fn create_customer(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Customer, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let customer = self.repo.create_customer(&mut *tx, restaurant_id, payload).await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "customer.create",
                "customer",
                json!({ "id": customer.id, "name": customer.name }),
            )
            .await?;

        tx.commit().await?;
        Ok(customer)
    }

    pub async fn record_visit(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        amount: rust_decimal::Decimal,
    ) -> Result<Customer, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let customer = self
            .repo
            .record_visit(&mut *tx, restaurant_id, id, amount)
            .await?
            .ok_or(AppError::ResourceNotFound(CUSTOMER))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "customer.visit",
                "customer",
                json!({ "id": id, "amount": amount, "visitCount": customer.visit_count }),
            )
            .await?;

        tx.commit().await?;
        Ok(customer)
    }

    // ---
    // Segmentos
    // ---

    pub async fn list_segments(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<Vec<CustomerSegment>, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let segments = self.repo.list_segments(&mut *tx, restaurant_id).await?;
        tx.commit().await?;
        Ok(segments)
    }

    pub async fn get_segment(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<CustomerSegment, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;
        let segment = self
            .repo
            .find_segment(&mut *tx, restaurant_id, id)
            .await?
            .ok_or(AppError::ResourceNotFound(SEGMENT))?;
        tx.commit().await?;
        Ok(segment)
    }

    pub async fn create_segment(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        payload: &SegmentPayload,
    ) -> Result<CustomerSegment, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let segment = self.repo.create_segment(&mut *tx, restaurant_id, payload).await?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "customer.segment.create",
                "customer_segment",
                json!({ "id": segment.id, "name": segment.name, "rules": payload.rules }),
            )
            .await?;

        tx.commit().await?;
        Ok(segment)
    }

    pub async fn update_segment(
        &self,
        restaurant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &SegmentPayload,
    ) -> Result<CustomerSegment, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let segment = self
            .repo
            .update_segment(&mut *tx, restaurant_id, id, payload)
            .await?
            .ok_or(AppError::ResourceNotFound(SEGMENT))?;
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "customer.segment.update",
                "customer_segment",
                json!({ "id": id, "name": segment.name, "rules": payload.rules, "priority": segment.priority }),
            )
            .await?;

        tx.commit().await?;
        Ok(segment)
    }

    pub async fn delete_segment(&self, restaurant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        if self.repo.delete_segment(&mut *tx, restaurant_id, id).await? == 0 {
            return Err(AppError::ResourceNotFound(SEGMENT));
        }
        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "customer.segment.delete",
                "customer_segment",
                json!({ "id": id }),
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Reclassifica todos os clientes do restaurante pelo primeiro segmento
    /// que casar, em ordem de prioridade. Quem não casa com nenhum fica sem segmento.
    pub async fn apply_segmentation(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<SegmentationResult, AppError> {
        let mut tx = begin_scoped_tx(&self.pool, restaurant_id, user_id).await?;

        let mut segments = self.repo.list_segments(&mut *tx, restaurant_id).await?;
        sort_for_evaluation(&mut segments);
        let customers = self.repo.list_customers(&mut *tx, restaurant_id, None).await?;

        let now = Utc::now();
        let customer_ids: Vec<Uuid> = customers.iter().map(|c| c.id).collect();
        let segment_ids: Vec<Option<Uuid>> = customers
            .iter()
            .map(|c| pick_segment(&segments, c, now))
            .collect();

        let changed = self
            .repo
            .assign_segments(&mut *tx, restaurant_id, &customer_ids, &segment_ids)
            .await?;

        let result = SegmentationResult {
            processed_count: customers.len(),
            assigned_count: segment_ids.iter().filter(|s| s.is_some()).count(),
            changed_count: changed as usize,
        };

        self.audit_repo
            .log(
                &mut *tx,
                user_id,
                Some(restaurant_id),
                "customer.segmentation.apply",
                "customer_segment",
                json!({
                    "processed": result.processed_count,
                    "assigned": result.assigned_count,
                    "changed": result.changed_count,
                }),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(%restaurant_id, processed = result.processed_count, changed = result.changed_count, "Segmentação aplicada");
        Ok(result)
    }
}
