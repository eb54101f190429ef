// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: a "chave" do restaurante para o banco
// ---
/// Abre uma transação e define as variáveis lidas pelas políticas de RLS.
/// `set_config(..., true)` vale só até o fim da transação, então a conexão
/// volta limpa para a pool no commit ou no rollback.
pub async fn begin_scoped_tx(
    pool: &PgPool,
    restaurant_id: Uuid,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.restaurant_id', $1, true)")
        .bind(restaurant_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
