// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Restaurante não encontrado")]
    RestaurantNotFound,

    #[error("Cargo não encontrado")]
    RoleNotFound,

    #[error("{0} não encontrado(a)")]
    ResourceNotFound(&'static str),

    #[error("Funcionalidade desconhecida: {0}")]
    UnknownFeature(String),

    #[error("Ação desconhecida: {0}")]
    UnknownAction(String),

    #[error("Cabeçalho X-Restaurant-ID ausente ou inválido")]
    MissingRestaurantContext,

    #[error("Usuário não pertence ao restaurante")]
    NotRestaurantMember,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Sem permissão '{action}' em '{feature}'")]
    PermissionDenied { feature: String, action: String },

    #[error("Funcionalidade '{0}' bloqueada pelo plano")]
    FeatureLocked(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro "pronto para o cliente": status + mensagem traduzida + detalhes
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Erros que chegam sem passar por um handler (middlewares) usam o idioma padrão
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error(&Locale::default())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::MissingRestaurantContext => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::FeatureLocked(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::NotRestaurantMember
            | AppError::Forbidden(_)
            | AppError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AppError::UserNotFound
            | AppError::RestaurantNotFound
            | AppError::RoleNotFound
            | AppError::ResourceNotFound(_)
            | AppError::UnknownFeature(_)
            | AppError::UnknownAction(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists | AppError::UniqueConstraintViolation(_) => {
                StatusCode::CONFLICT
            }
            AppError::DatabaseError(e) => match e.as_database_error() {
                Some(db_err) if db_err.is_unique_violation() => StatusCode::CONFLICT,
                Some(db_err) if db_err.is_foreign_key_violation() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro de domínio na resposta HTTP, no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        let en = locale.is_english();

        if let AppError::ValidationError(errors) = self {
            let mut details = serde_json::Map::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(m) => m.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                details.insert(field.to_string(), json!(messages));
            }
            let error = if en {
                "One or more fields are invalid."
            } else {
                "Um ou mais campos são inválidos."
            };
            return ApiError { status, error: error.to_string(), details: Some(Value::Object(details)) };
        }

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada; o cliente só recebe a genérica.
            tracing::error!("Erro Interno do Servidor: {}", self);
            let error = if en { "An unexpected error occurred." } else { "Ocorreu um erro inesperado." };
            return ApiError { status, error: error.to_string(), details: None };
        }

        ApiError { status, error: self.message(en), details: None }
    }

    fn message(&self, en: bool) -> String {
        match (self, en) {
            (AppError::BadRequest(msg), _) => msg.clone(),
            (AppError::EmailAlreadyExists, false) => "Este e-mail já está em uso.".into(),
            (AppError::EmailAlreadyExists, true) => "This e-mail is already in use.".into(),
            (AppError::InvalidCredentials, false) => "E-mail ou senha inválidos.".into(),
            (AppError::InvalidCredentials, true) => "Invalid e-mail or password.".into(),
            (AppError::InvalidToken, false) => "Token de autenticação inválido ou ausente.".into(),
            (AppError::InvalidToken, true) => "Missing or invalid authentication token.".into(),
            (AppError::UserNotFound, false) => "Usuário não encontrado.".into(),
            (AppError::UserNotFound, true) => "User not found.".into(),
            (AppError::RestaurantNotFound, false) => "Restaurante não encontrado.".into(),
            (AppError::RestaurantNotFound, true) => "Restaurant not found.".into(),
            (AppError::RoleNotFound, false) => "Cargo não encontrado.".into(),
            (AppError::RoleNotFound, true) => "Role not found.".into(),
            (AppError::ResourceNotFound(what), false) => format!("{} não encontrado(a).", what),
            (AppError::ResourceNotFound(what), true) => format!("{} not found.", what),
            (AppError::UnknownFeature(key), false) => format!("Funcionalidade '{}' não existe no catálogo.", key),
            (AppError::UnknownFeature(key), true) => format!("Feature '{}' does not exist in the catalog.", key),
            (AppError::UnknownAction(key), false) => format!("Ação '{}' não existe no catálogo.", key),
            (AppError::UnknownAction(key), true) => format!("Action '{}' does not exist in the catalog.", key),
            (AppError::MissingRestaurantContext, false) => {
                "O cabeçalho X-Restaurant-ID é obrigatório e deve ser um UUID.".into()
            }
            (AppError::MissingRestaurantContext, true) => {
                "The X-Restaurant-ID header is required and must be a UUID.".into()
            }
            (AppError::NotRestaurantMember, false) => "Você não tem acesso a este restaurante.".into(),
            (AppError::NotRestaurantMember, true) => "You do not have access to this restaurant.".into(),
            (AppError::Forbidden(msg), _) => msg.clone(),
            (AppError::PermissionDenied { feature, action }, false) => format!(
                "Você precisa da permissão '{}' em '{}' para realizar esta ação.",
                action, feature
            ),
            (AppError::PermissionDenied { feature, action }, true) => format!(
                "You need the '{}' permission on '{}' to perform this action.",
                action, feature
            ),
            (AppError::FeatureLocked(feature), false) => {
                format!("A funcionalidade '{}' não está liberada no seu plano.", feature)
            }
            (AppError::FeatureLocked(feature), true) => {
                format!("The feature '{}' is not enabled for your plan.", feature)
            }
            (AppError::UniqueConstraintViolation(msg), _) => msg.clone(),
            (AppError::DatabaseError(_), false) if self.status() == StatusCode::CONFLICT => {
                "Registro duplicado.".into()
            }
            (AppError::DatabaseError(_), true) if self.status() == StatusCode::CONFLICT => {
                "Duplicate record.".into()
            }
            (AppError::DatabaseError(_), false) => "Referência inválida a um registro inexistente.".into(),
            (AppError::DatabaseError(_), true) => "Invalid reference to a missing record.".into(),
            (other, _) => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> Locale {
        Locale("pt".into())
    }

    fn en() -> Locale {
        Locale("en".into())
    }

    #[test]
    fn maps_domain_errors_to_http_status() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::RoleNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::UnknownFeature("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::FeatureLocked("x".into()).status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            AppError::PermissionDenied { feature: "f".into(), action: "read".into() }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::UniqueConstraintViolation("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::MissingRestaurantContext.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unexpected_errors_hide_details_from_client() {
        let err = AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2"));
        let api = err.to_api_error(&pt());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("hunter2"));

        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut).to_api_error(&en());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
    }

    #[test]
    fn messages_follow_the_locale() {
        let denied = AppError::PermissionDenied {
            feature: "erp:menu:addons".into(),
            action: "delete".into(),
        };
        assert!(denied.to_api_error(&pt()).error.starts_with("Você precisa"));
        assert!(denied.to_api_error(&en()).error.starts_with("You need"));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut err = validator::ValidationError::new("length");
        err.message = Some("O nome é obrigatório.".into());
        errors.add("name", err);

        let api = AppError::ValidationError(errors).to_api_error(&pt());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert_eq!(details["name"][0], "O nome é obrigatório.");
    }
}
