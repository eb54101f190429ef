// src/models/customers.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validation::{validate_money, validate_not_blank};

// ---
// Clientes
// ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_spent: Decimal,
    pub visit_count: i32,
    pub last_visit_at: Option<DateTime<Utc>>,
    pub segment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[validate(
        length(max = 120, message = "O nome tem no máximo 120 caracteres."),
        custom(function = "validate_not_blank", message = "O nome do cliente é obrigatório.")
    )]
    pub name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 20, message = "Telefone inválido."))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VisitPayload {
    #[validate(custom(function = "validate_money"))]
    pub amount: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    pub segment_id: Option<Uuid>,
}

// ---
// Segmentos
// ---

/// Critérios de um segmento. Todos os informados precisam valer (E lógico).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SegmentRules {
    pub min_total_spent: Option<Decimal>,
    pub min_visits: Option<i32>,
    pub max_visits: Option<i32>,
    /// Visitou nos últimos N dias
    pub active_within_days: Option<i64>,
    /// Sem visita há pelo menos N dias (ou nunca visitou)
    pub inactive_for_days: Option<i64>,
}

impl SegmentRules {
    pub fn matches(&self, customer: &Customer, now: DateTime<Utc>) -> bool {
        if let Some(min) = self.min_total_spent {
            if customer.total_spent < min {
                return false;
            }
        }
        if let Some(min) = self.min_visits {
            if customer.visit_count < min {
                return false;
            }
        }
        if let Some(max) = self.max_visits {
            if customer.visit_count > max {
                return false;
            }
        }
        if let Some(days) = self.active_within_days {
            match customer.last_visit_at {
                Some(last) if now - last <= Duration::days(days) => {}
                _ => return false,
            }
        }
        if let Some(days) = self.inactive_for_days {
            if let Some(last) = customer.last_visit_at {
                if now - last < Duration::days(days) {
                    return false;
                }
            }
        }
        true
    }

    pub fn validate_rules(&self) -> Result<(), ValidationError> {
        let fail = |code: &'static str, message: &'static str| {
            let mut err = ValidationError::new(code);
            err.message = Some(message.into());
            Err(err)
        };

        if *self == SegmentRules::default() {
            return fail("EmptyRules", "Informe ao menos um critério para o segmento.");
        }
        if self.min_total_spent.is_some_and(|v| v.is_sign_negative() && !v.is_zero())
            || self.min_visits.is_some_and(|v| v < 0)
            || self.max_visits.is_some_and(|v| v < 0)
            || self.active_within_days.is_some_and(|v| v <= 0)
            || self.inactive_for_days.is_some_and(|v| v <= 0)
        {
            return fail("range", "Os critérios não podem ser negativos.");
        }
        if let (Some(min), Some(max)) = (self.min_visits, self.max_visits) {
            if min > max {
                return fail("InvalidVisitRange", "minVisits não pode ser maior que maxVisits.");
            }
        }
        if self.active_within_days.is_some() && self.inactive_for_days.is_some() {
            return fail("ConflictingRecency", "Use activeWithinDays ou inactiveForDays, não os dois.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSegment {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rules: Json<SegmentRules>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPayload {
    #[validate(
        length(max = 120, message = "O nome tem no máximo 120 caracteres."),
        custom(function = "validate_not_blank", message = "O nome do segmento é obrigatório.")
    )]
    pub name: String,

    pub description: Option<String>,

    pub rules: SegmentRules,

    #[serde(default)]
    pub priority: i32,
}

impl SegmentPayload {
    pub fn validate_consistency(&self) -> Result<(), ValidationError> {
        self.rules.validate_rules()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationResult {
    pub processed_count: usize,
    pub assigned_count: usize,
    pub changed_count: usize,
}

/// Primeiro segmento que casa, na ordem recebida (prioridade decrescente).
pub fn pick_segment(segments: &[CustomerSegment], customer: &Customer, now: DateTime<Utc>) -> Option<Uuid> {
    segments
        .iter()
        .find(|segment| segment.rules.matches(customer, now))
        .map(|segment| segment.id)
}

/// Ordem de avaliação: maior prioridade primeiro, empate pelo nome.
pub fn sort_for_evaluation(segments: &mut [CustomerSegment]) {
    segments.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn customer(total_spent: &str, visits: i32, days_since_visit: Option<i64>, now: DateTime<Utc>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: "Ana".into(),
            email: None,
            phone: None,
            total_spent: Decimal::from_str(total_spent).unwrap(),
            visit_count: visits,
            last_visit_at: days_since_visit.map(|d| now - Duration::days(d)),
            segment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn segment(name: &str, priority: i32, rules: SegmentRules) -> CustomerSegment {
        CustomerSegment {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            rules: Json(rules),
            priority,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn all_criteria_must_hold() {
        let now = Utc::now();
        let vip = SegmentRules {
            min_total_spent: Some(Decimal::from(500)),
            min_visits: Some(5),
            active_within_days: Some(30),
            ..Default::default()
        };
        assert!(vip.matches(&customer("800", 6, Some(3), now), now));
        assert!(!vip.matches(&customer("800", 4, Some(3), now), now));
        assert!(!vip.matches(&customer("800", 6, Some(45), now), now));
        assert!(!vip.matches(&customer("800", 6, None, now), now));
    }

    #[test]
    fn never_visited_counts_as_inactive() {
        let now = Utc::now();
        let dormant = SegmentRules { inactive_for_days: Some(60), ..Default::default() };
        assert!(dormant.matches(&customer("0", 0, None, now), now));
        assert!(dormant.matches(&customer("90", 2, Some(61), now), now));
        assert!(!dormant.matches(&customer("90", 2, Some(10), now), now));
    }

    #[test]
    fn highest_priority_match_wins() {
        let now = Utc::now();
        let mut segments = vec![
            segment("Frequentes", 1, SegmentRules { min_visits: Some(3), ..Default::default() }),
            segment("VIP", 10, SegmentRules { min_total_spent: Some(Decimal::from(1000)), ..Default::default() }),
        ];
        sort_for_evaluation(&mut segments);
        let vip_id = segments[0].id;
        let frequent_id = segments[1].id;

        assert_eq!(pick_segment(&segments, &customer("1500", 4, Some(1), now), now), Some(vip_id));
        assert_eq!(pick_segment(&segments, &customer("100", 4, Some(1), now), now), Some(frequent_id));
        assert_eq!(pick_segment(&segments, &customer("100", 1, Some(1), now), now), None);
    }

    #[test]
    fn rules_are_checked_for_consistency() {
        assert_eq!(SegmentRules::default().validate_rules().unwrap_err().code, "EmptyRules");

        let inverted = SegmentRules { min_visits: Some(5), max_visits: Some(2), ..Default::default() };
        assert_eq!(inverted.validate_rules().unwrap_err().code, "InvalidVisitRange");

        let both = SegmentRules { active_within_days: Some(7), inactive_for_days: Some(30), ..Default::default() };
        assert_eq!(both.validate_rules().unwrap_err().code, "ConflictingRecency");
    }

    #[test]
    fn unknown_rule_fields_are_rejected() {
        let result: Result<SegmentPayload, _> = serde_json::from_value(json!({
            "name": "VIP",
            "rules": { "minSpent": 100 }
        }));
        assert!(result.is_err());
    }
}
