// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

// Colunas de dinheiro são NUMERIC(10, 2)
const MONEY_SCALE: u32 = 2;

fn money_max() -> Decimal {
    Decimal::new(9_999_999_999, MONEY_SCALE)
}

// ---
// Validação Customizada
// ---

/// Rejeita texto vazio ou só com espaços (o `length` do validator conta os espaços).
pub fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("O campo não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

/// Valor monetário: não negativo, no máximo 2 casas e dentro do NUMERIC(10, 2).
pub fn validate_money(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;

    if val.normalize().scale() > MONEY_SCALE {
        let mut err = ValidationError::new("scale");
        err.add_param("max_scale".into(), &MONEY_SCALE);
        err.message = Some("Use no máximo duas casas decimais.".into());
        return Err(err);
    }
    if *val > money_max() {
        let mut err = ValidationError::new("range");
        err.add_param("max".into(), &money_max().to_string());
        err.message = Some("Valor acima do máximo permitido (99.999.999,99).".into());
        return Err(err);
    }
    Ok(())
}

/// Quantidade de estoque estritamente positiva (NUMERIC(14, 3)).
pub fn validate_quantity(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade deve ser maior que zero.".into());
        return Err(err);
    }
    if val.normalize().scale() > 3 || *val >= Decimal::from(100_000_000_000i64) {
        let mut err = ValidationError::new("range");
        err.message = Some("Quantidade fora do formato aceito (até 3 casas decimais).".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn blank_means_only_whitespace() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("\t\n").is_err());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" Bebidas ").is_ok());
    }

    #[test]
    fn money_accepts_two_places_and_trailing_zeros() {
        assert!(validate_money(&dec("0")).is_ok());
        assert!(validate_money(&dec("12.50")).is_ok());
        assert!(validate_money(&dec("12.500")).is_ok());
        assert!(validate_money(&dec("99999999.99")).is_ok());
    }

    #[test]
    fn money_rejects_overflow_extra_places_and_negatives() {
        assert_eq!(validate_money(&dec("100000000")).unwrap_err().code, "range");
        assert_eq!(validate_money(&dec("123456789012.345")).unwrap_err().code, "scale");
        assert_eq!(validate_money(&dec("1.999")).unwrap_err().code, "scale");
        assert_eq!(validate_money(&dec("-0.01")).unwrap_err().code, "range");
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(&dec("0.001")).is_ok());
        assert!(validate_quantity(&dec("0")).is_err());
        assert!(validate_quantity(&dec("-2")).is_err());
        assert!(validate_quantity(&dec("1.0001")).is_err());
    }
}
