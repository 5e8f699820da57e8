//! Settlement arithmetic for a finalized consulta.
//!
//! Prices are kept in the base currency (USD). When an exchange-rate snapshot
//! is present every line also carries its local-currency (VES) amount, computed
//! per line and rounded before summing so that the stored lines always add up
//! to the stored totals.

use crate::enums::Moneda;
use crate::error::{DomainError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monetary amounts are stored with two decimal places.
pub const MONEY_SCALE: u32 = 2;

/// Exchange rates are stored with four decimal places (`NUMERIC(18,4)`).
pub const TASA_SCALE: u32 = 4;

pub fn redondear(valor: Decimal) -> Decimal {
    valor.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Largest rate the `NUMERIC(18,4)` columns hold.
pub fn tasa_maxima() -> Decimal {
    Decimal::new(999_999_999_999_999_999, TASA_SCALE)
}

/// Largest amount the `NUMERIC(18,2)` local-currency columns hold.
pub fn monto_bs_maximo() -> Decimal {
    Decimal::new(999_999_999_999_999_999, MONEY_SCALE)
}

/// Largest amount the `NUMERIC(12,2)` USD columns hold.
pub fn monto_usd_maximo() -> Decimal {
    Decimal::new(999_999_999_999, MONEY_SCALE)
}

/// Validates an exchange rate and rounds it to the stored scale, so the
/// rate used for pricing is the rate that gets persisted.
pub fn normalizar_tasa(tasa: Decimal) -> Result<Decimal> {
    if tasa > tasa_maxima() {
        return Err(DomainError::Validation(format!(
            "exchange rate must not exceed {}",
            tasa_maxima()
        )));
    }
    let tasa = tasa.round_dp_with_strategy(TASA_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if tasa <= Decimal::ZERO {
        return Err(DomainError::Validation(
            "exchange rate must be greater than zero".to_string(),
        ));
    }
    Ok(tasa)
}

fn desbordado(campo: &str) -> DomainError {
    DomainError::Validation(format!("{campo} exceeds the supported amount"))
}

fn acotado(valor: Option<Decimal>, maximo: Decimal, campo: &str) -> Result<Decimal> {
    valor
        .filter(|v| *v <= maximo)
        .ok_or_else(|| desbordado(campo))
}

/// A billable line whose service has already been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineaResuelta {
    pub servicio_id: Uuid,
    pub nombre: String,
    pub precio_unitario_usd: Decimal,
    pub cantidad: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineaLiquidada {
    pub servicio_id: Uuid,
    pub nombre: String,
    pub cantidad: i32,
    pub precio_unitario_usd: Decimal,
    pub subtotal_usd: Decimal,
    pub subtotal_bs: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidacion {
    pub moneda: Moneda,
    pub tasa_cambio: Option<Decimal>,
    pub lineas: Vec<LineaLiquidada>,
    pub total_usd: Decimal,
    pub total_bs: Option<Decimal>,
}

/// Prices every line and totals them against an optional VES-per-USD rate.
pub fn liquidar(
    lineas: &[LineaResuelta],
    tasa: Option<Decimal>,
    moneda: Moneda,
) -> Result<Liquidacion> {
    if lineas.is_empty() {
        return Err(DomainError::Validation(
            "at least one service line is required".to_string(),
        ));
    }

    let tasa = tasa.map(normalizar_tasa).transpose()?;
    if tasa.is_none() && moneda == Moneda::Ves {
        return Err(DomainError::MissingExchangeRate(moneda.to_string()));
    }

    let mut liquidadas = Vec::with_capacity(lineas.len());
    let mut total_usd = Decimal::ZERO;
    let mut total_bs = Decimal::ZERO;

    for linea in lineas {
        if linea.cantidad < 1 {
            return Err(DomainError::Validation(format!(
                "quantity for '{}' must be at least 1",
                linea.nombre
            )));
        }
        if linea.precio_unitario_usd < Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "price for '{}' cannot be negative",
                linea.nombre
            )));
        }

        let subtotal_usd = acotado(
            linea
                .precio_unitario_usd
                .checked_mul(Decimal::from(linea.cantidad))
                .map(redondear),
            monto_usd_maximo(),
            "subtotal_usd",
        )?;
        let subtotal_bs = tasa
            .map(|t| {
                acotado(
                    subtotal_usd.checked_mul(t).map(redondear),
                    monto_bs_maximo(),
                    "subtotal_bs",
                )
            })
            .transpose()?;

        total_usd = acotado(total_usd.checked_add(subtotal_usd), monto_usd_maximo(), "total_usd")?;
        if let Some(bs) = subtotal_bs {
            total_bs = acotado(total_bs.checked_add(bs), monto_bs_maximo(), "total_bs")?;
        }

        liquidadas.push(LineaLiquidada {
            servicio_id: linea.servicio_id,
            nombre: linea.nombre.clone(),
            cantidad: linea.cantidad,
            precio_unitario_usd: linea.precio_unitario_usd,
            subtotal_usd,
            subtotal_bs,
        });
    }

    Ok(Liquidacion {
        moneda,
        tasa_cambio: tasa,
        lineas: liquidadas,
        total_usd,
        total_bs: tasa.map(|_| total_bs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn linea(nombre: &str, precio: &str, cantidad: i32) -> LineaResuelta {
        LineaResuelta {
            servicio_id: Uuid::new_v4(),
            nombre: nombre.to_string(),
            precio_unitario_usd: d(precio),
            cantidad,
        }
    }

    #[test]
    fn totals_with_rate() {
        let lineas = vec![linea("Consulta", "40", 1), linea("Electrocardiograma", "12.50", 2)];
        let liq = liquidar(&lineas, Some(d("36.5")), Moneda::Ves).unwrap();

        assert_eq!(liq.total_usd, d("65.00"));
        assert_eq!(liq.lineas[1].subtotal_usd, d("25.00"));
        assert_eq!(liq.lineas[0].subtotal_bs, Some(d("1460.00")));
        assert_eq!(liq.lineas[1].subtotal_bs, Some(d("912.50")));
        assert_eq!(liq.total_bs, Some(d("2372.50")));
    }

    #[test]
    fn usd_without_rate_has_no_local_amounts() {
        let liq = liquidar(&[linea("Consulta", "30", 1)], None, Moneda::Usd).unwrap();
        assert_eq!(liq.total_usd, d("30"));
        assert_eq!(liq.total_bs, None);
        assert!(liq.lineas.iter().all(|l| l.subtotal_bs.is_none()));
    }

    #[test]
    fn ves_requires_rate() {
        let err = liquidar(&[linea("Consulta", "30", 1)], None, Moneda::Ves).unwrap_err();
        assert_eq!(err, DomainError::MissingExchangeRate("VES".to_string()));
    }

    #[test]
    fn line_rounding_is_half_away_from_zero() {
        // 0.125 * 3 = 0.375 -> 0.38
        let liq = liquidar(&[linea("Insumo", "0.125", 3)], Some(d("1")), Moneda::Usd).unwrap();
        assert_eq!(liq.total_usd, d("0.38"));
        // 0.38 * 10.125 = 3.8475 -> 3.85
        let liq = liquidar(&[linea("Insumo", "0.125", 3)], Some(d("10.125")), Moneda::Usd).unwrap();
        assert_eq!(liq.total_bs, Some(d("3.85")));
    }

    #[test]
    fn local_total_equals_sum_of_lines() {
        let lineas = vec![
            linea("A", "1.333", 1),
            linea("B", "2.667", 1),
            linea("C", "0.005", 1),
        ];
        let liq = liquidar(&lineas, Some(d("35.777")), Moneda::Ves).unwrap();
        let sum: Decimal = liq.lineas.iter().filter_map(|l| l.subtotal_bs).sum();
        assert_eq!(liq.total_bs, Some(sum));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            liquidar(&[], Some(d("1")), Moneda::Usd),
            Err(DomainError::Validation(_))
        ));
        assert!(liquidar(&[linea("A", "10", 0)], None, Moneda::Usd).is_err());
        assert!(liquidar(&[linea("A", "-1", 1)], None, Moneda::Usd).is_err());
        assert!(liquidar(&[linea("A", "10", 1)], Some(d("0")), Moneda::Usd).is_err());
    }

    #[test]
    fn huge_rate_is_rejected_instead_of_overflowing() {
        let err = liquidar(&[linea("Consulta", "40", 1)], Some(Decimal::MAX), Moneda::Ves)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn amounts_beyond_storage_are_rejected() {
        // Rate within bounds, but the local amount no longer fits NUMERIC(18,2).
        let lineas = [linea("Cirugia", "9999999", 1000)];
        let err = liquidar(&lineas, Some(d("99999999999999")), Moneda::Ves).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = liquidar(&[linea("A", "99999999999", i32::MAX)], None, Moneda::Usd)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rate_is_rounded_to_stored_scale_before_pricing() {
        let liq = liquidar(&[linea("Consulta", "40", 1)], Some(d("36.123456")), Moneda::Ves)
            .unwrap();
        assert_eq!(liq.tasa_cambio, Some(d("36.1235")));
        // 40 * 36.1235 = 1444.94, reproducible from the stored rate.
        assert_eq!(liq.lineas[0].subtotal_bs, Some(d("1444.94")));
        assert_eq!(
            redondear(liq.lineas[0].subtotal_usd * d("36.1235")),
            liq.lineas[0].subtotal_bs.unwrap()
        );
    }

    #[test]
    fn rate_normalization_bounds() {
        assert_eq!(normalizar_tasa(d("36.5")).unwrap(), d("36.5"));
        assert!(normalizar_tasa(d("0.00004")).is_err());
        assert!(normalizar_tasa(d("-1")).is_err());
        assert!(normalizar_tasa(tasa_maxima()).is_ok());
        assert!(normalizar_tasa(tasa_maxima() + d("0.0001")).is_err());
    }

    #[test]
    fn free_services_are_allowed() {
        let liq = liquidar(&[linea("Control", "0", 1)], None, Moneda::Usd).unwrap();
        assert_eq!(liq.total_usd, Decimal::ZERO);
    }
}
