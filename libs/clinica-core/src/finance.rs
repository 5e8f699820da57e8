//! Finance report aggregation over finalized consultas.

use crate::enums::{EstadoPago, MetodoPago, Moneda};
use crate::error::{DomainError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltroFinanzas {
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub moneda: Option<Moneda>,
    pub medico_id: Option<Uuid>,
    pub especialidad_id: Option<Uuid>,
    pub estado_pago: Option<EstadoPago>,
}

impl FiltroFinanzas {
    pub fn validate(&self) -> Result<()> {
        if let (Some(desde), Some(hasta)) = (self.desde, self.hasta) {
            if desde > hasta {
                return Err(DomainError::Validation(format!(
                    "'desde' ({desde}) must not be after 'hasta' ({hasta})"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, fila: &FilaFinanzas) -> bool {
        let fecha = fila.fecha.date_naive();
        self.desde.map_or(true, |d| fecha >= d)
            && self.hasta.map_or(true, |h| fecha <= h)
            && self.moneda.map_or(true, |m| fila.moneda == m)
            && self.medico_id.map_or(true, |id| fila.medico_id == id)
            && self
                .especialidad_id
                .map_or(true, |id| fila.especialidad_id == Some(id))
            && self.estado_pago.map_or(true, |e| fila.estado_pago == e)
    }
}

/// One finalized consulta as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilaFinanzas {
    pub consulta_id: Uuid,
    pub fecha: DateTime<Utc>,
    pub paciente: String,
    pub paciente_cedula: String,
    pub medico_id: Uuid,
    pub medico: String,
    pub especialidad_id: Option<Uuid>,
    pub especialidad: Option<String>,
    pub moneda: Moneda,
    pub metodo_pago: Option<MetodoPago>,
    pub estado_pago: EstadoPago,
    pub tasa_cambio: Option<Decimal>,
    pub total_usd: Decimal,
    pub total_bs: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtotal {
    pub clave: String,
    pub etiqueta: String,
    pub cantidad: usize,
    pub total_usd: Decimal,
    pub total_bs: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumenFinanzas {
    pub cantidad: usize,
    pub total_usd: Decimal,
    pub total_bs: Decimal,
    pub pendiente_usd: Decimal,
    pub por_moneda: Vec<Subtotal>,
    pub por_medico: Vec<Subtotal>,
    pub por_especialidad: Vec<Subtotal>,
    pub por_estado_pago: Vec<Subtotal>,
}

#[derive(Default)]
struct Grupo {
    etiqueta: String,
    cantidad: usize,
    total_usd: Decimal,
    total_bs: Decimal,
}

#[derive(Default)]
struct Agrupador {
    grupos: BTreeMap<String, Grupo>,
}

impl Agrupador {
    fn sumar(&mut self, clave: String, etiqueta: &str, fila: &FilaFinanzas) {
        let grupo = self.grupos.entry(clave).or_insert_with(|| Grupo {
            etiqueta: etiqueta.to_string(),
            ..Default::default()
        });
        grupo.cantidad += 1;
        grupo.total_usd += fila.total_usd;
        grupo.total_bs += fila.total_bs.unwrap_or_default();
    }

    fn into_subtotales(self) -> Vec<Subtotal> {
        let mut out: Vec<Subtotal> = self
            .grupos
            .into_iter()
            .map(|(clave, g)| Subtotal {
                clave,
                etiqueta: g.etiqueta,
                cantidad: g.cantidad,
                total_usd: g.total_usd,
                total_bs: g.total_bs,
            })
            .collect();
        out.sort_by(|a, b| {
            b.total_usd
                .cmp(&a.total_usd)
                .then_with(|| a.etiqueta.cmp(&b.etiqueta))
        });
        out
    }
}

const SIN_ESPECIALIDAD: &str = "sin_especialidad";

/// Filters `filas` and computes totals plus per-dimension subtotals.
pub fn agregar(filas: &[FilaFinanzas], filtro: &FiltroFinanzas) -> ResumenFinanzas {
    let mut cantidad = 0;
    let mut total_usd = Decimal::ZERO;
    let mut total_bs = Decimal::ZERO;
    let mut pendiente_usd = Decimal::ZERO;

    let mut por_moneda = Agrupador::default();
    let mut por_medico = Agrupador::default();
    let mut por_especialidad = Agrupador::default();
    let mut por_estado_pago = Agrupador::default();

    for fila in filas.iter().filter(|f| filtro.matches(f)) {
        cantidad += 1;
        total_usd += fila.total_usd;
        total_bs += fila.total_bs.unwrap_or_default();
        if fila.estado_pago != EstadoPago::Pagado {
            pendiente_usd += fila.total_usd;
        }

        por_moneda.sumar(fila.moneda.to_string(), fila.moneda.as_str(), fila);
        por_medico.sumar(fila.medico_id.to_string(), &fila.medico, fila);
        match (fila.especialidad_id, fila.especialidad.as_deref()) {
            (Some(id), nombre) => {
                por_especialidad.sumar(id.to_string(), nombre.unwrap_or_default(), fila)
            }
            (None, _) => por_especialidad.sumar(
                SIN_ESPECIALIDAD.to_string(),
                "Sin especialidad",
                fila,
            ),
        }
        por_estado_pago.sumar(
            fila.estado_pago.to_string(),
            fila.estado_pago.as_str(),
            fila,
        );
    }

    ResumenFinanzas {
        cantidad,
        total_usd,
        total_bs,
        pendiente_usd,
        por_moneda: por_moneda.into_subtotales(),
        por_medico: por_medico.into_subtotales(),
        por_especialidad: por_especialidad.into_subtotales(),
        por_estado_pago: por_estado_pago.into_subtotales(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct Fixture {
        ana: Uuid,
        luis: Uuid,
        cardio: Uuid,
        filas: Vec<FilaFinanzas>,
    }

    fn fila(
        dia: u32,
        medico_id: Uuid,
        medico: &str,
        especialidad: Option<(Uuid, &str)>,
        moneda: Moneda,
        estado_pago: EstadoPago,
        usd: &str,
        bs: Option<&str>,
    ) -> FilaFinanzas {
        FilaFinanzas {
            consulta_id: Uuid::new_v4(),
            fecha: Utc.with_ymd_and_hms(2024, 3, dia, 14, 0, 0).unwrap(),
            paciente: "Paciente".to_string(),
            paciente_cedula: "V-1".to_string(),
            medico_id,
            medico: medico.to_string(),
            especialidad_id: especialidad.map(|(id, _)| id),
            especialidad: especialidad.map(|(_, n)| n.to_string()),
            moneda,
            metodo_pago: Some(MetodoPago::Efectivo),
            estado_pago,
            tasa_cambio: bs.map(|_| d("36")),
            total_usd: d(usd),
            total_bs: bs.map(d),
        }
    }

    fn fixture() -> Fixture {
        let ana = Uuid::new_v4();
        let luis = Uuid::new_v4();
        let cardio = Uuid::new_v4();
        let cardiologia = Some((cardio, "Cardiología"));
        let filas = vec![
            fila(1, ana, "Ana", cardiologia, Moneda::Usd, EstadoPago::Pagado, "40", None),
            fila(
                2,
                ana,
                "Ana",
                cardiologia,
                Moneda::Ves,
                EstadoPago::Pendiente,
                "20",
                Some("720"),
            ),
            fila(5, luis, "Luis", None, Moneda::Ves, EstadoPago::Pagado, "60", Some("2160")),
        ];
        Fixture { ana, luis, cardio, filas }
    }

    #[test]
    fn totals_without_filter() {
        let fx = fixture();
        let resumen = agregar(&fx.filas, &FiltroFinanzas::default());

        assert_eq!(resumen.cantidad, 3);
        assert_eq!(resumen.total_usd, d("120"));
        assert_eq!(resumen.total_bs, d("2880"));
        assert_eq!(resumen.pendiente_usd, d("20"));

        assert_eq!(resumen.por_medico.len(), 2);
        assert_eq!(resumen.por_medico[0].etiqueta, "Ana");
        assert_eq!(resumen.por_medico[0].total_usd, d("60"));
        assert_eq!(resumen.por_medico[1].clave, fx.luis.to_string());

        let monedas: Vec<_> = resumen.por_moneda.iter().map(|s| s.clave.as_str()).collect();
        assert_eq!(monedas, vec!["VES", "USD"]);
    }

    #[test]
    fn rows_without_specialty_are_grouped_together() {
        let fx = fixture();
        let resumen = agregar(&fx.filas, &FiltroFinanzas::default());
        let sin = resumen
            .por_especialidad
            .iter()
            .find(|s| s.clave == SIN_ESPECIALIDAD)
            .unwrap();
        assert_eq!(sin.cantidad, 1);
        assert_eq!(sin.total_usd, d("60"));
        let cardio = resumen
            .por_especialidad
            .iter()
            .find(|s| s.clave == fx.cardio.to_string())
            .unwrap();
        assert_eq!(cardio.etiqueta, "Cardiología");
    }

    #[test]
    fn filters_by_doctor_and_payment_status() {
        let fx = fixture();
        let filtro = FiltroFinanzas {
            medico_id: Some(fx.ana),
            estado_pago: Some(EstadoPago::Pagado),
            ..Default::default()
        };
        let resumen = agregar(&fx.filas, &filtro);
        assert_eq!(resumen.cantidad, 1);
        assert_eq!(resumen.total_usd, d("40"));
        assert_eq!(resumen.pendiente_usd, Decimal::ZERO);
    }

    #[test]
    fn filters_by_inclusive_date_range_and_currency() {
        let fx = fixture();
        let filtro = FiltroFinanzas {
            desde: NaiveDate::from_ymd_opt(2024, 3, 2),
            hasta: NaiveDate::from_ymd_opt(2024, 3, 5),
            moneda: Some(Moneda::Ves),
            ..Default::default()
        };
        let resumen = agregar(&fx.filas, &filtro);
        assert_eq!(resumen.cantidad, 2);
        assert_eq!(resumen.total_bs, d("2880"));
    }

    #[test]
    fn specialty_filter_excludes_rows_without_specialty() {
        let fx = fixture();
        let filtro = FiltroFinanzas {
            especialidad_id: Some(fx.cardio),
            ..Default::default()
        };
        assert_eq!(agregar(&fx.filas, &filtro).cantidad, 2);
    }

    #[test]
    fn empty_input_gives_zeroes() {
        let resumen = agregar(&[], &FiltroFinanzas::default());
        assert_eq!(resumen.cantidad, 0);
        assert_eq!(resumen.total_usd, Decimal::ZERO);
        assert!(resumen.por_moneda.is_empty());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let filtro = FiltroFinanzas {
            desde: NaiveDate::from_ymd_opt(2024, 3, 5),
            hasta: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        };
        assert!(filtro.validate().is_err());
    }
}
