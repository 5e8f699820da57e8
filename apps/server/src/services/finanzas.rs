//! Finance reporting and payment follow-up.

use crate::{
    auth::Principal,
    db::{ClinicaRepository, ConsultaRepository, FinanzasRepository},
    models::{Consulta, PagoInput},
    services::{
        export::{self, Archivo, FormatoExport, XLSX_CONTENT_TYPE},
        pdf::SharedPdfRenderer,
    },
    Error, Result,
};
use clinica_core::{agregar, EstadoConsulta, FilaFinanzas, FiltroFinanzas, ResumenFinanzas, Rol};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const ROLES: &[Rol] = &[Rol::Admin, Rol::Finanzas];

#[derive(Debug, Clone, Serialize)]
pub struct ReporteFinanzas {
    pub filas: Vec<FilaFinanzas>,
    pub resumen: ResumenFinanzas,
}

pub struct FinanzasService {
    pool: PgPool,
    finanzas: FinanzasRepository,
    clinicas: ClinicaRepository,
    pdf: SharedPdfRenderer,
}

impl FinanzasService {
    pub fn new(pool: PgPool, pdf: SharedPdfRenderer) -> Self {
        Self {
            finanzas: FinanzasRepository::new(pool.clone()),
            clinicas: ClinicaRepository::new(pool.clone()),
            pool,
            pdf,
        }
    }

    pub async fn reporte(
        &self,
        principal: &Principal,
        filtro: &FiltroFinanzas,
    ) -> Result<ReporteFinanzas> {
        principal.require_roles(ROLES)?;
        filtro.validate()?;
        let filas = self.finanzas.filas(&principal.clinica, filtro).await?;
        let resumen = agregar(&filas, filtro);
        Ok(ReporteFinanzas { filas, resumen })
    }

    pub async fn exportar(
        &self,
        principal: &Principal,
        filtro: &FiltroFinanzas,
        formato: FormatoExport,
    ) -> Result<Archivo> {
        let reporte = self.reporte(principal, filtro).await?;
        let base = nombre_archivo(filtro);

        let archivo = match formato {
            FormatoExport::Xlsx => Archivo {
                nombre: format!("{base}.xlsx"),
                content_type: XLSX_CONTENT_TYPE,
                contenido: export::xlsx(&reporte.filas, &reporte.resumen)?,
            },
            FormatoExport::Pdf => {
                let clinica = self
                    .clinicas
                    .find_activa(&principal.clinica)
                    .await?
                    .map(|c| c.nombre)
                    .unwrap_or_else(|| principal.clinica.clone());
                let html = export::html(&clinica, filtro, &reporte.filas, &reporte.resumen);
                Archivo {
                    nombre: format!("{base}.pdf"),
                    content_type: "application/pdf",
                    contenido: self.pdf.render_html(html).await?,
                }
            }
        };

        tracing::info!(
            clinica = %principal.clinica,
            archivo = %archivo.nombre,
            filas = reporte.filas.len(),
            bytes = archivo.contenido.len(),
            "Finance report exported"
        );
        Ok(archivo)
    }

    /// Updates the payment status of a finalized consulta.
    pub async fn actualizar_pago(
        &self,
        principal: &Principal,
        id: Uuid,
        input: PagoInput,
    ) -> Result<Consulta> {
        principal.require_roles(ROLES)?;

        let mut tx = self.pool.begin().await?;
        let result: Result<Consulta> = async {
            let actual = ConsultaRepository::lock(&mut tx, &principal.clinica, id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("consulta {id}")))?;
            if actual.estado != EstadoConsulta::Finalizada {
                return Err(Error::Conflict(format!(
                    "payment can only be updated on finalized consultas (estado '{}')",
                    actual.estado
                )));
            }
            ConsultaRepository::update_pago(
                &mut tx,
                &principal.clinica,
                id,
                input.estado_pago,
                input.metodo_pago,
            )
            .await
        }
        .await;

        match result {
            Ok(consulta) => {
                tx.commit().await?;
                tracing::info!(
                    clinica = %principal.clinica,
                    consulta_id = %id,
                    estado_pago = %consulta.estado_pago,
                    "Payment status updated"
                );
                Ok(consulta)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}

fn nombre_archivo(filtro: &FiltroFinanzas) -> String {
    match (filtro.desde, filtro.hasta) {
        (Some(d), Some(h)) => format!("finanzas_{}_{}", d.format("%Y%m%d"), h.format("%Y%m%d")),
        (Some(d), None) => format!("finanzas_desde_{}", d.format("%Y%m%d")),
        (None, Some(h)) => format!("finanzas_hasta_{}", h.format("%Y%m%d")),
        (None, None) => "finanzas".to_string(),
    }
}
