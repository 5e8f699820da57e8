//! Consulta scheduling, state changes and settlement.
//!
//! Every state change runs in a transaction that first locks the consulta row
//! (`SELECT ... FOR UPDATE`), so two concurrent requests never both act on the
//! same prior state. Finalization writes the line items, totals, the patient
//! history entry and closes any referral behind the consulta before
//! committing; the receipt email is sent afterwards and never fails the call.

use crate::{
    auth::Principal,
    db::{
        consultas::{Cierre, NuevaConsulta},
        ClinicaRepository, ConsultaRepository, HistoricoRepository, MedicoRepository,
        PacienteRepository, RemisionRepository, ServicioRepository, TasaRepository,
    },
    models::{
        texto, validar, CancelarInput, Consulta, ConsultaDetalle, ConsultaFiltro, ConsultaInput,
        FinalizarInput, LineaSolicitada, NuevoHistorico, Pagina, Paginacion, ReagendarInput,
        Servicio,
    },
    services::catalogo::check_tasa,
    services::notifications::{DatosRecibo, LineaRecibo, Plantillas, SharedNotifier},
    Error, Result,
};
use clinica_core::{
    aplicar, liquidar, LineaResuelta, Liquidacion, OrigenHistorico, Rol, Transicion,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

pub struct ConsultaService {
    pool: PgPool,
    consultas: ConsultaRepository,
    pacientes: PacienteRepository,
    medicos: MedicoRepository,
    clinicas: ClinicaRepository,
    notifier: SharedNotifier,
    plantillas: Arc<Plantillas>,
}

impl ConsultaService {
    pub fn new(pool: PgPool, notifier: SharedNotifier, plantillas: Arc<Plantillas>) -> Self {
        Self {
            consultas: ConsultaRepository::new(pool.clone()),
            pacientes: PacienteRepository::new(pool.clone()),
            medicos: MedicoRepository::new(pool.clone()),
            clinicas: ClinicaRepository::new(pool.clone()),
            pool,
            notifier,
            plantillas,
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        mut filtro: ConsultaFiltro,
    ) -> Result<Pagina<Consulta>> {
        if principal.rol == Rol::Medico {
            filtro.medico_id = Some(principal.medico_propio()?);
        }
        if let (Some(desde), Some(hasta)) = (filtro.desde, filtro.hasta) {
            if desde > hasta {
                return Err(Error::Validation(
                    "'desde' must not be after 'hasta'".to_string(),
                ));
            }
        }

        let paginacion = Paginacion {
            limit: filtro.limit,
            offset: filtro.offset,
        };
        let (items, total) = self
            .consultas
            .list(
                &principal.clinica,
                &filtro,
                paginacion.limit(),
                paginacion.offset(),
            )
            .await?;
        Ok(Pagina {
            items,
            total,
            limit: paginacion.limit(),
            offset: paginacion.offset(),
        })
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<ConsultaDetalle> {
        let consulta = self
            .consultas
            .get(&principal.clinica, id)
            .await?
            .filter(|c| visible_para(principal, c))
            .ok_or_else(|| Error::NotFound(format!("consulta {id}")))?;
        let servicios = self.consultas.lineas(&principal.clinica, id).await?;
        Ok(ConsultaDetalle {
            consulta,
            servicios,
        })
    }

    pub async fn create(&self, principal: &Principal, input: ConsultaInput) -> Result<Consulta> {
        principal.require_roles(&[Rol::Admin, Rol::Recepcion, Rol::Medico])?;
        validar(&input)?;
        if principal.rol == Rol::Medico && principal.medico_propio()? != input.medico_id {
            return Err(Error::Forbidden(
                "doctors may only schedule their own consultas".to_string(),
            ));
        }

        let clinica = principal.clinica.as_str();
        if self.pacientes.get(clinica, input.paciente_id).await?.is_none() {
            return Err(Error::Validation(format!(
                "paciente {} does not exist",
                input.paciente_id
            )));
        }
        let medico = self
            .medicos
            .get(clinica, input.medico_id)
            .await?
            .filter(|m| m.activo)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "medico {} does not exist or is inactive",
                    input.medico_id
                ))
            })?;

        let motivo = texto(input.motivo);
        let nueva = NuevaConsulta {
            paciente_id: input.paciente_id,
            medico_id: medico.id,
            especialidad_id: input.especialidad_id.or(medico.especialidad_id),
            fecha: input.fecha,
            motivo: motivo.as_deref(),
            created_by: Some(principal.user_id),
        };
        let consulta = self.consultas.create(clinica, &nueva).await?;
        tracing::info!(
            clinica = %clinica,
            consulta_id = %consulta.id,
            medico_id = %consulta.medico_id,
            "Consulta scheduled"
        );
        Ok(consulta)
    }

    pub async fn iniciar(&self, principal: &Principal, id: Uuid) -> Result<Consulta> {
        self.cambiar_estado(principal, id, Transicion::Iniciar).await
    }

    pub async fn completar(&self, principal: &Principal, id: Uuid) -> Result<Consulta> {
        self.cambiar_estado(principal, id, Transicion::Completar)
            .await
    }

    async fn cambiar_estado(
        &self,
        principal: &Principal,
        id: Uuid,
        transicion: Transicion,
    ) -> Result<Consulta> {
        let mut tx = self.pool.begin().await?;
        let result: Result<Consulta> = async {
            let actual = lock_consulta(&mut tx, principal, id).await?;
            let destino = aplicar(
                &principal.actor(),
                actual.estado,
                transicion,
                actual.medico_id,
            )?;
            ConsultaRepository::set_estado(&mut tx, &principal.clinica, id, destino).await
        }
        .await;

        match result {
            Ok(consulta) => {
                tx.commit().await?;
                tracing::info!(
                    clinica = %principal.clinica,
                    consulta_id = %id,
                    estado = %consulta.estado,
                    "Consulta state changed"
                );
                Ok(consulta)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    pub async fn reagendar(
        &self,
        principal: &Principal,
        id: Uuid,
        input: ReagendarInput,
    ) -> Result<Consulta> {
        validar(&input)?;
        let motivo = texto(input.motivo);

        let mut tx = self.pool.begin().await?;
        let result: Result<Consulta> = async {
            let actual = lock_consulta(&mut tx, principal, id).await?;
            aplicar(
                &principal.actor(),
                actual.estado,
                Transicion::Reagendar,
                actual.medico_id,
            )?;
            if actual.fecha == input.fecha {
                return Err(Error::Validation(
                    "the new date must differ from the current one".to_string(),
                ));
            }
            ConsultaRepository::reagendar(
                &mut tx,
                &principal.clinica,
                id,
                input.fecha,
                motivo.as_deref(),
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
                    reagendamientos = consulta.reagendamientos,
                    "Consulta rescheduled"
                );
                Ok(consulta)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    /// Cancels the consulta together with any referral still waiting on it.
    pub async fn cancelar(
        &self,
        principal: &Principal,
        id: Uuid,
        input: CancelarInput,
    ) -> Result<Consulta> {
        let motivo = input.motivo.trim().to_string();
        if motivo.is_empty() {
            return Err(Error::Validation("motivo is required".to_string()));
        }
        validar(&CancelarInput {
            motivo: motivo.clone(),
        })?;

        let mut tx = self.pool.begin().await?;
        let result: Result<(Consulta, u64)> = async {
            let actual = lock_consulta(&mut tx, principal, id).await?;
            aplicar(
                &principal.actor(),
                actual.estado,
                Transicion::Cancelar,
                actual.medico_id,
            )?;
            let consulta = ConsultaRepository::cancelar(
                &mut tx,
                &principal.clinica,
                id,
                &motivo,
                principal.user_id,
            )
            .await?;
            let remisiones =
                RemisionRepository::cancelar_pendientes_de_consulta(&mut tx, &principal.clinica, id)
                    .await?;
            Ok((consulta, remisiones))
        }
        .await;

        match result {
            Ok((consulta, remisiones)) => {
                tx.commit().await?;
                tracing::info!(
                    clinica = %principal.clinica,
                    consulta_id = %id,
                    remisiones_canceladas = remisiones,
                    "Consulta cancelled"
                );
                Ok(consulta)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    /// Settles the consulta: prices the services, snapshots the exchange
    /// rate and records the encounter in the patient's history.
    pub async fn finalizar(
        &self,
        principal: &Principal,
        id: Uuid,
        input: FinalizarInput,
    ) -> Result<ConsultaDetalle> {
        validar(&input)?;
        if let Some(tasa) = input.tasa_cambio {
            check_tasa(tasa)?;
        }

        let mut tx = self.pool.begin().await?;
        let result = finalizar_en(&mut tx, principal, id, &input).await;

        let (detalle, liquidacion) = match result {
            Ok(v) => {
                tx.commit().await?;
                v
            }
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };

        tracing::info!(
            clinica = %principal.clinica,
            consulta_id = %id,
            moneda = %liquidacion.moneda,
            total_usd = %liquidacion.total_usd,
            lineas = liquidacion.lineas.len(),
            "Consulta finalized"
        );

        self.enviar_recibo(principal, &detalle.consulta, &liquidacion);
        Ok(detalle)
    }

    /// Queues the receipt email. Failures are logged only.
    fn enviar_recibo(&self, principal: &Principal, consulta: &Consulta, liquidacion: &Liquidacion) {
        let notifier = self.notifier.clone();
        let plantillas = self.plantillas.clone();
        let pacientes = self.pacientes.clone();
        let medicos = self.medicos.clone();
        let clinicas = self.clinicas.clone();
        let clinica = principal.clinica.clone();
        let consulta = consulta.clone();
        let liquidacion = liquidacion.clone();

        tokio::spawn(async move {
            let enviado = async {
                let Some(paciente) = pacientes.get(&clinica, consulta.paciente_id).await? else {
                    return Ok(false);
                };
                let Some(email) = paciente.email.clone() else {
                    return Ok(false);
                };
                let medico = medicos
                    .get(&clinica, consulta.medico_id)
                    .await?
                    .map(|m| m.nombre_completo())
                    .unwrap_or_default();
                let nombre_clinica = clinicas
                    .find_activa(&clinica)
                    .await?
                    .map(|c| c.nombre)
                    .unwrap_or_else(|| clinica.clone());

                let datos = datos_recibo(
                    nombre_clinica,
                    paciente.nombre_completo(),
                    medico,
                    &consulta,
                    &liquidacion,
                );
                let correo = plantillas.recibo_consulta(&email, &datos)?;
                notifier.enviar(correo).await?;
                Ok::<bool, Error>(true)
            }
            .await;

            match enviado {
                Ok(true) => {
                    tracing::debug!(consulta_id = %consulta.id, "Receipt sent");
                }
                Ok(false) => {
                    tracing::debug!(
                        consulta_id = %consulta.id,
                        "Patient has no email, receipt skipped"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        consulta_id = %consulta.id,
                        error = %e,
                        "Failed to send receipt"
                    );
                }
            }
        });
    }
}

fn visible_para(principal: &Principal, consulta: &Consulta) -> bool {
    principal.rol != Rol::Medico || principal.medico_id == Some(consulta.medico_id)
}

async fn lock_consulta(
    conn: &mut PgConnection,
    principal: &Principal,
    id: Uuid,
) -> Result<Consulta> {
    ConsultaRepository::lock(conn, &principal.clinica, id)
        .await?
        .filter(|c| visible_para(principal, c))
        .ok_or_else(|| Error::NotFound(format!("consulta {id}")))
}

async fn finalizar_en(
    conn: &mut PgConnection,
    principal: &Principal,
    id: Uuid,
    input: &FinalizarInput,
) -> Result<(ConsultaDetalle, Liquidacion)> {
    let clinica = principal.clinica.as_str();

    let actual = lock_consulta(conn, principal, id).await?;
    aplicar(
        &principal.actor(),
        actual.estado,
        Transicion::Finalizar,
        actual.medico_id,
    )?;

    let tasa = match input.tasa_cambio {
        Some(tasa) => Some(tasa),
        None => TasaRepository::latest_in(conn, clinica)
            .await?
            .map(|t| t.valor),
    };

    let mut lineas = Vec::with_capacity(input.servicios.len());
    for solicitada in &input.servicios {
        let servicio = resolver_servicio(conn, clinica, solicitada, actual.especialidad_id).await?;
        lineas.push(LineaResuelta {
            servicio_id: servicio.id,
            nombre: servicio.nombre,
            precio_unitario_usd: servicio.precio_usd,
            cantidad: solicitada.cantidad,
        });
    }

    let liquidacion = liquidar(&lineas, tasa, input.moneda)?;

    let mut servicios = Vec::with_capacity(liquidacion.lineas.len());
    for linea in &liquidacion.lineas {
        servicios.push(
            ConsultaRepository::insert_linea(
                conn,
                clinica,
                id,
                linea,
                liquidacion.tasa_cambio,
                liquidacion.moneda,
            )
            .await?,
        );
    }

    let diagnostico = texto(input.diagnostico.clone());
    let tratamiento = texto(input.tratamiento.clone());
    let observaciones = texto(input.observaciones.clone());
    let cierre = Cierre {
        moneda: liquidacion.moneda,
        metodo_pago: input.metodo_pago,
        estado_pago: input.estado_pago,
        tasa_cambio: liquidacion.tasa_cambio,
        total_usd: liquidacion.total_usd,
        total_bs: liquidacion.total_bs,
        diagnostico: diagnostico.as_deref(),
        tratamiento: tratamiento.as_deref(),
        observaciones: observaciones.as_deref(),
        finalizada_por: principal.user_id,
    };
    let consulta = ConsultaRepository::finalizar(conn, clinica, id, &cierre).await?;

    RemisionRepository::completar_de_consulta(conn, clinica, id).await?;

    let historico = NuevoHistorico {
        paciente_id: consulta.paciente_id,
        consulta_id: Some(consulta.id),
        medico_id: Some(consulta.medico_id),
        fecha: consulta.fecha,
        motivo: consulta.motivo.clone(),
        antecedentes: None,
        diagnostico: consulta.diagnostico.clone(),
        tratamiento: consulta.tratamiento.clone(),
        observaciones: consulta.observaciones.clone(),
        origen: OrigenHistorico::Consulta,
        archivo_origen: None,
        created_by: Some(principal.user_id),
    };
    HistoricoRepository::insert(conn, clinica, &historico).await?;

    Ok((
        ConsultaDetalle {
            consulta,
            servicios,
        },
        liquidacion,
    ))
}

/// Finds the catalog service a requested line refers to, creating it when an
/// unknown name comes with a price.
async fn resolver_servicio(
    conn: &mut PgConnection,
    clinica: &str,
    solicitada: &LineaSolicitada,
    especialidad_id: Option<Uuid>,
) -> Result<Servicio> {
    if let Some(servicio_id) = solicitada.servicio_id {
        let servicio = ServicioRepository::find_by_id(conn, clinica, servicio_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("servicio {servicio_id} does not exist")))?;
        return activo(servicio);
    }

    let nombre = solicitada
        .nombre
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            Error::Validation("each service line needs servicio_id or nombre".to_string())
        })?;

    if let Some(servicio) = ServicioRepository::find_by_nombre(conn, clinica, nombre).await? {
        return activo(servicio);
    }

    match solicitada.precio_usd {
        Some(precio) if precio >= Decimal::ZERO => {
            let servicio =
                ServicioRepository::insert(conn, clinica, nombre, precio, especialidad_id).await?;
            tracing::info!(
                clinica = %clinica,
                servicio_id = %servicio.id,
                nombre = %servicio.nombre,
                "Servicio created during settlement"
            );
            Ok(servicio)
        }
        Some(_) => Err(Error::Validation(format!(
            "precio_usd for '{nombre}' must not be negative"
        ))),
        None => Err(Error::Validation(format!(
            "unknown servicio '{nombre}' and no precio_usd given"
        ))),
    }
}

fn activo(servicio: Servicio) -> Result<Servicio> {
    if servicio.activo {
        Ok(servicio)
    } else {
        Err(Error::Validation(format!(
            "servicio '{}' is inactive",
            servicio.nombre
        )))
    }
}

fn datos_recibo(
    clinica: String,
    paciente: String,
    medico: String,
    consulta: &Consulta,
    liquidacion: &Liquidacion,
) -> DatosRecibo {
    let dinero = |d: Decimal| format!("{d:.2}");
    DatosRecibo {
        clinica,
        paciente,
        medico,
        fecha: consulta.fecha.format("%d/%m/%Y %H:%M").to_string(),
        lineas: liquidacion
            .lineas
            .iter()
            .map(|l| LineaRecibo {
                nombre: l.nombre.clone(),
                cantidad: l.cantidad,
                subtotal_usd: dinero(l.subtotal_usd),
                subtotal_bs: l.subtotal_bs.map(dinero),
            })
            .collect(),
        total_usd: dinero(liquidacion.total_usd),
        total_bs: liquidacion.total_bs.map(dinero),
        tasa_cambio: liquidacion.tasa_cambio.map(|t| t.to_string()),
        con_bs: liquidacion.total_bs.is_some(),
        estado_pago: consulta.estado_pago.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clinica_core::{EstadoConsulta, EstadoPago, LineaLiquidada, Moneda};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn principal(rol: Rol, medico_id: Option<Uuid>) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            rol,
            clinica: "central".to_string(),
            medico_id,
        }
    }

    fn consulta(medico_id: Uuid) -> Consulta {
        let fecha = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        Consulta {
            id: Uuid::new_v4(),
            clinica_alias: "central".to_string(),
            paciente_id: Uuid::new_v4(),
            medico_id,
            especialidad_id: None,
            fecha,
            motivo: None,
            estado: EstadoConsulta::Finalizada,
            fecha_anterior: None,
            reagendamientos: 0,
            motivo_reagenda: None,
            diagnostico: None,
            tratamiento: None,
            observaciones: None,
            moneda: Some(Moneda::Ves),
            metodo_pago: None,
            estado_pago: EstadoPago::Pagado,
            tasa_cambio: Some(d("36.50")),
            total_usd: Some(d("40.00")),
            total_bs: Some(d("1460.00")),
            motivo_cancelacion: None,
            cancelada_por: None,
            cancelada_en: None,
            finalizada_por: None,
            finalizada_en: Some(fecha),
            created_by: None,
            created_at: fecha,
            updated_at: fecha,
        }
    }

    #[test]
    fn doctors_only_see_their_own_consultas() {
        let medico = Uuid::new_v4();
        let c = consulta(medico);
        assert!(visible_para(&principal(Rol::Medico, Some(medico)), &c));
        assert!(!visible_para(&principal(Rol::Medico, Some(Uuid::new_v4())), &c));
        assert!(!visible_para(&principal(Rol::Medico, None), &c));
        assert!(visible_para(&principal(Rol::Recepcion, None), &c));
        assert!(visible_para(&principal(Rol::Finanzas, None), &c));
    }

    #[test]
    fn receipt_data_formats_money_with_two_decimals() {
        let c = consulta(Uuid::new_v4());
        let liquidacion = Liquidacion {
            moneda: Moneda::Ves,
            tasa_cambio: Some(d("36.5")),
            lineas: vec![LineaLiquidada {
                servicio_id: Uuid::new_v4(),
                nombre: "Consulta general".to_string(),
                cantidad: 1,
                precio_unitario_usd: d("40"),
                subtotal_usd: d("40"),
                subtotal_bs: Some(d("1460")),
            }],
            total_usd: d("40"),
            total_bs: Some(d("1460")),
        };
        let datos = datos_recibo(
            "Central".to_string(),
            "Ana Pérez".to_string(),
            "Luis Gómez".to_string(),
            &c,
            &liquidacion,
        );
        assert_eq!(datos.total_usd, "40.00");
        assert_eq!(datos.total_bs.as_deref(), Some("1460.00"));
        assert_eq!(datos.lineas[0].subtotal_bs.as_deref(), Some("1460.00"));
        assert_eq!(datos.fecha, "01/03/2024 14:30");
        assert!(datos.con_bs);
        assert_eq!(datos.estado_pago, "pagado");
    }

    #[test]
    fn inactive_services_are_rejected() {
        let now = Utc::now();
        let servicio = Servicio {
            id: Uuid::new_v4(),
            clinica_alias: "central".to_string(),
            especialidad_id: None,
            nombre: "Electrocardiograma".to_string(),
            precio_usd: d("25"),
            activo: false,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(activo(servicio.clone()), Err(Error::Validation(_))));
        let servicio = Servicio {
            activo: true,
            ..servicio
        };
        assert!(activo(servicio).is_ok());
    }
}
