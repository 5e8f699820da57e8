//! Referrals between doctors.
//!
//! Creating a referral also books the follow-up consulta with the destination
//! doctor, in the same transaction.

use crate::{
    auth::Principal,
    db::{
        consultas::NuevaConsulta, remisiones::NuevaRemision, ConsultaRepository, MedicoRepository,
        PacienteRepository, RemisionRepository,
    },
    models::{texto, validar, Remision, RemisionFiltro, RemisionInput},
    services::notifications::{DatosRemision, Plantillas, SharedNotifier},
    Error, Result,
};
use clinica_core::{EstadoRemision, Rol};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct RemisionService {
    pool: PgPool,
    remisiones: RemisionRepository,
    consultas: ConsultaRepository,
    pacientes: PacienteRepository,
    medicos: MedicoRepository,
    notifier: SharedNotifier,
    plantillas: Arc<Plantillas>,
}

impl RemisionService {
    pub fn new(pool: PgPool, notifier: SharedNotifier, plantillas: Arc<Plantillas>) -> Self {
        Self {
            remisiones: RemisionRepository::new(pool.clone()),
            consultas: ConsultaRepository::new(pool.clone()),
            pacientes: PacienteRepository::new(pool.clone()),
            medicos: MedicoRepository::new(pool.clone()),
            pool,
            notifier,
            plantillas,
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        mut filtro: RemisionFiltro,
    ) -> Result<Vec<Remision>> {
        if principal.rol == Rol::Medico {
            filtro.medico_id = Some(principal.medico_propio()?);
        }
        self.remisiones.list(&principal.clinica, &filtro).await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<Remision> {
        self.remisiones
            .get(&principal.clinica, id)
            .await?
            .filter(|r| visible_para(principal, r))
            .ok_or_else(|| Error::NotFound(format!("remision {id}")))
    }

    pub async fn create(&self, principal: &Principal, input: RemisionInput) -> Result<Remision> {
        principal.require_roles(&[Rol::Admin, Rol::Medico])?;
        validar(&input)?;
        let clinica = principal.clinica.as_str();

        let remitente_id = match principal.rol {
            Rol::Medico => {
                let propio = principal.medico_propio()?;
                if input.medico_remitente_id.is_some_and(|id| id != propio) {
                    return Err(Error::Forbidden(
                        "doctors may only refer as themselves".to_string(),
                    ));
                }
                propio
            }
            _ => input.medico_remitente_id.ok_or_else(|| {
                Error::Validation("medico_remitente_id is required".to_string())
            })?,
        };
        mismo_medico(remitente_id, input.medico_destino_id)?;

        let paciente = self
            .pacientes
            .get(clinica, input.paciente_id)
            .await?
            .ok_or_else(|| {
                Error::Validation(format!("paciente {} does not exist", input.paciente_id))
            })?;
        let remitente = self
            .medicos
            .get(clinica, remitente_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("medico {remitente_id} does not exist")))?;
        let destino = self
            .medicos
            .get(clinica, input.medico_destino_id)
            .await?
            .filter(|m| m.activo)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "medico {} does not exist or is inactive",
                    input.medico_destino_id
                ))
            })?;
        if let Some(origen) = input.consulta_origen_id {
            if self.consultas.get(clinica, origen).await?.is_none() {
                return Err(Error::Validation(format!("consulta {origen} does not exist")));
            }
        }

        let motivo = input.motivo.trim().to_string();
        let observaciones = texto(input.observaciones.clone());
        let motivo_consulta = format!("Remisión: {motivo}");

        let mut tx = self.pool.begin().await?;
        let result: Result<Remision> = async {
            let consulta = ConsultaRepository::insert(
                &mut tx,
                clinica,
                &NuevaConsulta {
                    paciente_id: paciente.id,
                    medico_id: destino.id,
                    especialidad_id: destino.especialidad_id,
                    fecha: input.fecha_propuesta,
                    motivo: Some(&motivo_consulta),
                    created_by: Some(principal.user_id),
                },
            )
            .await?;

            RemisionRepository::insert(
                &mut tx,
                clinica,
                &NuevaRemision {
                    paciente_id: paciente.id,
                    medico_remitente_id: remitente.id,
                    medico_destino_id: destino.id,
                    especialidad_destino_id: destino.especialidad_id,
                    consulta_origen_id: input.consulta_origen_id,
                    consulta_id: consulta.id,
                    motivo: &motivo,
                    observaciones: observaciones.as_deref(),
                    created_by: principal.user_id,
                },
            )
            .await
        }
        .await;

        let remision = match result {
            Ok(remision) => {
                tx.commit().await?;
                remision
            }
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };

        tracing::info!(
            clinica = %clinica,
            remision_id = %remision.id,
            medico_destino_id = %destino.id,
            "Remision created"
        );

        if let Some(email) = destino.email.clone() {
            let datos = DatosRemision {
                paciente: paciente.nombre_completo(),
                medico_remitente: remitente.nombre_completo(),
                medico_destino: destino.nombre_completo(),
                motivo,
                fecha: input.fecha_propuesta.format("%d/%m/%Y %H:%M").to_string(),
            };
            self.notificar(remision.id, &email, datos);
        }

        Ok(remision)
    }

    fn notificar(&self, remision_id: Uuid, email: &str, datos: DatosRemision) {
        let correo = match self.plantillas.remision(email, &datos) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    remision_id = %remision_id,
                    error = %e,
                    "Failed to render referral email"
                );
                return;
            }
        };
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.enviar(correo).await {
                tracing::warn!(
                    remision_id = %remision_id,
                    error = %e,
                    "Failed to send referral email"
                );
            }
        });
    }

    pub async fn aceptar(&self, principal: &Principal, id: Uuid) -> Result<Remision> {
        self.cambiar_estado(principal, id, EstadoRemision::Aceptada)
            .await
    }

    pub async fn completar(&self, principal: &Principal, id: Uuid) -> Result<Remision> {
        self.cambiar_estado(principal, id, EstadoRemision::Completada)
            .await
    }

    async fn cambiar_estado(
        &self,
        principal: &Principal,
        id: Uuid,
        destino: EstadoRemision,
    ) -> Result<Remision> {
        principal.require_roles(&[Rol::Admin, Rol::Medico])?;

        let mut tx = self.pool.begin().await?;
        let result: Result<Remision> = async {
            let actual = RemisionRepository::lock(&mut tx, &principal.clinica, id)
                .await?
                .filter(|r| visible_para(principal, r))
                .ok_or_else(|| Error::NotFound(format!("remision {id}")))?;

            if principal.rol == Rol::Medico && principal.medico_id != Some(actual.medico_destino_id)
            {
                return Err(Error::Forbidden(
                    "only the destination doctor may update this remision".to_string(),
                ));
            }
            validar_estado(actual.estado, destino)?;
            RemisionRepository::set_estado(&mut tx, &principal.clinica, id, destino).await
        }
        .await;

        match result {
            Ok(remision) => {
                tx.commit().await?;
                tracing::info!(
                    clinica = %principal.clinica,
                    remision_id = %id,
                    estado = %remision.estado,
                    "Remision state changed"
                );
                Ok(remision)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}

fn visible_para(principal: &Principal, remision: &Remision) -> bool {
    match principal.rol {
        Rol::Medico => principal.medico_id.is_some_and(|id| {
            id == remision.medico_remitente_id || id == remision.medico_destino_id
        }),
        _ => true,
    }
}

fn mismo_medico(remitente: Uuid, destino: Uuid) -> Result<()> {
    if remitente == destino {
        return Err(Error::Validation(
            "a doctor cannot refer a patient to themselves".to_string(),
        ));
    }
    Ok(())
}

fn validar_estado(actual: EstadoRemision, destino: EstadoRemision) -> Result<()> {
    use EstadoRemision::*;
    let permitido = matches!(
        (actual, destino),
        (Pendiente, Aceptada) | (Pendiente | Aceptada, Completada)
    );
    if permitido {
        Ok(())
    } else {
        Err(Error::Conflict(format!(
            "cannot move remision from '{actual}' to '{destino}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn remision(remitente: Uuid, destino: Uuid) -> Remision {
        let now = Utc::now();
        Remision {
            id: Uuid::new_v4(),
            clinica_alias: "central".to_string(),
            paciente_id: Uuid::new_v4(),
            medico_remitente_id: remitente,
            medico_destino_id: destino,
            especialidad_destino_id: None,
            consulta_origen_id: None,
            consulta_id: Some(Uuid::new_v4()),
            motivo: "Evaluación cardiológica".to_string(),
            observaciones: None,
            estado: EstadoRemision::Pendiente,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn self_referral_is_rejected() {
        let id = Uuid::new_v4();
        assert!(matches!(mismo_medico(id, id), Err(Error::Validation(_))));
        assert!(mismo_medico(id, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn referral_states_only_move_forward() {
        use EstadoRemision::*;
        assert!(validar_estado(Pendiente, Aceptada).is_ok());
        assert!(validar_estado(Pendiente, Completada).is_ok());
        assert!(validar_estado(Aceptada, Completada).is_ok());
        assert!(matches!(
            validar_estado(Aceptada, Aceptada),
            Err(Error::Conflict(_))
        ));
        assert!(validar_estado(Cancelada, Completada).is_err());
        assert!(validar_estado(Completada, Aceptada).is_err());
    }

    #[test]
    fn doctors_see_referrals_they_are_part_of() {
        let remitente = Uuid::new_v4();
        let destino = Uuid::new_v4();
        let r = remision(remitente, destino);
        let medico = |id: Option<Uuid>| Principal {
            user_id: Uuid::new_v4(),
            rol: Rol::Medico,
            clinica: "central".to_string(),
            medico_id: id,
        };
        assert!(visible_para(&medico(Some(remitente)), &r));
        assert!(visible_para(&medico(Some(destino)), &r));
        assert!(!visible_para(&medico(Some(Uuid::new_v4())), &r));
        assert!(!visible_para(&medico(None), &r));
    }
}
