//! Specialties, doctors, billable services and exchange rates.

use crate::{
    auth::Principal,
    db::{EspecialidadRepository, MedicoRepository, ServicioRepository, TasaRepository},
    models::{
        validar, Especialidad, EspecialidadInput, Medico, MedicoFiltro, MedicoInput, Servicio,
        ServicioInput, TasaCambio, TasaInput,
    },
    Error, Result,
};
use clinica_core::{normalizar_tasa, Rol};
use rust_decimal::Decimal;
use uuid::Uuid;

const TASAS_LIMIT: i64 = 100;

pub struct CatalogoService {
    especialidades: EspecialidadRepository,
    medicos: MedicoRepository,
    servicios: ServicioRepository,
    tasas: TasaRepository,
}

impl CatalogoService {
    pub fn new(
        especialidades: EspecialidadRepository,
        medicos: MedicoRepository,
        servicios: ServicioRepository,
        tasas: TasaRepository,
    ) -> Self {
        Self {
            especialidades,
            medicos,
            servicios,
            tasas,
        }
    }

    // Especialidades

    pub async fn list_especialidades(
        &self,
        principal: &Principal,
        incluir_inactivas: bool,
    ) -> Result<Vec<Especialidad>> {
        self.especialidades
            .list(&principal.clinica, incluir_inactivas)
            .await
    }

    pub async fn get_especialidad(&self, principal: &Principal, id: Uuid) -> Result<Especialidad> {
        self.especialidades
            .get(&principal.clinica, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("especialidad {id}")))
    }

    pub async fn create_especialidad(
        &self,
        principal: &Principal,
        input: EspecialidadInput,
    ) -> Result<Especialidad> {
        principal.require_roles(&[Rol::Admin])?;
        validar(&input)?;
        let creada = self.especialidades.create(&principal.clinica, &input).await?;
        tracing::info!(
            clinica = %principal.clinica,
            especialidad_id = %creada.id,
            "Especialidad created"
        );
        Ok(creada)
    }

    pub async fn update_especialidad(
        &self,
        principal: &Principal,
        id: Uuid,
        input: EspecialidadInput,
    ) -> Result<Especialidad> {
        principal.require_roles(&[Rol::Admin])?;
        validar(&input)?;
        self.especialidades
            .update(&principal.clinica, id, &input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("especialidad {id}")))
    }

    pub async fn desactivar_especialidad(&self, principal: &Principal, id: Uuid) -> Result<()> {
        principal.require_roles(&[Rol::Admin])?;
        if !self.especialidades.desactivar(&principal.clinica, id).await? {
            return Err(Error::NotFound(format!("especialidad {id}")));
        }
        tracing::info!(
            clinica = %principal.clinica,
            especialidad_id = %id,
            "Especialidad deactivated"
        );
        Ok(())
    }

    // Medicos

    pub async fn list_medicos(
        &self,
        principal: &Principal,
        filtro: &MedicoFiltro,
    ) -> Result<Vec<Medico>> {
        self.medicos.list(&principal.clinica, filtro).await
    }

    pub async fn get_medico(&self, principal: &Principal, id: Uuid) -> Result<Medico> {
        self.medicos
            .get(&principal.clinica, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("medico {id}")))
    }

    pub async fn create_medico(&self, principal: &Principal, input: MedicoInput) -> Result<Medico> {
        principal.require_roles(&[Rol::Admin])?;
        validar(&input)?;
        self.check_especialidad(principal, input.especialidad_id)
            .await?;
        let medico = self.medicos.create(&principal.clinica, &input).await?;
        tracing::info!(clinica = %principal.clinica, medico_id = %medico.id, "Medico created");
        Ok(medico)
    }

    pub async fn update_medico(
        &self,
        principal: &Principal,
        id: Uuid,
        input: MedicoInput,
    ) -> Result<Medico> {
        principal.require_roles(&[Rol::Admin])?;
        validar(&input)?;
        self.check_especialidad(principal, input.especialidad_id)
            .await?;
        self.medicos
            .update(&principal.clinica, id, &input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("medico {id}")))
    }

    async fn check_especialidad(&self, principal: &Principal, id: Option<Uuid>) -> Result<()> {
        if let Some(id) = id {
            if self.especialidades.get(&principal.clinica, id).await?.is_none() {
                return Err(Error::Validation(format!("especialidad {id} does not exist")));
            }
        }
        Ok(())
    }

    // Servicios

    pub async fn list_servicios(
        &self,
        principal: &Principal,
        incluir_inactivos: bool,
    ) -> Result<Vec<Servicio>> {
        self.servicios
            .list(&principal.clinica, incluir_inactivos)
            .await
    }

    pub async fn create_servicio(
        &self,
        principal: &Principal,
        input: ServicioInput,
    ) -> Result<Servicio> {
        principal.require_roles(&[Rol::Admin])?;
        validar(&input)?;
        check_precio(input.precio_usd)?;
        self.check_especialidad(principal, input.especialidad_id)
            .await?;
        self.servicios.create(&principal.clinica, &input).await
    }

    pub async fn update_servicio(
        &self,
        principal: &Principal,
        id: Uuid,
        input: ServicioInput,
    ) -> Result<Servicio> {
        principal.require_roles(&[Rol::Admin])?;
        validar(&input)?;
        check_precio(input.precio_usd)?;
        self.check_especialidad(principal, input.especialidad_id)
            .await?;
        self.servicios
            .update(&principal.clinica, id, &input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("servicio {id}")))
    }

    // Tasas

    pub async fn list_tasas(&self, principal: &Principal) -> Result<Vec<TasaCambio>> {
        self.tasas.list(&principal.clinica, TASAS_LIMIT).await
    }

    pub async fn tasa_actual(&self, principal: &Principal) -> Result<TasaCambio> {
        self.tasas
            .latest(&principal.clinica)
            .await?
            .ok_or_else(|| Error::NotFound("tasa de cambio".to_string()))
    }

    pub async fn create_tasa(&self, principal: &Principal, input: TasaInput) -> Result<TasaCambio> {
        principal.require_roles(&[Rol::Admin, Rol::Finanzas])?;
        let valor = check_tasa(input.valor)?;
        let fecha = input
            .fecha
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        let tasa = self.tasas.create(&principal.clinica, valor, fecha).await?;
        tracing::info!(
            clinica = %principal.clinica,
            valor = %tasa.valor,
            fecha = %tasa.fecha,
            "Exchange rate recorded"
        );
        Ok(tasa)
    }
}

fn check_precio(precio: Decimal) -> Result<()> {
    if precio < Decimal::ZERO {
        return Err(Error::Validation("precio_usd must not be negative".to_string()));
    }
    Ok(())
}

/// Returns the rate rounded to the stored scale.
pub(crate) fn check_tasa(valor: Decimal) -> Result<Decimal> {
    Ok(normalizar_tasa(valor)?)
}
