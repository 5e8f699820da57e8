//! Shared application state

use crate::{
    auth::AuthManager,
    config::Config,
    db::{
        create_db_pool, run_migrations, ClinicaRepository, EspecialidadRepository,
        HistoricoRepository, MedicoRepository, PacienteRepository, ServicioRepository,
        TasaRepository,
    },
    services::{
        notifier_from_config, renderer_from_config, CatalogoService, ConsultaService,
        FinanzasService, ImportacionService, InformeService, PacienteService, Plantillas,
        RemisionService, SharedNotifier, SharedPdfRenderer,
    },
    Result,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppStateOptions {
    pub run_migrations: bool,
}

impl Default for AppStateOptions {
    fn default() -> Self {
        Self {
            run_migrations: true,
        }
    }
}

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthManager>,
    pub db_pool: PgPool,
    pub clinicas: ClinicaRepository,
    pub catalogo: Arc<CatalogoService>,
    pub pacientes: Arc<PacienteService>,
    pub consultas: Arc<ConsultaService>,
    pub finanzas: Arc<FinanzasService>,
    pub remisiones: Arc<RemisionService>,
    pub informes: Arc<InformeService>,
    pub importacion: Arc<ImportacionService>,
}

impl AppState {
    /// Initialize the application state
    pub async fn new(config: Config) -> Result<Self> {
        Self::new_with_options(config, AppStateOptions::default()).await
    }

    pub async fn new_with_options(config: Config, options: AppStateOptions) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let db_pool = create_db_pool(&config).await?;
        if options.run_migrations {
            run_migrations(&db_pool).await?;
        }

        let notifier = notifier_from_config(&config.email);
        let pdf = renderer_from_config(&config.pdf)?;

        let state = Self::from_parts(config, db_pool, notifier, pdf)?;
        tracing::info!("Application state initialized successfully");
        Ok(state)
    }

    /// Wires the services around an existing pool. Tests use this to swap in
    /// their own notifier and renderer.
    pub fn from_parts(
        config: Config,
        db_pool: PgPool,
        notifier: SharedNotifier,
        pdf: SharedPdfRenderer,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let auth = Arc::new(AuthManager::new(&config.auth));
        let plantillas = Arc::new(Plantillas::new()?);

        let catalogo = Arc::new(CatalogoService::new(
            EspecialidadRepository::new(db_pool.clone()),
            MedicoRepository::new(db_pool.clone()),
            ServicioRepository::new(db_pool.clone()),
            TasaRepository::new(db_pool.clone()),
        ));
        let pacientes = Arc::new(PacienteService::new(
            PacienteRepository::new(db_pool.clone()),
            HistoricoRepository::new(db_pool.clone()),
        ));
        let consultas = Arc::new(ConsultaService::new(
            db_pool.clone(),
            notifier.clone(),
            plantillas.clone(),
        ));
        let finanzas = Arc::new(FinanzasService::new(db_pool.clone(), pdf.clone()));
        let remisiones = Arc::new(RemisionService::new(
            db_pool.clone(),
            notifier.clone(),
            plantillas.clone(),
        ));
        let informes = Arc::new(InformeService::new(
            db_pool.clone(),
            pdf,
            notifier,
            plantillas,
        ));
        let importacion = Arc::new(ImportacionService::new(db_pool.clone()));

        Ok(Self {
            clinicas: ClinicaRepository::new(db_pool.clone()),
            config,
            auth,
            db_pool,
            catalogo,
            pacientes,
            consultas,
            finanzas,
            remisiones,
            informes,
            importacion,
        })
    }
}
