use anyhow::{bail, Context as AnyhowContext, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use clinica::{
    auth::AuthManager,
    config::Config,
    db::{create_db_pool, run_migrations, ClinicaRepository, TasaRepository},
};
use clinica_core::Rol;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "clinica",
    about = "Operator commands for the clinic backend",
    version,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pending database migrations.
    Migrate,

    /// Clinic (tenant) management.
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },

    /// Exchange-rate entry.
    Tasa {
        #[command(subcommand)]
        command: TasaCommands,
    },

    /// Print a signed bearer token for local development.
    Token {
        /// Clinic alias the token is scoped to.
        #[arg(long)]
        clinica: String,
        /// admin, medico, recepcion or finanzas.
        #[arg(long)]
        rol: Rol,
        /// Required for role medico.
        #[arg(long)]
        medico_id: Option<Uuid>,
        /// User id; random when omitted.
        #[arg(long)]
        sub: Option<Uuid>,
    },

    /// Print version information.
    Version,
}

#[derive(Subcommand)]
enum TenantCommands {
    /// Register a new clinic.
    Create {
        #[arg(long)]
        alias: String,
        #[arg(long)]
        nombre: String,
        /// Contact address shown on receipts.
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum TasaCommands {
    /// Store the USD to VES rate for a clinic.
    Set {
        #[arg(long)]
        clinica: String,
        #[arg(long)]
        valor: Decimal,
        /// Defaults to today (UTC).
        #[arg(long)]
        fecha: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Migrate => {
            let config = load_config()?;
            let pool = create_db_pool(&config).await?;
            run_migrations(&pool).await?;
            println!("Migrations applied");
        }
        Commands::Tenant {
            command:
                TenantCommands::Create {
                    alias,
                    nombre,
                    email,
                },
        } => {
            let alias = validar_alias(&alias)?;
            let nombre = nombre.trim();
            if nombre.is_empty() {
                bail!("--nombre must not be empty");
            }
            let config = load_config()?;
            let pool = create_db_pool(&config).await?;
            let clinica = ClinicaRepository::new(pool)
                .create(&alias, nombre, email.as_deref())
                .await
                .with_context(|| format!("Failed to create clinica '{alias}'"))?;
            println!("Created clinica '{}' ({})", clinica.alias, clinica.nombre);
        }
        Commands::Tasa {
            command:
                TasaCommands::Set {
                    clinica,
                    valor,
                    fecha,
                },
        } => {
            if valor <= Decimal::ZERO {
                bail!("--valor must be greater than zero");
            }
            let config = load_config()?;
            let pool = create_db_pool(&config).await?;
            if ClinicaRepository::new(pool.clone())
                .find_activa(&clinica)
                .await?
                .is_none()
            {
                bail!("clinica '{clinica}' does not exist or is inactive");
            }
            let fecha = fecha.unwrap_or_else(|| Utc::now().date_naive());
            let tasa = TasaRepository::new(pool)
                .create(&clinica, valor, fecha)
                .await?;
            println!(
                "Stored rate {} {}/{} for '{}' on {}",
                tasa.valor, tasa.moneda_destino, tasa.moneda_origen, clinica, tasa.fecha
            );
        }
        Commands::Token {
            clinica,
            rol,
            medico_id,
            sub,
        } => {
            let config = load_config()?;
            let auth = AuthManager::new(&config.auth);
            let token = auth.issue_token(
                sub.unwrap_or_else(Uuid::new_v4),
                rol,
                &clinica,
                medico_id,
            )?;
            println!("{token}");
        }
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    Ok(config)
}

/// Aliases travel in tokens and URLs: lowercase ASCII, digits, `_` and `-`.
fn validar_alias(alias: &str) -> Result<String> {
    let alias = alias.trim().to_ascii_lowercase();
    let valido = (2..=40).contains(&alias.len())
        && alias
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valido {
        bail!("--alias must be 2-40 characters of a-z, 0-9, '_' or '-'");
    }
    Ok(alias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn alias_is_normalized_and_checked() {
        assert_eq!(validar_alias(" Centro-Sur ").unwrap(), "centro-sur");
        assert!(validar_alias("a").is_err());
        assert!(validar_alias("con espacio").is_err());
        assert!(validar_alias("clínica").is_err());
    }

    #[test]
    fn token_arguments_parse() {
        let cli = Cli::try_parse_from([
            "clinica",
            "token",
            "--clinica",
            "centro",
            "--rol",
            "finanzas",
        ])
        .unwrap();
        match cli.command {
            Commands::Token { rol, medico_id, .. } => {
                assert_eq!(rol, Rol::Finanzas);
                assert!(medico_id.is_none());
            }
            _ => panic!("expected token command"),
        }
    }
}
