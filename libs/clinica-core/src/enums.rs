//! Text-backed enumerations shared by the API and the database layer.
//!
//! Every value is stored as its `as_str()` form in TEXT columns. With the
//! `sqlx` feature each enum encodes and decodes directly as Postgres text.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(DomainError::UnknownValue {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(text.parse()?)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Lifecycle state of a consulta.
    EstadoConsulta, "estado de consulta" {
        Agendada => "agendada",
        Reagendada => "reagendada",
        EnProgreso => "en_progreso",
        Completada => "completada",
        Finalizada => "finalizada",
        Cancelada => "cancelada",
    }
}

impl EstadoConsulta {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EstadoConsulta::Finalizada | EstadoConsulta::Cancelada)
    }
}

text_enum! {
    Rol, "rol" {
        Admin => "admin",
        Medico => "medico",
        Recepcion => "recepcion",
        Finanzas => "finanzas",
    }
}

text_enum! {
    Moneda, "moneda" {
        Usd => "USD",
        Ves => "VES",
    }
}

text_enum! {
    EstadoPago, "estado de pago" {
        Pendiente => "pendiente",
        Pagado => "pagado",
        Parcial => "parcial",
    }
}

text_enum! {
    MetodoPago, "metodo de pago" {
        Efectivo => "efectivo",
        Transferencia => "transferencia",
        PagoMovil => "pago_movil",
        Tarjeta => "tarjeta",
        Zelle => "zelle",
        Otro => "otro",
    }
}

text_enum! {
    EstadoRemision, "estado de remision" {
        Pendiente => "pendiente",
        Aceptada => "aceptada",
        Completada => "completada",
        Cancelada => "cancelada",
    }
}

text_enum! {
    /// Where a history entry came from.
    OrigenHistorico, "origen de historico" {
        Consulta => "consulta",
        Manual => "manual",
        Importado => "importado",
    }
}
