//! `Etiqueta: valor` parsing of a medical-history document.

use crate::error::{ImportError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Fields recognised in an imported history document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistroImportado {
    pub cedula: Option<String>,
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub sexo: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub fecha: Option<NaiveDate>,
    pub motivo: Option<String>,
    pub antecedentes: Option<String>,
    pub diagnostico: Option<String>,
    pub tratamiento: Option<String>,
    pub observaciones: Option<String>,
    /// Values that were present but could not be interpreted.
    pub advertencias: Vec<String>,
}

impl RegistroImportado {
    /// Patient identity must be complete before the record can be stored.
    pub fn validate(&self) -> Result<()> {
        if blank(&self.cedula) {
            return Err(ImportError::MissingField("cedula"));
        }
        if blank(&self.nombres) {
            return Err(ImportError::MissingField("nombres"));
        }
        if blank(&self.apellidos) {
            return Err(ImportError::MissingField("apellidos"));
        }
        Ok(())
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Campo {
    Cedula,
    Nombres,
    Apellidos,
    NombreCompleto,
    FechaNacimiento,
    Sexo,
    Telefono,
    Email,
    Fecha,
    Motivo,
    Antecedentes,
    Diagnostico,
    Tratamiento,
    Observaciones,
}

const ETIQUETAS: &[(&str, Campo)] = &[
    ("cedula", Campo::Cedula),
    ("cedula de identidad", Campo::Cedula),
    ("ci", Campo::Cedula),
    ("c.i", Campo::Cedula),
    ("c.i.", Campo::Cedula),
    ("documento", Campo::Cedula),
    ("nombre", Campo::Nombres),
    ("nombres", Campo::Nombres),
    ("apellido", Campo::Apellidos),
    ("apellidos", Campo::Apellidos),
    ("paciente", Campo::NombreCompleto),
    ("nombre completo", Campo::NombreCompleto),
    ("nombre y apellido", Campo::NombreCompleto),
    ("nombres y apellidos", Campo::NombreCompleto),
    ("fecha de nacimiento", Campo::FechaNacimiento),
    ("f. nacimiento", Campo::FechaNacimiento),
    ("nacimiento", Campo::FechaNacimiento),
    ("sexo", Campo::Sexo),
    ("genero", Campo::Sexo),
    ("telefono", Campo::Telefono),
    ("tlf", Campo::Telefono),
    ("celular", Campo::Telefono),
    ("correo", Campo::Email),
    ("correo electronico", Campo::Email),
    ("email", Campo::Email),
    ("e-mail", Campo::Email),
    ("fecha", Campo::Fecha),
    ("fecha de consulta", Campo::Fecha),
    ("motivo", Campo::Motivo),
    ("motivo de consulta", Campo::Motivo),
    ("antecedentes", Campo::Antecedentes),
    ("diagnostico", Campo::Diagnostico),
    ("dx", Campo::Diagnostico),
    ("impresion diagnostica", Campo::Diagnostico),
    ("tratamiento", Campo::Tratamiento),
    ("plan", Campo::Tratamiento),
    ("indicaciones", Campo::Tratamiento),
    ("observaciones", Campo::Observaciones),
    ("notas", Campo::Observaciones),
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Lower-cases and strips diacritics so labels compare loosely.
pub(crate) fn normalizar(texto: &str) -> String {
    texto
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn campo_de(etiqueta: &str) -> Option<Campo> {
    let normal = normalizar(etiqueta);
    ETIQUETAS
        .iter()
        .find(|(alias, _)| *alias == normal)
        .map(|(_, campo)| *campo)
}

/// Splits `line` into a known label and its inline value.
fn separar(line: &str) -> Option<(Campo, &str)> {
    let (etiqueta, valor) = line.split_once(':')?;
    campo_de(etiqueta).map(|campo| (campo, valor.trim()))
}

/// Parses the paragraphs of a history document.
///
/// Text before the first recognised label is ignored. A label's value runs
/// until the next recognised label, so values may span several paragraphs.
pub fn parse_registro(paragraphs: &[String]) -> RegistroImportado {
    let mut valores: Vec<(Campo, String)> = Vec::new();

    for paragraph in paragraphs {
        for line in paragraph.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let line = line.replace('\t', " ");
            if let Some((campo, valor)) = separar(&line) {
                valores.push((campo, valor.to_string()));
            } else if let Some((_, actual)) = valores.last_mut() {
                if !actual.is_empty() {
                    actual.push('\n');
                }
                actual.push_str(line.trim());
            }
        }
    }

    let mut registro = RegistroImportado::default();
    let mut nombre_completo = None;

    for (campo, valor) in valores {
        let valor = valor.trim().to_string();
        if valor.is_empty() {
            continue;
        }
        match campo {
            Campo::Cedula => registro.cedula = Some(normalizar_cedula(&valor)),
            Campo::Nombres => registro.nombres = Some(valor),
            Campo::Apellidos => registro.apellidos = Some(valor),
            Campo::NombreCompleto => nombre_completo = Some(valor),
            Campo::FechaNacimiento => {
                registro.fecha_nacimiento =
                    fecha(&valor, "fecha de nacimiento", &mut registro.advertencias)
            }
            Campo::Sexo => registro.sexo = Some(normalizar_sexo(&valor)),
            Campo::Telefono => registro.telefono = Some(valor),
            Campo::Email => registro.email = Some(valor.to_lowercase()),
            Campo::Fecha => registro.fecha = fecha(&valor, "fecha", &mut registro.advertencias),
            Campo::Motivo => registro.motivo = Some(valor),
            Campo::Antecedentes => registro.antecedentes = Some(valor),
            Campo::Diagnostico => registro.diagnostico = Some(valor),
            Campo::Tratamiento => registro.tratamiento = Some(valor),
            Campo::Observaciones => registro.observaciones = Some(valor),
        }
    }

    if let Some(completo) = nombre_completo {
        if registro.nombres.is_none() || registro.apellidos.is_none() {
            let (nombres, apellidos) = dividir_nombre(&completo);
            registro.nombres = registro.nombres.take().or(nombres);
            registro.apellidos = registro.apellidos.take().or(apellidos);
        }
    }

    registro
}

fn fecha(valor: &str, etiqueta: &str, advertencias: &mut Vec<String>) -> Option<NaiveDate> {
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(valor, fmt).ok());
    if parsed.is_none() {
        advertencias.push(format!("unrecognised {etiqueta} '{valor}'"));
    }
    parsed
}

/// `v-12.345.678` -> `V-12345678`
pub fn normalizar_cedula(valor: &str) -> String {
    valor
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_uppercase()
}

fn normalizar_sexo(valor: &str) -> String {
    match normalizar(valor).as_str() {
        "m" | "masculino" | "hombre" => "M".to_string(),
        "f" | "femenino" | "mujer" => "F".to_string(),
        _ => valor.to_string(),
    }
}

/// "Apellidos, Nombres" when a comma is present; otherwise the first half of
/// the words (rounded up) are given names.
fn dividir_nombre(completo: &str) -> (Option<String>, Option<String>) {
    if let Some((apellidos, nombres)) = completo.split_once(',') {
        return (non_empty(nombres), non_empty(apellidos));
    }

    let palabras: Vec<&str> = completo.split_whitespace().collect();
    match palabras.len() {
        0 => (None, None),
        1 => (non_empty(palabras[0]), None),
        n => {
            let corte = n.div_ceil(2);
            (
                non_empty(&palabras[..corte].join(" ")),
                non_empty(&palabras[corte..].join(" ")),
            )
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_labelled_document() {
        let registro = parse_registro(&lines(&[
            "HISTORIA CLÍNICA",
            "Cédula: v-12.345.678",
            "Nombres: María José",
            "Apellidos: Pérez Gómez",
            "Fecha de Nacimiento: 04/11/1985",
            "Sexo: Femenino",
            "Correo Electrónico: MARIA@EXAMPLE.COM",
            "Fecha: 2024-02-10",
            "Motivo de consulta: Dolor torácico",
            "Diagnóstico: Angina estable",
            "Tratamiento: Aspirina 100mg",
            "Reposo relativo",
        ]));

        assert_eq!(registro.cedula.as_deref(), Some("V-12345678"));
        assert_eq!(registro.nombres.as_deref(), Some("María José"));
        assert_eq!(registro.apellidos.as_deref(), Some("Pérez Gómez"));
        assert_eq!(
            registro.fecha_nacimiento,
            NaiveDate::from_ymd_opt(1985, 11, 4)
        );
        assert_eq!(registro.sexo.as_deref(), Some("F"));
        assert_eq!(registro.email.as_deref(), Some("maria@example.com"));
        assert_eq!(registro.fecha, NaiveDate::from_ymd_opt(2024, 2, 10));
        assert_eq!(registro.motivo.as_deref(), Some("Dolor torácico"));
        assert_eq!(registro.diagnostico.as_deref(), Some("Angina estable"));
        assert_eq!(
            registro.tratamiento.as_deref(),
            Some("Aspirina 100mg\nReposo relativo")
        );
        assert!(registro.advertencias.is_empty());
        assert!(registro.validate().is_ok());
    }

    #[test]
    fn value_on_following_paragraph() {
        let registro = parse_registro(&lines(&["Diagnóstico:", "Hipertensión arterial"]));
        assert_eq!(
            registro.diagnostico.as_deref(),
            Some("Hipertensión arterial")
        );
    }

    #[test]
    fn full_name_with_comma_is_surname_first() {
        let registro = parse_registro(&lines(&["Paciente: Rodríguez Blanco, Carlos Andrés"]));
        assert_eq!(registro.nombres.as_deref(), Some("Carlos Andrés"));
        assert_eq!(registro.apellidos.as_deref(), Some("Rodríguez Blanco"));
    }

    #[test]
    fn full_name_without_comma_splits_in_half() {
        let registro = parse_registro(&lines(&["Nombre completo: Ana Lucía Torres"]));
        assert_eq!(registro.nombres.as_deref(), Some("Ana Lucía"));
        assert_eq!(registro.apellidos.as_deref(), Some("Torres"));
    }

    #[test]
    fn explicit_names_win_over_full_name() {
        let registro = parse_registro(&lines(&[
            "Paciente: Luis Mora",
            "Nombres: Luis Alberto",
        ]));
        assert_eq!(registro.nombres.as_deref(), Some("Luis Alberto"));
        assert_eq!(registro.apellidos.as_deref(), Some("Mora"));
    }

    #[test]
    fn unknown_labels_continue_previous_value() {
        let registro = parse_registro(&lines(&[
            "Observaciones: Control en 3 meses",
            "Nota adicional: traer exámenes",
        ]));
        assert_eq!(
            registro.observaciones.as_deref(),
            Some("Control en 3 meses\nNota adicional: traer exámenes")
        );
    }

    #[test]
    fn bad_dates_become_warnings() {
        let registro = parse_registro(&lines(&["Fecha: ayer"]));
        assert_eq!(registro.fecha, None);
        assert_eq!(registro.advertencias.len(), 1);
    }

    #[test]
    fn missing_identity_is_reported() {
        let registro = parse_registro(&lines(&["Nombres: Ana", "Apellidos: Ruiz"]));
        assert!(matches!(
            registro.validate(),
            Err(ImportError::MissingField("cedula"))
        ));
    }

    #[test]
    fn label_normalisation() {
        assert_eq!(normalizar("  Diagnóstico   Final "), "diagnostico final");
        assert_eq!(normalizar("AÑO"), "ano");
    }
}
