//! Finance report exports.

use crate::{services::pdf::escape_html, Error, Result};
use clinica_core::{FilaFinanzas, FiltroFinanzas, ResumenFinanzas, Subtotal};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::Deserialize;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatoExport {
    #[default]
    Xlsx,
    Pdf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub formato: FormatoExport,
}

/// A generated file ready to be served as an attachment.
#[derive(Debug, Clone)]
pub struct Archivo {
    pub nombre: String,
    pub content_type: &'static str,
    pub contenido: Vec<u8>,
}

const DETALLE_HEADERS: [&str; 12] = [
    "Fecha",
    "Paciente",
    "Cédula",
    "Médico",
    "Especialidad",
    "Moneda",
    "Método de pago",
    "Estado de pago",
    "Tasa",
    "Total USD",
    "Total Bs",
    "Consulta",
];

fn numero(d: Decimal) -> f64 {
    d.to_f64().unwrap_or_default()
}

fn xlsx_error(e: XlsxError) -> Error {
    Error::Export(e.to_string())
}

pub fn xlsx(filas: &[FilaFinanzas], resumen: &ResumenFinanzas) -> Result<Vec<u8>> {
    build_workbook(filas, resumen).map_err(xlsx_error)
}

fn build_workbook(
    filas: &[FilaFinanzas],
    resumen: &ResumenFinanzas,
) -> std::result::Result<Vec<u8>, XlsxError> {
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");
    let rate = Format::new().set_num_format("#,##0.0000");
    let date = Format::new().set_num_format("dd/mm/yyyy hh:mm");

    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet().set_name("Detalle")?;
        for (col, header) in DETALLE_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }

        for (i, fila) in filas.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_datetime_with_format(row, 0, &fila.fecha.naive_utc(), &date)?;
            sheet.write_string(row, 1, &fila.paciente)?;
            sheet.write_string(row, 2, &fila.paciente_cedula)?;
            sheet.write_string(row, 3, &fila.medico)?;
            sheet.write_string(row, 4, fila.especialidad.as_deref().unwrap_or(""))?;
            sheet.write_string(row, 5, fila.moneda.as_str())?;
            sheet.write_string(row, 6, fila.metodo_pago.map(|m| m.as_str()).unwrap_or(""))?;
            sheet.write_string(row, 7, fila.estado_pago.as_str())?;
            if let Some(tasa) = fila.tasa_cambio {
                sheet.write_number_with_format(row, 8, numero(tasa), &rate)?;
            }
            sheet.write_number_with_format(row, 9, numero(fila.total_usd), &money)?;
            if let Some(bs) = fila.total_bs {
                sheet.write_number_with_format(row, 10, numero(bs), &money)?;
            }
            sheet.write_string(row, 11, fila.consulta_id.to_string())?;
        }

        sheet.set_column_width(0, 17)?;
        sheet.set_column_width(1, 28)?;
        sheet.set_column_width(3, 28)?;
        sheet.set_column_width(4, 20)?;
        sheet.set_column_width(11, 38)?;
    }

    {
        let sheet = workbook.add_worksheet().set_name("Resumen")?;
        sheet.write_string_with_format(0, 0, "Consultas", &bold)?;
        sheet.write_number(0, 1, resumen.cantidad as f64)?;
        sheet.write_string_with_format(1, 0, "Total USD", &bold)?;
        sheet.write_number_with_format(1, 1, numero(resumen.total_usd), &money)?;
        sheet.write_string_with_format(2, 0, "Total Bs", &bold)?;
        sheet.write_number_with_format(2, 1, numero(resumen.total_bs), &money)?;
        sheet.write_string_with_format(3, 0, "Pendiente USD", &bold)?;
        sheet.write_number_with_format(3, 1, numero(resumen.pendiente_usd), &money)?;

        let mut row = 5;
        for (titulo, grupos) in [
            ("Por moneda", &resumen.por_moneda),
            ("Por médico", &resumen.por_medico),
            ("Por especialidad", &resumen.por_especialidad),
            ("Por estado de pago", &resumen.por_estado_pago),
        ] {
            row = write_grupo(sheet, row, titulo, grupos, &bold, &money)? + 1;
        }
        sheet.set_column_width(0, 30)?;
        sheet.set_column_width(1, 14)?;
        sheet.set_column_width(2, 14)?;
        sheet.set_column_width(3, 14)?;
    }

    workbook.save_to_buffer()
}

fn write_grupo(
    sheet: &mut Worksheet,
    mut row: u32,
    titulo: &str,
    grupos: &[Subtotal],
    bold: &Format,
    money: &Format,
) -> std::result::Result<u32, XlsxError> {
    sheet.write_string_with_format(row, 0, titulo, bold)?;
    sheet.write_string_with_format(row, 1, "Consultas", bold)?;
    sheet.write_string_with_format(row, 2, "Total USD", bold)?;
    sheet.write_string_with_format(row, 3, "Total Bs", bold)?;
    row += 1;
    for grupo in grupos {
        sheet.write_string(row, 0, &grupo.etiqueta)?;
        sheet.write_number(row, 1, grupo.cantidad as f64)?;
        sheet.write_number_with_format(row, 2, numero(grupo.total_usd), money)?;
        sheet.write_number_with_format(row, 3, numero(grupo.total_bs), money)?;
        row += 1;
    }
    Ok(row)
}

/// The report as an HTML document for the PDF renderer.
pub fn html(
    clinica: &str,
    filtro: &FiltroFinanzas,
    filas: &[FilaFinanzas],
    resumen: &ResumenFinanzas,
) -> String {
    let periodo = match (filtro.desde, filtro.hasta) {
        (Some(d), Some(h)) => format!("{} al {}", d.format("%d/%m/%Y"), h.format("%d/%m/%Y")),
        (Some(d), None) => format!("desde {}", d.format("%d/%m/%Y")),
        (None, Some(h)) => format!("hasta {}", h.format("%d/%m/%Y")),
        (None, None) => "todas las fechas".to_string(),
    };

    let cabecera: String = DETALLE_HEADERS[..11]
        .iter()
        .map(|h| format!("<th>{h}</th>"))
        .collect();

    let detalle: String = filas
        .iter()
        .map(|f| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"n\">{}</td><td class=\"n\">{:.2}</td><td class=\"n\">{}</td></tr>",
                f.fecha.format("%d/%m/%Y"),
                escape_html(&f.paciente),
                escape_html(&f.paciente_cedula),
                escape_html(&f.medico),
                escape_html(f.especialidad.as_deref().unwrap_or("")),
                f.moneda,
                f.metodo_pago.map(|m| m.as_str()).unwrap_or(""),
                f.estado_pago,
                f.tasa_cambio.map(|t| t.to_string()).unwrap_or_default(),
                f.total_usd,
                f.total_bs.map(|b| format!("{b:.2}")).unwrap_or_default(),
            )
        })
        .collect();

    let por_medico: String = resumen
        .por_medico
        .iter()
        .map(|g| {
            format!(
                "<tr><td>{}</td><td class=\"n\">{}</td><td class=\"n\">{:.2}</td><td class=\"n\">{:.2}</td></tr>",
                escape_html(&g.etiqueta),
                g.cantidad,
                g.total_usd,
                g.total_bs
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>Reporte financiero</title>
<style>
body {{ font-family: sans-serif; font-size: 9pt; margin: 1cm; }}
table {{ border-collapse: collapse; width: 100%; margin-bottom: 1.5em; }}
th, td {{ border: 1px solid #999; padding: 3px 5px; }}
th {{ background: #eee; }}
.n {{ text-align: right; }}
</style>
</head>
<body>
<h1>{clinica}: reporte financiero</h1>
<p>Periodo: {periodo}</p>
<p>Consultas: {cantidad} &middot; Total USD: {total_usd:.2} &middot; Total Bs: {total_bs:.2} &middot; Pendiente USD: {pendiente:.2}</p>
<table>
<thead><tr>{cabecera}</tr></thead>
<tbody>{detalle}</tbody>
</table>
<h2>Por médico</h2>
<table>
<thead><tr><th>Médico</th><th>Consultas</th><th>Total USD</th><th>Total Bs</th></tr></thead>
<tbody>{por_medico}</tbody>
</table>
</body>
</html>"#,
        clinica = escape_html(clinica),
        cantidad = resumen.cantidad,
        total_usd = resumen.total_usd,
        total_bs = resumen.total_bs,
        pendiente = resumen.pendiente_usd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clinica_core::{agregar, EstadoPago, MetodoPago, Moneda};
    use std::io::{Cursor, Read};
    use std::str::FromStr;
    use uuid::Uuid;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn filas() -> Vec<FilaFinanzas> {
        let medico_id = Uuid::new_v4();
        vec![
            FilaFinanzas {
                consulta_id: Uuid::new_v4(),
                fecha: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                paciente: "Ana Pérez".to_string(),
                paciente_cedula: "V12345678".to_string(),
                medico_id,
                medico: "Luis Gómez".to_string(),
                especialidad_id: None,
                especialidad: Some("Cardiología".to_string()),
                moneda: Moneda::Ves,
                metodo_pago: Some(MetodoPago::PagoMovil),
                estado_pago: EstadoPago::Pagado,
                tasa_cambio: Some(d("36.5")),
                total_usd: d("40.00"),
                total_bs: Some(d("1460.00")),
            },
            FilaFinanzas {
                consulta_id: Uuid::new_v4(),
                fecha: Utc.with_ymd_and_hms(2024, 3, 2, 11, 0, 0).unwrap(),
                paciente: "José <Rivas>".to_string(),
                paciente_cedula: "V7654321".to_string(),
                medico_id,
                medico: "Luis Gómez".to_string(),
                especialidad_id: None,
                especialidad: None,
                moneda: Moneda::Usd,
                metodo_pago: None,
                estado_pago: EstadoPago::Pendiente,
                tasa_cambio: None,
                total_usd: d("25.50"),
                total_bs: None,
            },
        ]
    }

    #[test]
    fn workbook_has_detail_and_summary_sheets() {
        let filas = filas();
        let resumen = agregar(&filas, &FiltroFinanzas::default());
        let bytes = xlsx(&filas, &resumen).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut workbook_xml = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut workbook_xml)
            .unwrap();
        assert!(workbook_xml.contains("name=\"Detalle\""));
        assert!(workbook_xml.contains("name=\"Resumen\""));
    }

    #[test]
    fn html_report_escapes_names_and_totals() {
        let filas = filas();
        let resumen = agregar(&filas, &FiltroFinanzas::default());
        let filtro = FiltroFinanzas {
            desde: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
            hasta: chrono::NaiveDate::from_ymd_opt(2024, 3, 31),
            ..Default::default()
        };
        let doc = html("Central & Asociados", &filtro, &filas, &resumen);
        assert!(doc.contains("Central &amp; Asociados"));
        assert!(doc.contains("José &lt;Rivas&gt;"));
        assert!(doc.contains("01/03/2024 al 31/03/2024"));
        assert!(doc.contains("Total USD: 65.50"));
        assert!(doc.contains("pago_movil"));
    }

    #[test]
    fn export_format_defaults_to_xlsx() {
        let q: ExportQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.formato, FormatoExport::Xlsx);
        let q: ExportQuery = serde_json::from_str(r#"{"formato":"pdf"}"#).unwrap();
        assert_eq!(q.formato, FormatoExport::Pdf);
    }
}
