//! Plain-text extraction from `word/document.xml`.

use crate::error::{ImportError, Result};
use roxmltree::{Document, Node};
use std::io::{Cursor, Read};

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DOCUMENT_PART: &str = "word/document.xml";

/// Upper bound on the inflated size of `word/document.xml`.
pub const MAX_DOCUMENT_XML_BYTES: u64 = 32 * 1024 * 1024;

/// Returns the document's paragraphs in order, one string per `w:p`.
///
/// Tabs become `\t` and explicit breaks become `\n`. Empty paragraphs are
/// kept so callers can see blank lines.
pub fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>> {
    extract_paragraphs_limited(bytes, MAX_DOCUMENT_XML_BYTES)
}

fn extract_paragraphs_limited(bytes: &[u8], limit: u64) -> Result<Vec<String>> {
    if !bytes.starts_with(b"PK") {
        return Err(ImportError::NotADocx(
            "payload is not a ZIP container".to_string(),
        ));
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut raw = Vec::new();
    {
        let part = archive.by_name(DOCUMENT_PART).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => {
                ImportError::NotADocx(format!("missing {DOCUMENT_PART}"))
            }
            other => ImportError::Zip(other),
        })?;
        if part.size() > limit {
            return Err(ImportError::TooLarge(limit));
        }
        // The declared size can lie; never inflate past the limit.
        part.take(limit + 1).read_to_end(&mut raw)?;
        if raw.len() as u64 > limit {
            return Err(ImportError::TooLarge(limit));
        }
    }

    let xml = String::from_utf8(raw)
        .map_err(|_| ImportError::NotADocx(format!("{DOCUMENT_PART} is not UTF-8")))?;
    paragraphs_from_xml(&xml)
}

pub(crate) fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>> {
    let doc = Document::parse(xml)?;

    Ok(doc
        .descendants()
        .filter(|n| is_word(n, "p"))
        .map(|p| paragraph_text(&p))
        .collect())
}

fn is_word(node: &Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(WORD_NS)
}

fn paragraph_text(paragraph: &Node<'_, '_>) -> String {
    let mut out = String::new();
    push_runs(paragraph, &mut out);
    out
}

fn push_runs(parent: &Node<'_, '_>, out: &mut String) {
    for node in parent.children().filter(|n| n.is_element()) {
        if node.tag_name().namespace() == Some(WORD_NS) {
            match node.tag_name().name() {
                // Text boxes nest whole paragraphs; those are emitted on their own.
                "p" => continue,
                "t" => {
                    out.push_str(node.text().unwrap_or_default());
                    continue;
                }
                "tab" => {
                    out.push('\t');
                    continue;
                }
                "br" | "cr" => {
                    out.push('\n');
                    continue;
                }
                _ => {}
            }
        }
        push_runs(&node, out);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn document_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"{WORD_NS}\"><w:body>{body}</w:body></w:document>"
        )
    }

    pub(crate) fn build_docx(xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file(DOCUMENT_PART, options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_runs_tabs_and_breaks() {
        let xml = format!(
            "<w:document xmlns:w=\"{WORD_NS}\"><w:body>\
               <w:p><w:r><w:t>Nombre:</w:t></w:r><w:r><w:tab/><w:t>Ana</w:t></w:r></w:p>\
               <w:p><w:r><w:t>Linea 1</w:t><w:br/><w:t>Linea 2</w:t></w:r></w:p>\
               <w:p/>\
             </w:body></w:document>"
        );
        let paragraphs = paragraphs_from_xml(&xml).unwrap();
        assert_eq!(paragraphs, vec!["Nombre:\tAna", "Linea 1\nLinea 2", ""]);
    }

    #[test]
    fn nested_text_box_paragraphs_are_not_duplicated() {
        let xml = format!(
            "<w:document xmlns:w=\"{WORD_NS}\"><w:body>\
               <w:p><w:r><w:t>Exterior</w:t><w:txbxContent>\
                 <w:p><w:r><w:t>Interior</w:t></w:r></w:p>\
               </w:txbxContent></w:r></w:p>\
             </w:body></w:document>"
        );
        let paragraphs = paragraphs_from_xml(&xml).unwrap();
        assert_eq!(paragraphs, vec!["Exterior", "Interior"]);
    }

    #[test]
    fn reads_document_part_from_archive() {
        let bytes = build_docx(&document_xml(&["Hola", "Mundo"]));
        assert_eq!(extract_paragraphs(&bytes).unwrap(), vec!["Hola", "Mundo"]);
    }

    #[test]
    fn oversized_document_part_is_not_inflated() {
        let filler = "x".repeat(4096);
        let xml = document_xml(&[filler.as_str()]);

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        writer.start_file(DOCUMENT_PART, options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(bytes.len() < 1024, "fixture should compress well");

        let err = extract_paragraphs_limited(&bytes, 1024).unwrap_err();
        assert!(matches!(err, ImportError::TooLarge(1024)));
        assert!(extract_paragraphs_limited(&bytes, MAX_DOCUMENT_XML_BYTES).is_ok());
    }

    #[test]
    fn deeply_nested_runs_are_collected_once() {
        let depth = 500;
        let open = "<w:sdt>".repeat(depth);
        let close = "</w:sdt>".repeat(depth);
        let xml = format!(
            "<w:document xmlns:w=\"{WORD_NS}\"><w:body>\
               <w:p>{open}<w:r><w:t>Profundo</w:t></w:r>{close}</w:p>\
             </w:body></w:document>"
        );
        let paragraphs = paragraphs_from_xml(&xml).unwrap();
        assert_eq!(paragraphs, vec!["Profundo"]);
    }

    #[test]
    fn rejects_non_zip_payload() {
        let err = extract_paragraphs(b"{\\rtf1 hola}").unwrap_err();
        assert!(matches!(err, ImportError::NotADocx(_)));
    }

    #[test]
    fn rejects_archive_without_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("otro.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"x").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(
            extract_paragraphs(&bytes),
            Err(ImportError::NotADocx(_))
        ));
    }
}
