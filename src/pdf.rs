//! PDF text extraction
//!
//! Extracts per-page text from the source document using lopdf. Pages are
//! kept separate because each page is chunked and embedded on its own.

use crate::errors::AppError;
use std::path::Path;
use tracing::{debug, warn};

/// Text extracted from a single page
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    /// 1-based page number
    pub number: u32,
    pub text: String,
}

/// Extract per-page text content from a PDF file
pub fn extract_pages(path: &Path) -> Result<Vec<PdfPage>, AppError> {
    let doc = lopdf::Document::load(path).map_err(|e| {
        AppError::DocumentParseError(format!("{}: {}", path.display(), e))
    })?;

    let page_map = doc.get_pages();
    debug!(page_count = page_map.len(), "Extracting text from PDF");

    let mut pages = Vec::with_capacity(page_map.len());
    for (page_num, page_id) in page_map.iter() {
        let content = match doc.get_page_content(*page_id) {
            Ok(content) => content,
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to read page content, skipping");
                continue;
            }
        };

        let text = clean_text(&extract_text_from_content(&content));
        if text.is_empty() {
            debug!(page = page_num, "Page has no extractable text");
            continue;
        }

        pages.push(PdfPage {
            number: *page_num,
            text,
        });
    }

    if pages.is_empty() {
        return Err(AppError::DocumentEmpty(path.display().to_string()));
    }

    Ok(pages)
}

/// Extract text from a PDF content stream by walking BT/ET blocks
fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            // Text showing operators: Tj, TJ, ', "
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    // Flush any block left open by a malformed stream
    if !current_text.is_empty() {
        text.push_str(&current_text);
    }

    text
}

/// Extract the string arguments of a text showing operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // (text) Tj, and the ' and " variants with leading parameters
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
            if start < end {
                return Some(decode_pdf_string(&line[start + 1..end]));
            }
        }
    }

    // [(text) kern (text) ...] TJ
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut current = String::new();
        let mut in_paren = false;
        let mut escaped = false;

        for ch in line.chars() {
            if !in_paren {
                if ch == '(' {
                    in_paren = true;
                }
                continue;
            }
            if escaped {
                current.push(ch);
                escaped = false;
            } else if ch == '\\' {
                current.push(ch);
                escaped = true;
            } else if ch == ')' {
                in_paren = false;
                result.push_str(&decode_pdf_string(&current));
                current.clear();
            } else {
                current.push(ch);
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF literal string escapes, including octal codes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('b') => result.push('\u{0008}'),
            Some('f') => result.push('\u{000C}'),
            Some('(') => result.push('('),
            Some(')') => result.push(')'),
            Some('\\') => result.push('\\'),
            Some(d @ '0'..='7') => {
                // \ddd octal escape, up to three digits
                let mut code = d as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&c) if ('0'..='7').contains(&c) => {
                            code = code * 8 + (c as u32 - '0' as u32);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if let Some(c) = char::from_u32(code) {
                    result.push(c);
                }
            }
            Some(c) => result.push(c),
            None => {}
        }
    }

    result
}

/// Collapse whitespace and normalize common PDF artifacts
fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Write a small generated PDF with one page per entry, for tests.
#[cfg(test)]
pub(crate) fn write_sample_pdf(path: &Path, page_texts: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
