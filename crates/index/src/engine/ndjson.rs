//! Newline-delimited JSON codec for bulk imports.
//!
//! A bulk import sends one document per line and receives one result per
//! line. Each response line is decoded on its own, so a malformed line
//! fails only the document at that position.

use crate::document::Document;

use super::ImportResult;

/// Encodes documents as one JSON object per line.
pub fn encode_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(Document::to_json_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes an import response against the documents that were sent.
///
/// Always returns exactly `documents.len()` results. Missing lines and lines
/// that are not valid result objects become failures for the document at
/// that position; surplus lines are ignored.
pub fn decode_import_response(body: &str, documents: &[Document]) -> Vec<ImportResult> {
    let mut lines = body.lines().filter(|line| !line.trim().is_empty());

    let results: Vec<ImportResult> = documents
        .iter()
        .map(|doc| match lines.next() {
            Some(line) => decode_line(line, doc),
            None => ImportResult::rejected(doc.id(), "no result returned for document"),
        })
        .collect();

    let surplus = lines.count();
    if surplus > 0 {
        tracing::debug!(surplus, "Ignoring surplus lines in import response");
    }

    results
}

fn decode_line(line: &str, doc: &Document) -> ImportResult {
    match serde_json::from_str::<ImportResult>(line) {
        Ok(mut result) => {
            if result.id.is_none() {
                result.id = Some(doc.id().to_string());
            }
            result
        }
        Err(e) => {
            let mut result =
                ImportResult::rejected(doc.id(), format!("malformed response line: {}", e));
            result.document = Some(line.to_string());
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(ids: &[&str]) -> Vec<Document> {
        ids.iter()
            .map(|id| Document::new(json!({"id": id, "name": format!("item {}", id)})).unwrap())
            .collect()
    }

    #[test]
    fn test_encode_one_line_per_document() {
        let body = encode_documents(&docs(&["1", "2", "3"]));
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "1");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_documents(&[]), "");
    }

    #[test]
    fn test_decode_mixed_results() {
        let documents = docs(&["1", "2", "3"]);
        let body = concat!(
            "{\"success\":true}\n",
            "{\"success\":false,\"error\":\"Bad JSON.\",\"code\":400}\n",
            "{\"success\":true,\"id\":\"3\"}\n"
        );
        let results = decode_import_response(body, &documents);
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert_eq!(results[0].id.as_deref(), Some("1"));
        assert!(!results[1].success);
        assert_eq!(results[1].id.as_deref(), Some("2"));
        assert_eq!(results[1].reason(), "Bad JSON.");
        assert!(results[2].success);
    }

    #[test]
    fn test_malformed_line_fails_only_its_document() {
        let documents = docs(&["1", "2", "3"]);
        let body = "{\"success\":true}\n<html>oops</html>\n{\"success\":true}";
        let results = decode_import_response(body, &documents);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].reason().starts_with("malformed response line"));
        assert_eq!(results[1].document.as_deref(), Some("<html>oops</html>"));
        assert!(results[2].success);
    }

    #[test]
    fn test_short_response_pads_failures() {
        let documents = docs(&["1", "2"]);
        let results = decode_import_response("{\"success\":true}\n", &documents);
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let documents = docs(&["1"]);
        let results = decode_import_response("\n\n{\"success\":true}\n\n", &documents);
        assert!(results[0].success);
    }
}
