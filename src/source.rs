//! Record sources.

use crate::error::PipelineError;
use crate::models::Document;

use async_trait::async_trait;
use std::path::PathBuf;

/// Record source trait.
///
/// Defines the interface for sources of fitness records. A source is read once per job.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Read all documents.
    ///
    /// Failure to read is fatal to the job. Documents that are not valid records are returned
    /// as-is and rejected later, record by record.
    async fn read(&self) -> Result<Vec<Document>, PipelineError>;
}

/// Reads records from a JSON file.
///
/// The file may hold a single array of documents, a single document, or a sequence of documents
/// separated by whitespace (e.g. one per line). Top level arrays are flattened.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Returns a new JsonFileSource reading from a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    #[tracing::instrument(level = "DEBUG", skip(self), fields(path = %self.path.display()))]
    async fn read(&self) -> Result<Vec<Document>, PipelineError> {
        let path = self.path.display().to_string();
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|source| PipelineError::SourceRead {
                path: path.clone(),
                source,
            })?;
        parse_documents(&data).map_err(|source| PipelineError::SourceParse { path, source })
    }
}

/// Parse a stream of JSON values into documents, flattening top level arrays.
///
/// Numbers are kept as written, so a value outside the range of `f64` does not fail the parse. It
/// is rejected later with the series that holds it.
pub fn parse_documents(data: &[u8]) -> Result<Vec<Document>, serde_json::Error> {
    let mut documents = Vec::new();
    for value in serde_json::Deserializer::from_slice(data).into_iter::<Document>() {
        match value? {
            Document::Array(items) => documents.extend(items),
            document => documents.push(document),
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    use serde_json::json;

    #[test]
    fn parse_array() {
        let data = br#"[
            {"gender": "F", "sport": "run", "heart_rate": [100, 110]},
            {"gender": "M", "sport": "bike", "speed": [20.5]}
        ]"#;
        let documents = parse_documents(data).unwrap();
        assert_eq!(
            vec![
                json!({"gender": "F", "sport": "run", "heart_rate": [100, 110]}),
                json!({"gender": "M", "sport": "bike", "speed": [20.5]}),
            ],
            documents
        );
    }

    #[test]
    fn parse_lines() {
        let data = b"{\"gender\": \"F\"}\n{\"gender\": \"M\"}\n";
        let documents = parse_documents(data).unwrap();
        assert_eq!(vec![json!({"gender": "F"}), json!({"gender": "M"})], documents);
    }

    #[test]
    fn parse_single_object() {
        let documents = parse_documents(br#"{"gender": "F"}"#).unwrap();
        assert_eq!(vec![json!({"gender": "F"})], documents);
    }

    #[test]
    fn parse_empty() {
        assert!(parse_documents(b"").unwrap().is_empty());
        assert!(parse_documents(b"[]").unwrap().is_empty());
    }

    #[test]
    fn parse_keeps_non_objects() {
        let documents = parse_documents(b"[1, [2]] \"three\"").unwrap();
        assert_eq!(vec![json!(1), json!([2]), json!("three")], documents);
    }

    #[test]
    fn parse_out_of_range_number() {
        let data = br#"[
            {"gender": "F", "sport": "run", "heart_rate": [100, 110, 120], "speed": [10]},
            {"gender": "M", "sport": "run", "heart_rate": [1e400], "speed": [10]}
        ]"#;
        let documents = parse_documents(data).unwrap();
        assert_eq!(2, documents.len());
        assert_eq!(
            json!({"gender": "F", "sport": "run", "heart_rate": [100, 110, 120], "speed": [10]}),
            documents[0]
        );
        assert_eq!("1e400", documents[1]["heart_rate"][0].to_string());
    }

    #[test]
    fn parse_invalid() {
        assert!(parse_documents(b"[{\"gender\": ").is_err());
    }

    #[tokio::test]
    async fn read_json_file() {
        let path = test_utils::write_temp_file(
            r#"[{"gender": "F", "sport": "run", "heart_rate": [100, 110, 120]}]"#,
        );
        let source = JsonFileSource::new(&path);
        let documents = source.read().await.unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            vec![json!({"gender": "F", "sport": "run", "heart_rate": [100, 110, 120]})],
            documents
        );
    }

    #[tokio::test]
    async fn read_missing_file() {
        let source = JsonFileSource::new("/nonexistent/fitness.json");
        let error = source.read().await.unwrap_err();
        assert!(matches!(error, PipelineError::SourceRead { .. }));
        assert_eq!(
            "failed to read records from /nonexistent/fitness.json",
            error.to_string()
        );
    }

    #[tokio::test]
    async fn read_invalid_file() {
        let path = test_utils::write_temp_file("[{\"gender\": \"F\"},");
        let source = JsonFileSource::new(&path);
        let error = source.read().await.unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(error, PipelineError::SourceParse { .. }));
    }
}
