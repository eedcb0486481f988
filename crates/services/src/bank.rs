//! Question bank input.
//!
//! A bank is a JSON array. Each record carries a `prompt`, an optional numeric `id`, and
//! its `options` either as `{ "text", "is_correct" }` objects or as plain strings plus a
//! `correct` text.

use std::path::Path;

use quiz_core::model::RawQuestion;

use crate::error::BankLoadError;

/// Parse a bank from JSON text. Records are not validated here.
///
/// # Errors
///
/// Returns `BankLoadError::Json` if the text is not a JSON array of records.
pub fn parse_bank(json: &str) -> Result<Vec<RawQuestion>, BankLoadError> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a bank file.
///
/// # Errors
///
/// Returns `BankLoadError::Io` if the file cannot be read and `BankLoadError::Json` if it
/// cannot be parsed.
pub fn load_bank(path: &Path) -> Result<Vec<RawQuestion>, BankLoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| BankLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bank(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::AnswerOption;

    #[test]
    fn parses_keyed_records() {
        let bank = parse_bank(
            r#"[{"prompt": "2 + 2?", "options": ["3", "4"], "correct": "4"}]"#,
        )
        .unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank[0].options[1], AnswerOption::correct("4"));
    }

    #[test]
    fn rejects_non_array_input() {
        assert!(matches!(
            parse_bank(r#"{"prompt": "x"}"#),
            Err(BankLoadError::Json(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_bank(Path::new("/definitely/not/here.json")).unwrap_err();
        match err {
            BankLoadError::Io { path, .. } => {
                assert_eq!(path, Path::new("/definitely/not/here.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
