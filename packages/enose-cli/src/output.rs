use crate::exit_codes;
use std::io::Write;
use std::path::Path;

/// Print `value` as JSON to stdout, or write it to `output_path`
///
/// Returns the exit code; failures print one `Error:` line.
pub fn emit_json<T: serde::Serialize>(value: &T, compact: bool, output_path: Option<&str>) -> i32 {
    let encoded = if compact {
        serde_json::to_vec(value)
    } else {
        serde_json::to_vec_pretty(value)
    };
    let mut json = match encoded {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: cannot encode output: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let written = match output_path {
        Some(path) => std::fs::write(Path::new(path), &json)
            .map_err(|e| format!("cannot write '{}': {}", path, e)),
        None => {
            json.push(b'\n');
            std::io::stdout()
                .lock()
                .write_all(&json)
                .map_err(|e| format!("cannot write to stdout: {}", e))
        }
    };

    match written {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_compact_json_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let path = path.to_str().unwrap();

        let code = emit_json(&serde_json::json!({"ports": ["COM3"]}), true, Some(path));
        assert_eq!(code, exit_codes::SUCCESS);
        assert_eq!(std::fs::read_to_string(path).unwrap(), r#"{"ports":["COM3"]}"#);
    }

    #[test]
    fn test_unwritable_path_is_execution_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("session.json");

        let code = emit_json(&vec![1, 2], false, path.to_str());
        assert_eq!(code, exit_codes::EXECUTION_ERROR);
    }
}
