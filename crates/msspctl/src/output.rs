//! Result printing for `-o json` and `-o table`

use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result as CliResult;

#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> CliResult<()> {
    let json_value = serde_json::to_value(data)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Table => {
            println!("{}", render_table(&json_value));
        }
    }

    Ok(())
}

/// Render arrays of objects as one row per object, objects as key/value pairs
fn render_table(value: &Value) -> String {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            let mut table = Table::new();

            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            table.to_string()
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_value(val)]);
            }

            table.to_string()
        }
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_rows_follow_first_object_keys() {
        let rendered = render_table(&json!([
            {"softwareVersion": "7.4.2", "isSuggestedVersion": true},
            {"softwareVersion": "7.6.0", "isSuggestedVersion": false}
        ]));

        assert!(rendered.contains("softwareVersion"));
        assert!(rendered.contains("7.4.2"));
        assert!(rendered.contains("7.6.0"));
    }

    #[test]
    fn test_object_renders_as_key_value() {
        let rendered = render_table(&json!({"state": "DONE", "message": null}));
        assert!(rendered.contains("Key"));
        assert!(rendered.contains("DONE"));
    }

    #[test]
    fn test_format_nested_values() {
        assert_eq!(format_value(&json!([1, 2, 3])), "[3 items]");
        assert_eq!(format_value(&json!({"a": 1})), "{1 fields}");
        assert_eq!(format_value(&Value::Null), "-");
    }
}
