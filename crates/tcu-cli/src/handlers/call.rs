//! Raw call command handler

use super::{connect, interrupted};
use crate::cli::CallArgs;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use anyhow::Context;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tcu_core::{ParamBlock, ParamBlocks, ParamValue, TcuConfig};

/// Handle the call command
pub async fn handle_call(args: CallArgs, config: &TcuConfig, output: &mut OutputWriter) -> Result<()> {
    let blocks = match &args.batch {
        Some(path) => load_batch(path)?,
        None => ParamBlocks::from(block_from_pairs(&args.params)),
    };
    let method = tcu_core::Method::from(args.method);

    output.info(&format!(
        "{} {} ({} parameter block(s))",
        method,
        args.path,
        blocks.len()
    ))?;

    let client = connect(config, output).await?;
    let spinner = output.spinner(&format!("Calling {}...", args.path));
    let result = client
        .pipeline()
        .execute_with_cancel(&args.path, &blocks, method, interrupted())
        .await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let exchange = result?;

    output.success(&format!(
        "✓ HTTP {} in {} ms",
        exchange.status,
        exchange.elapsed.as_millis()
    ))?;
    if let Some(id) = exchange.record_id {
        output.debug(&format!("call log record {}", id))?;
    }
    for failure in &exchange.logging_failures {
        output.warning(&format!("call log write failed: {}", failure))?;
    }

    output.data(&exchange.body)
}

/// Group `-p key=value` pairs into one block; repeated keys become repeated fields
fn block_from_pairs(pairs: &[(String, String)]) -> ParamBlock {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in pairs {
        match grouped.iter_mut().find(|(name, _)| name == key) {
            Some((_, values)) => values.push(value.clone()),
            None => grouped.push((key.clone(), vec![value.clone()])),
        }
    }

    grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                ParamValue::Single(values.remove(0))
            } else {
                ParamValue::Multiple(values)
            };
            (key, value)
        })
        .collect()
}

/// Read a JSON or YAML array of objects, one parameter block per object
fn load_batch(path: &Path) -> Result<ParamBlocks> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false);

    let value: Value = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };

    let records = match value {
        Value::Array(records) => records,
        single @ Value::Object(_) => vec![single],
        _ => {
            return Err(Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: "an array of parameter objects".to_string(),
            })
        }
    };

    let blocks = records
        .iter()
        .enumerate()
        .map(|(i, record)| block_from_value(record).with_context(|| format!("{}: record {}", path.display(), i)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(ParamBlocks::from(blocks))
}

fn block_from_value(record: &Value) -> anyhow::Result<ParamBlock> {
    let fields = record
        .as_object()
        .context("expected an object of field names to values")?;

    let mut block = ParamBlock::new();
    for (key, value) in fields {
        let value = match value {
            Value::Array(items) => ParamValue::Multiple(
                items
                    .iter()
                    .map(scalar_text)
                    .collect::<anyhow::Result<_>>()
                    .with_context(|| format!("field '{}'", key))?,
            ),
            other => ParamValue::Single(scalar_text(other).with_context(|| format!("field '{}'", key))?),
        };
        block.insert(key.as_str(), value);
    }
    Ok(block)
}

fn scalar_text(value: &Value) -> anyhow::Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => anyhow::bail!("nested values are not supported"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::Builder;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_repeated_pairs_group_in_first_seen_order() {
        let block = block_from_pairs(&[
            pair("f4indexno", "A"),
            pair("Category", "A"),
            pair("f4indexno", "B"),
        ]);

        assert_eq!(
            block.fields(),
            &[
                ("f4indexno".to_string(), ParamValue::Multiple(vec!["A".into(), "B".into()])),
                ("Category".to_string(), ParamValue::Single("A".into())),
            ]
        );
    }

    #[test]
    fn test_json_batch_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"f4indexno": "S0123/0001/2019", "Category": "A"}},
                {{"f4indexno": "S0123/0002/2019", "Males": 12, "Programmes": ["UD023", "UD010"]}}]"#
        )
        .unwrap();

        let blocks = load_batch(file.path()).unwrap();
        assert_eq!(blocks.len(), 2);
        let second = &blocks.blocks()[1];
        assert_eq!(second.fields()[0].0, "f4indexno");
        assert_eq!(second.get("Males"), Some(&ParamValue::Single("12".into())));
        assert_eq!(second.get("Programmes").unwrap().values(), &["UD023", "UD010"]);
    }

    #[test]
    fn test_yaml_batch_file_with_single_record() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "ProgrammeCode: UD023\nMales: 3\n").unwrap();

        let blocks = load_batch(file.path()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.blocks()[0].get("Males"), Some(&ParamValue::Single("3".into())));
    }

    #[test]
    fn test_nested_batch_values_are_rejected() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"Applicant": {{"f4indexno": "A"}}}}]"#).unwrap();

        let err = load_batch(file.path()).unwrap_err();
        let message = format!("{:#}", match err {
            Error::Other(e) => e,
            other => panic!("unexpected error: {other}"),
        });
        assert!(message.contains("record 0"));
        assert!(message.contains("nested values"));
    }
}
