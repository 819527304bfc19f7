//! `dynactl config` commands

use anyhow::Result;
use serde::Serialize;
use std::process::ExitCode;
use tabled::Tabled;

use crate::config::{is_secret, ConfigKey, ConfigStore};
use crate::output::{mask, print_error, print_json, print_success, print_table, OutputFormat};

/// Row for the configuration listing
#[derive(Tabled, Serialize)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct ConfigValue<'a> {
    key: &'a str,
    value: Option<&'a str>,
}

fn parse_key(key: &str) -> Option<ConfigKey> {
    match key.parse::<ConfigKey>() {
        Ok(key) => Some(key),
        Err(e) => {
            print_error(&e.to_string());
            None
        }
    }
}

/// Show one value
pub fn get(store: &ConfigStore, key: &str, format: OutputFormat) -> Result<ExitCode> {
    let Some(key) = parse_key(key) else {
        return Ok(ExitCode::FAILURE);
    };
    let value = store.get(key);

    match format {
        OutputFormat::Json => print_json(&ConfigValue {
            key: key.as_str(),
            value,
        })?,
        OutputFormat::Table => println!("$ [{}]: {}", key, value.unwrap_or("<unset>")),
    }
    Ok(ExitCode::SUCCESS)
}

/// Validate and persist a value
pub fn set(store: &mut ConfigStore, key: &str, value: &str) -> Result<ExitCode> {
    let Some(key) = parse_key(key) else {
        return Ok(ExitCode::FAILURE);
    };

    if let Err(e) = key.validate(value) {
        print_error(&e.to_string());
        return Ok(ExitCode::FAILURE);
    }

    store.set(key, value)?;
    let shown = if is_secret(key.as_str()) { mask(value) } else { value.to_string() };
    print_success(&format!("Updated property [{}]: {}", key, shown));
    Ok(ExitCode::SUCCESS)
}

/// Remove a value
pub fn unset(store: &mut ConfigStore, key: &str) -> Result<ExitCode> {
    let Some(key) = parse_key(key) else {
        return Ok(ExitCode::FAILURE);
    };

    store.unset(key)?;
    print_success(&format!("Property [{}] unset", key));
    Ok(ExitCode::SUCCESS)
}

/// List every stored value, masking secrets
pub fn list(store: &ConfigStore, format: OutputFormat) -> Result<ExitCode> {
    let rows: Vec<ConfigRow> = store
        .entries()
        .map(|(key, value)| ConfigRow {
            key: key.to_string(),
            value: if is_secret(key) { mask(value) } else { value.to_string() },
        })
        .collect();

    if rows.is_empty() && format == OutputFormat::Table {
        println!("No configuration settings found.");
        return Ok(ExitCode::SUCCESS);
    }

    if format == OutputFormat::Table {
        println!("Current configuration ({}):", store.path().display());
    }
    print_table(&rows, format)?;
    Ok(ExitCode::SUCCESS)
}
