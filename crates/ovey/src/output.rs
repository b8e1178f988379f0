use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ovey_ocp::{DeviceInfo, EchoReport, Family};
use serde::Serialize;

use crate::exit::{CliError, CliResult, INTERNAL};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Messages the kernel returned for a device command.
#[derive(Debug, Serialize)]
pub struct DeviceMessages {
    pub schema_id: &'static str,
    pub operation: &'static str,
    pub device: String,
    pub messages: Vec<String>,
}

impl DeviceMessages {
    pub fn new(operation: &'static str, device: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            schema_id: "ovey/cli/v1/device-messages",
            operation,
            device: device.into(),
            messages,
        }
    }
}

#[derive(Serialize)]
struct DeviceInfoOutput<'a> {
    schema_id: &'static str,
    #[serde(flatten)]
    info: &'a DeviceInfo,
}

#[derive(Serialize)]
struct FamiliesOutput<'a> {
    schema_id: &'static str,
    families: &'a [Family],
}

#[derive(Serialize)]
struct EchoOutput<'a> {
    schema_id: &'static str,
    module_loaded: bool,
    #[serde(flatten)]
    report: &'a EchoReport,
}

pub fn print_messages(out: &DeviceMessages, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(out)?,
        OutputFormat::Table => {
            let mut table = new_table(vec!["OPERATION", "DEVICE", "MESSAGE"]);
            if out.messages.is_empty() {
                table.add_row(vec![out.operation, out.device.as_str(), "-"]);
            }
            for message in &out.messages {
                table.add_row(vec![out.operation, out.device.as_str(), message.as_str()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} {}: ok", out.operation, out.device);
            for message in &out.messages {
                println!("  {message}");
            }
        }
    }
    Ok(())
}

pub fn print_device_info(info: &DeviceInfo, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&DeviceInfoOutput {
            schema_id: "ovey/cli/v1/device-info",
            info,
        })?,
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, value) in device_fields(info) {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (field, value) in device_fields(info) {
                println!("{field}: {value}");
            }
        }
    }
    Ok(())
}

pub fn print_families(families: &[Family], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&FamiliesOutput {
            schema_id: "ovey/cli/v1/families",
            families,
        })?,
        OutputFormat::Table => println!("{}", families_table(families)),
        OutputFormat::Pretty => {
            for family in families {
                println!(
                    "{} id={} version={} max_attr={}",
                    family.name, family.id, family.version, family.max_attr
                );
            }
        }
    }
    Ok(())
}

pub fn print_echo(report: &EchoReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&EchoOutput {
            schema_id: "ovey/cli/v1/echo",
            module_loaded: report.module_loaded(),
            report,
        })?,
        OutputFormat::Table => {
            println!("{}", families_table(&report.families));
            let mut table = new_table(vec!["KERNEL MESSAGE"]);
            for message in &report.messages {
                table.add_row(vec![message.as_str()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            match &report.ovey_family {
                Some(family) => println!(
                    "family {} resolved: id={} version={}",
                    family.name, family.id, family.version
                ),
                None => println!("family not registered (kernel module not loaded)"),
            }
            println!("{} families registered", report.families.len());
            for message in &report.messages {
                println!("kernel: {message}");
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string(value).map_err(|err| {
        CliError::new(INTERNAL, format!("failed to serialize output: {err}"))
    })?;
    println!("{text}");
    Ok(())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn families_table(families: &[Family]) -> Table {
    let mut table = new_table(vec!["ID", "NAME", "VERSION", "MAX ATTR", "GROUPS"]);
    for family in families {
        let groups: Vec<&str> = family.groups.iter().map(|g| g.name.as_str()).collect();
        table.add_row(vec![
            family.id.to_string(),
            family.name.clone(),
            family.version.to_string(),
            family.max_attr.to_string(),
            groups.join(","),
        ]);
    }
    table
}

fn device_fields(info: &DeviceInfo) -> Vec<(&'static str, String)> {
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    let mut fields = vec![
        ("device", info.device_name.clone()),
        ("parent", or_dash(info.parent_device_name.clone())),
        ("node_guid", or_dash(info.guid())),
        ("virt_net", or_dash(info.virt_net_uuid.clone())),
    ];
    for message in &info.messages {
        fields.push(("message", message.clone()));
    }
    fields
}
