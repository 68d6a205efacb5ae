use anyhow::{anyhow, bail, Context, Result};
use crabctrl::v4l2::V4l2CtrlType;
use crabctrl::{
    ControlEntry, ControlInfoMap, ControlList, ControlValue, CrabCtrlConfig, MenuItem, SetOutcome,
    V4l2Device,
};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

const USAGE: &str = "Usage: crabctrl-cli [--device <node>] [--config <file>] [--json] <command> [args]

Commands:
  list-controls                 List the controls of the device
  get <control>...              Read control values
  set <control>=<value>...      Write control values in one batch
  apply                         Write the presets from the config file
  info                          Show device information

Controls are named by id (0x00980900, 9963776) or driver name (brightness).";

struct Options {
    device: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
    command: String,
    args: Vec<String>,
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(1);
        }
    };

    let config = match &options.config {
        Some(path) => CrabCtrlConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CrabCtrlConfig::load_or_default(),
    };
    crabctrl::init_logging_with(&format!("crabctrl={}", config.logging.level));

    let node = options
        .device
        .clone()
        .unwrap_or_else(|| config.device.node.clone());
    let mut device = V4l2Device::new(node);
    device
        .open(config.open_flags())
        .context("opening device")?;

    match options.command.as_str() {
        "list-controls" => cmd_list_controls(&device, &options),
        "get" => cmd_get(&device, &options),
        "set" => cmd_set(&device, &options),
        "apply" => cmd_apply(&device, &config, &options),
        "info" => cmd_info(&device, &options),
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(1);
        }
    }
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut device = None;
    let mut config = None;
    let mut json = false;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--device" => {
                i += 1;
                device = Some(PathBuf::from(args.get(i).ok_or_else(|| anyhow!("--device needs a value"))?));
            }
            "--config" => {
                i += 1;
                config = Some(PathBuf::from(args.get(i).ok_or_else(|| anyhow!("--config needs a value"))?));
            }
            "--json" => json = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }

    if positional.is_empty() {
        bail!("missing command");
    }
    let command = positional.remove(0);

    Ok(Options {
        device,
        config,
        json,
        command,
        args: positional,
    })
}

fn cmd_list_controls(device: &V4l2Device, options: &Options) -> Result<()> {
    let controls = device.controls();

    if options.json {
        let entries: Vec<&ControlEntry> = controls.iter().collect();
        println!("{}", serde_json::to_string(&entries)?);
        return Ok(());
    }

    for entry in controls {
        let info = &entry.info;
        println!(
            "{:#010x} {:<32} {:<9} min={} max={} step={} default={}",
            entry.id.id(),
            entry.id.name(),
            entry.id.control_type(),
            info.min,
            info.max,
            info.step,
            info.def
        );
        for item in &info.menu {
            match item {
                MenuItem::Name { index, name } => println!("    {}: {}", index, name),
                MenuItem::Value { index, value } => println!("    {}: {}", index, value),
            }
        }
    }

    Ok(())
}

fn cmd_get(device: &V4l2Device, options: &Options) -> Result<()> {
    if options.args.is_empty() {
        bail!("Usage: crabctrl-cli get <control>...");
    }

    let controls = device.controls();
    let ids = options
        .args
        .iter()
        .map(|name| resolve_control(controls, name).map(|e| e.id.id()))
        .collect::<Result<Vec<_>>>()?;

    let values = device.get_controls(&ids)?;
    print_values(controls, &values, options.json)
}

fn cmd_set(device: &V4l2Device, options: &Options) -> Result<()> {
    if options.args.is_empty() {
        bail!("Usage: crabctrl-cli set <control>=<value>...");
    }

    let controls = device.controls();
    let mut list = ControlList::new();
    for arg in &options.args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("expected <control>=<value>, got '{}'", arg))?;
        let entry = resolve_control(controls, name.trim())?;
        list.set(entry.id.id(), parse_value(entry, value.trim())?);
    }

    write_controls(device, &mut list, options.json)
}

fn cmd_apply(device: &V4l2Device, config: &CrabCtrlConfig, options: &Options) -> Result<()> {
    if config.presets.is_empty() {
        println!("No presets configured");
        return Ok(());
    }

    let mut list = config.preset_controls(device.controls())?;
    write_controls(device, &mut list, options.json)
}

fn cmd_info(device: &V4l2Device, options: &Options) -> Result<()> {
    let path = device.device_path().ok();

    if options.json {
        let info = serde_json::json!({
            "node": device.device_node(),
            "path": path,
            "controls": device.controls().len(),
            "version": crabctrl::VERSION,
        });
        println!("{}", info);
        return Ok(());
    }

    println!("Device node: {}", device.device_node().display());
    match path {
        Some(path) => println!("Device path: {}", path.display()),
        None => println!("Device path: unknown"),
    }
    println!("Controls:    {}", device.controls().len());
    println!("{} {}", crabctrl::NAME, crabctrl::VERSION);
    Ok(())
}

fn write_controls(device: &V4l2Device, list: &mut ControlList, json: bool) -> Result<()> {
    let outcome = device.set_controls(list)?;

    if let SetOutcome::Adjusted(ids) = &outcome {
        for id in ids {
            log::warn!("Driver adjusted control {:#010x}", id);
        }
    }

    print_values(device.controls(), list, json)
}

fn print_values(controls: &ControlInfoMap, values: &ControlList, json: bool) -> Result<()> {
    if json {
        let map: BTreeMap<String, &ControlValue> = values
            .iter()
            .map(|(id, value)| (display_name(controls, id), value))
            .collect();
        println!("{}", serde_json::to_string(&map)?);
    } else {
        for (id, value) in values.iter() {
            println!("{} = {}", display_name(controls, id), value);
        }
    }
    Ok(())
}

fn display_name(controls: &ControlInfoMap, id: u32) -> String {
    controls
        .get(id)
        .map(|e| e.id.name().to_string())
        .unwrap_or_else(|| format!("{:#010x}", id))
}

fn resolve_control<'a>(controls: &'a ControlInfoMap, name: &str) -> Result<&'a ControlEntry> {
    controls
        .resolve(name)
        .ok_or_else(|| anyhow!("unknown control '{}'", name))
}

fn parse_list<T: std::str::FromStr>(s: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.split(',')
        .map(|item| item.trim().parse::<T>().map_err(anyhow::Error::from))
        .collect()
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => bail!("Invalid bool value: {}", s),
    }
}

fn parse_value(entry: &ControlEntry, s: &str) -> Result<ControlValue> {
    use V4l2CtrlType as T;

    let desc = &entry.descriptor;
    let name = entry.id.name();

    if desc.has_payload() {
        let value = match desc.ctrl_type {
            T::String => ControlValue::String(s.to_string()),
            T::U8 => ControlValue::Bytes(parse_list(s)?),
            T::U16 => ControlValue::U16Array(parse_list(s)?),
            T::U32 => ControlValue::U32Array(parse_list(s)?),
            T::Integer64 => ControlValue::Integer64Array(parse_list(s)?),
            _ => ControlValue::Integer32Array(parse_list(s)?),
        };
        return Ok(value);
    }

    let value = match desc.ctrl_type {
        T::Boolean => ControlValue::Bool(parse_bool(s)?),
        T::Integer64 => ControlValue::Integer64(s.parse().with_context(|| format!("value for {}", name))?),
        T::Menu => match s.parse::<i32>() {
            Ok(index) => ControlValue::Integer32(index),
            Err(_) => {
                let index = entry
                    .info
                    .menu
                    .iter()
                    .find_map(|item| match item {
                        MenuItem::Name { index, name } if name.eq_ignore_ascii_case(s) => Some(*index),
                        _ => None,
                    })
                    .ok_or_else(|| anyhow!("'{}' is not an entry of menu {}", s, name))?;
                ControlValue::Integer32(index as i32)
            }
        },
        _ => ControlValue::Integer32(s.parse().with_context(|| format!("value for {}", name))?),
    };

    Ok(value)
}
