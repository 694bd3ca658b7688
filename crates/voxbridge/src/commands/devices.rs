//! Device registry command handlers.

use tabled::Tabled;
use voxbridge_core::{Device, DeviceTarget};

use crate::cli::{AddDeviceArgs, DevicesArgs, DevicesCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::{self, NodeContext};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "ID")]
    id: String,
}

fn row(index: usize, d: &Device) -> DeviceRow {
    let (kind, target) = match &d.target {
        DeviceTarget::Pin(pin) => ("pin", pin.to_string()),
        DeviceTarget::Url(url) => ("url", url.clone()),
    };
    DeviceRow {
        index,
        name: d.name.clone(),
        kind,
        target,
        id: d.stable_id.to_string(),
    }
}

fn detail(d: &Device) -> String {
    [
        format!("Name:     {}", d.name),
        format!("Target:   {}", d.target),
        format!("ID:       {}", d.stable_id),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = NodeContext::load(global)?;
    let mut registry = ctx.open_registry()?;
    let out = ctx.out;

    match args.command {
        DevicesCommand::List => {
            let mut position = 0;
            let rendered = output::render_list(
                out.format,
                registry.devices(),
                |d| {
                    position += 1;
                    row(position, d)
                },
                |d| d.name.clone(),
            )?;
            output::print_output(&rendered, out.quiet);
            output::notice(
                &format!("{}/{} devices", registry.len(), registry.capacity()),
                out.quiet || out.format != OutputFormat::Table,
            );
            Ok(())
        }

        DevicesCommand::Get { name } => {
            let device = registry
                .find(&name)
                .ok_or_else(|| CliError::NotFound { name: name.clone() })?;
            let rendered =
                output::render_single(out.format, device, detail, |d| d.stable_id.to_string())?;
            output::print_output(&rendered, out.quiet);
            Ok(())
        }

        DevicesCommand::Add(AddDeviceArgs { name, pin, url }) => {
            let id = match (pin, url) {
                (Some(pin), None) => registry.add_pin_device(&name, pin)?,
                (None, Some(url)) => registry.add_url_device(&name, &url)?,
                _ => {
                    return Err(CliError::Validation {
                        field: "target".into(),
                        reason: "pass exactly one of --pin or --url".into(),
                    });
                }
            };
            output::print_output(&id.to_string(), out.quiet);
            output::notice(&format!("Device '{}' added", name.trim()), out.quiet);
            Ok(())
        }

        DevicesCommand::Remove { name } => {
            let removed = registry.remove(&name)?;
            output::notice(&format!("Device '{}' removed", removed.name), out.quiet);
            Ok(())
        }

        DevicesCommand::Clear => {
            util::require_yes("devices clear", global.yes)?;
            let count = registry.len();
            registry.clear()?;
            output::notice(&format!("Removed {count} devices"), out.quiet);
            Ok(())
        }
    }
}
