//! Config subcommand handlers.

use voxbridge_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{self, OutputOpts};

use super::util;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            actuator_host,
            mac,
            force,
        } => {
            let path = util::config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config::default();
            if let Some(host) = actuator_host {
                cfg.dispatch.actuator_host = host;
            }
            if let Some(mac) = mac {
                cfg.node.mac = mac;
            }
            if let Some(store) = &global.store {
                cfg.node.store = Some(store.clone());
            }
            cfg.validate()?;

            voxbridge_config::save_config_to(&cfg, &path)?;
            output::notice(&format!("Config written to {}", path.display()), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = util::load_config(global)?;
            let out = OutputOpts::resolve(global, &cfg.defaults)?;
            let rendered = match out.format {
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
                        field: "config".into(),
                        reason: e.to_string(),
                    })?
                }
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
            };
            output::print_output(rendered.trim_end(), out.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", util::config_path(global).display());
            Ok(())
        }
    }
}
