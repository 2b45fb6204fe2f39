//! Command-line arguments.
//!
//! ```bash
//! humilog --list-ports
//! humilog --port-inflow COM3 --port-outflow COM4
//! humilog --temperature --port /dev/ttyACM0
//! humilog --simulate --settings bench.json
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub list_ports: bool,
    pub temperature: bool,
    pub simulate: bool,
    pub settings: Option<PathBuf>,
    pub inflow_port: Option<String>,
    pub outflow_port: Option<String>,
    pub temperature_port: Option<String>,
}

impl CliArgs {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} needs a value"))
            };
            match arg.as_str() {
                "--list-ports" => parsed.list_ports = true,
                "--temperature" => parsed.temperature = true,
                "--simulate" => parsed.simulate = true,
                "--settings" => parsed.settings = Some(PathBuf::from(value("--settings")?)),
                "--port-inflow" => parsed.inflow_port = Some(value("--port-inflow")?),
                "--port-outflow" => parsed.outflow_port = Some(value("--port-outflow")?),
                "--port" => parsed.temperature_port = Some(value("--port")?),
                other => bail!("unknown argument {other:?}"),
            }
        }

        Ok(parsed)
    }
}
