/*
 * This file is part of Fancontrol-GUI.
 *
 * Copyright (C) 2025 Fancontrol-GUI contributors
 *
 * Fancontrol-GUI is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Fancontrol-GUI is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Fancontrol-GUI. If not, see <https://www.gnu.org/licenses/>.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use parking_lot::Mutex;

use fancontrol_gui::constants::document::STATUS_SUCCESS;
use fancontrol_gui::ident::{parse_pwm, parse_temp};
use fancontrol_gui::logger;
use fancontrol_gui::monitor::Monitor;
use fancontrol_gui::serializer::serialize;
use fancontrol_gui::{AppSettings, ConfigDocument, FanTestSettings, FancontrolError, Threshold};

#[derive(Debug, Default, PartialEq)]
struct Options {
    config: Option<PathBuf>,
    hwmon: Option<PathBuf>,
    verbose: bool,
    json: bool,
    save: bool,
    command: Vec<String>,
}

fn print_usage() {
    eprintln!("fancontrol-gui - edit and monitor the fancontrol configuration");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    fancontrol-gui [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    --config PATH    fancontrol config file (default /etc/fancontrol)");
    eprintln!("    --hwmon PATH     hwmon class directory (default /sys/class/hwmon)");
    eprintln!("    --verbose        Debug logging");
    eprintln!("    --json           Machine readable output for 'show'");
    eprintln!("    -h, --help       Show this help");
    eprintln!();
    eprintln!("COMMANDS:");
    eprintln!("    show                                  Chips, channels and fan settings");
    eprintln!("    dump                                  Config text as it would be saved");
    eprintln!("    set <hwmonN/pwmM> <field> <value>     Change a fan setting, add --save to write");
    eprintln!("        fields: active, temp, mintemp, maxtemp, minstart, minstop, minpwm, maxpwm");
    eprintln!("    interval <SECONDS>                    Change INTERVAL, add --save to write");
    eprintln!("    test-fans                             Measure minstop/minstart of every fan (root)");
    eprintln!("    save [PATH]                           Write the config");
    eprintln!("    monitor [SECONDS]                     Print live readings every refresh");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    FANCONTROL_CONFIG       Config file location");
    eprintln!("    FANCONTROL_HWMON_PATH   hwmon class directory");
    eprintln!("    FANCONTROL_LOG          Log filter (trace, debug, info, warn, error)");
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut opts = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                opts.config = Some(PathBuf::from(value));
            }
            "--hwmon" => {
                let value = iter.next().ok_or_else(|| anyhow!("--hwmon needs a path"))?;
                opts.hwmon = Some(PathBuf::from(value));
            }
            "--verbose" | "-v" => opts.verbose = true,
            "--json" => opts.json = true,
            "--save" => opts.save = true,
            other if other.starts_with("--") => bail!("unknown option {}", other),
            other => opts.command.push(other.to_string()),
        }
    }
    Ok(opts)
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected a boolean, got '{}'", value),
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }

    let opts = parse_args(&args)?;
    logger::init_logging(opts.verbose);

    let mut settings = AppSettings::load().context("failed to load settings")?;
    if let Some(path) = &opts.config {
        settings.config_path = path.clone();
    }
    if let Some(path) = &opts.hwmon {
        settings.hwmon_path = path.clone();
    }
    settings.validate()?;

    let mut doc = ConfigDocument::open(&settings);
    if doc.error() != STATUS_SUCCESS {
        eprintln!("warning: {}", doc.error());
    }

    let command: Vec<&str> = opts.command.iter().map(String::as_str).collect();
    match command.as_slice() {
        ["show"] => show(&doc, opts.json),
        ["dump"] => {
            print!("{}", serialize(doc.interval(), doc.registry()));
            Ok(())
        }
        ["set", pwm, field, value] => set(&mut doc, pwm, field, value, opts.save),
        ["interval", secs] => interval(&mut doc, secs, opts.save),
        ["test-fans"] => test_fans(&mut doc, opts.save),
        ["save"] => save(&mut doc, None),
        ["save", path] => save(&mut doc, Some(Path::new(path))),
        ["monitor"] => monitor(doc, settings.refresh_period(), None),
        ["monitor", secs] => {
            let secs: u64 = secs.parse().context("SECONDS must be a number")?;
            monitor(doc, settings.refresh_period(), Some(Duration::from_secs(secs)))
        }
        _ => {
            print_usage();
            bail!("unknown command: {}", opts.command.join(" "))
        }
    }
}

fn show(doc: &ConfigDocument, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(doc.registry().chips())?);
        return Ok(());
    }

    match doc.location() {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: (none)"),
    }
    println!("Interval: {}s", doc.interval());
    println!();

    if doc.registry().chips().is_empty() {
        println!("No hwmon chips found");
        return Ok(());
    }

    for chip in doc.registry().chips() {
        println!("hwmon{}  {}  ({})", chip.index, chip.name, chip.path.display());
        for temp in &chip.temps {
            let value = temp
                .value
                .map(|v| format!("{:.1}°C", v))
                .unwrap_or_else(|| "n/a".into());
            println!("    {:<20} {:<24} {}", temp.id.temp_ident(), temp.display_name(), value);
        }
        for fan in &chip.pwm_fans {
            let temp = fan
                .temp()
                .map(|t| t.temp_ident())
                .unwrap_or_else(|| "-".into());
            println!(
                "    {:<20} pwm={:<4} rpm={:<6} {} temp={}",
                fan.id.pwm_ident(),
                fan.pwm.map(|v| v.to_string()).unwrap_or_else(|| "n/a".into()),
                fan.rpm.map(|v| v.to_string()).unwrap_or_else(|| "n/a".into()),
                if fan.active() { "active" } else { "inactive" },
                temp,
            );
            if fan.is_used() {
                let thresholds: Vec<String> = Threshold::ALL
                    .iter()
                    .map(|t| format!("{}={}", t.directive().to_lowercase(), fan.threshold(*t)))
                    .collect();
                println!("        {}", thresholds.join(" "));
            }
        }
    }
    Ok(())
}

fn set(
    doc: &mut ConfigDocument,
    pwm: &str,
    field: &str,
    value: &str,
    save_after: bool,
) -> anyhow::Result<()> {
    let id = parse_pwm(pwm).ok_or_else(|| FancontrolError::InvalidIdentifier(pwm.to_string()))?;
    let handle = doc.fan_handle(id)?;

    let changed = match field.to_ascii_lowercase().as_str() {
        "active" => {
            let active = parse_bool(value)?;
            doc.edit_fan(handle, |fan| fan.set_active(active))?
        }
        "temp" => {
            let temp = if value.eq_ignore_ascii_case("none") {
                None
            } else {
                let t = parse_temp(value)
                    .ok_or_else(|| FancontrolError::InvalidIdentifier(value.to_string()))?;
                if doc.registry().temp(t).is_none() {
                    bail!("no such temperature: {}", t.temp_ident());
                }
                Some(t)
            };
            doc.edit_fan(handle, |fan| fan.set_temp(temp))?
        }
        name => {
            let threshold = Threshold::from_name(name).ok_or_else(|| anyhow!("unknown field '{}'", field))?;
            let number: i32 = value
                .parse()
                .with_context(|| format!("'{}' is not a number", value))?;
            doc.edit_fan(handle, |fan| fan.set_threshold(threshold, number))?
        }
    };

    if !changed {
        eprintln!("{} {} already {}", pwm, field, value);
    }
    finish(doc, save_after)
}

fn interval(doc: &mut ConfigDocument, value: &str, save_after: bool) -> anyhow::Result<()> {
    let secs: u32 = value
        .parse()
        .with_context(|| format!("'{}' is not a number of seconds", value))?;
    if secs == 0 {
        bail!("INTERVAL must be at least 1 second");
    }
    if !doc.set_interval(secs) {
        eprintln!("interval already {}", secs);
    }
    finish(doc, save_after)
}

fn test_fans(doc: &mut ConfigDocument, save_after: bool) -> anyhow::Result<()> {
    eprintln!("Testing fans, they will stop and spin up again");
    let reports = doc.test_fans(&FanTestSettings::default());
    if reports.is_empty() {
        bail!("no PWM channels to test");
    }
    for report in &reports {
        match &report.result {
            Ok(c) => eprintln!(
                "{}: minstop={} minstart={}",
                report.id.pwm_ident(),
                c.min_stop,
                c.min_start
            ),
            Err(message) => eprintln!("{}: {}", report.id.pwm_ident(), message),
        }
    }
    finish(doc, save_after)
}

/// Write the config when asked to, otherwise print it
fn finish(doc: &mut ConfigDocument, save_after: bool) -> anyhow::Result<()> {
    if save_after {
        save(doc, None)
    } else {
        print!("{}", doc.config_text());
        Ok(())
    }
}

fn save(doc: &mut ConfigDocument, path: Option<&Path>) -> anyhow::Result<()> {
    if !doc.save(path) {
        bail!("save failed: {}", doc.error());
    }
    let target = path.or(doc.location()).map(|p| p.display().to_string()).unwrap_or_default();
    println!("Wrote {}", target);
    Ok(())
}

fn monitor(doc: ConfigDocument, period: Duration, duration: Option<Duration>) -> anyhow::Result<()> {
    let doc = Arc::new(Mutex::new(doc));
    let mut monitor = Monitor::spawn(Arc::clone(&doc), period).context("failed to start monitor")?;

    let started = Instant::now();
    loop {
        {
            let doc = doc.lock();
            let mut readings = Vec::new();
            for chip in doc.registry().chips() {
                for temp in &chip.temps {
                    if let Some(v) = temp.value {
                        readings.push(format!("{}={:.1}", temp.id.temp_ident(), v));
                    }
                }
                for fan in &chip.pwm_fans {
                    if let Some(rpm) = fan.rpm {
                        readings.push(format!("{}={}rpm", fan.id.fan_ident(), rpm));
                    }
                }
            }
            println!("{}", readings.join(" "));
        }

        if duration.map_or(false, |d| started.elapsed() >= d) {
            break;
        }
        thread::sleep(period);
    }

    monitor.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fancontrol_gui::helper::NoHelper;
    use fancontrol_gui::SensorRegistry;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let opts = parse_args(&args(&[
            "--config", "/tmp/fc", "--verbose", "set", "hwmon0/pwm1", "maxtemp", "70", "--save",
        ]))
        .unwrap();
        assert_eq!(opts.config, Some(PathBuf::from("/tmp/fc")));
        assert!(opts.verbose);
        assert!(opts.save);
        assert_eq!(opts.command, args(&["set", "hwmon0/pwm1", "maxtemp", "70"]));
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&args(&["--config"])).is_err());
        assert!(parse_args(&args(&["--bogus", "show"])).is_err());
    }

    fn empty_document(dir: &TempDir) -> ConfigDocument {
        let registry = SensorRegistry::discover_at(dir.path().join("hwmon"));
        ConfigDocument::new(registry, Box::new(NoHelper))
    }

    #[test]
    fn test_interval_command() {
        let dir = TempDir::new().unwrap();
        let mut doc = empty_document(&dir);

        interval(&mut doc, "7", false).unwrap();
        assert_eq!(doc.interval(), 7);
        assert!(doc.config_text().starts_with("INTERVAL=7\n"));

        assert!(interval(&mut doc, "soon", false).is_err());
        assert!(interval(&mut doc, "0", false).is_err());
        assert_eq!(doc.interval(), 7);
    }

    #[test]
    fn test_interval_command_saves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fancontrol");
        let mut doc = empty_document(&dir);
        assert!(doc.load(&path));

        interval(&mut doc, "3", true).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.starts_with("INTERVAL=3\n"));
    }

    #[test]
    fn test_fans_without_pwm_channels() {
        let dir = TempDir::new().unwrap();
        let mut doc = empty_document(&dir);
        assert!(test_fans(&mut doc, false).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("yes").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
