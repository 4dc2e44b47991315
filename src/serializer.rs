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

//! Writer for the fancontrol config format.

use lazy_static::lazy_static;
use regex::Regex;

use crate::hwmon::{Chip, SensorRegistry};
use crate::ident::chip_ident;
use crate::sensors::{PwmFan, Threshold};

lazy_static! {
    static ref SYS_PREFIX: Regex = Regex::new(r"^/sys/").expect("valid regex");
    static ref HWMON_SUFFIX: Regex = Regex::new(r"/hwmon/hwmon\d+\s*$").expect("valid regex");
}

/// Device path as the `DEVPATH` line expects it: no leading `/sys/` and no
/// trailing `/hwmon/hwmonN`.
pub fn sanitize_device_path(path: &str) -> String {
    let path = SYS_PREFIX.replace(path, "");
    HWMON_SUFFIX.replace(&path, "").into_owned()
}

/// Fans written to the config: active, with a temperature that exists
pub fn used_fans(registry: &SensorRegistry) -> Vec<&PwmFan> {
    registry
        .pwm_fans()
        .filter(|fan| fan.is_used())
        .filter(|fan| fan.temp().and_then(|t| registry.temp(t)).is_some())
        .collect()
}

/// Chips named on the `DEVPATH` and `DEVNAME` lines: every chip with a PWM
/// channel plus every chip providing the temperature of a used fan.
pub fn used_chips<'a>(registry: &'a SensorRegistry, fans: &[&PwmFan]) -> Vec<&'a Chip> {
    registry
        .chips()
        .iter()
        .filter(|chip| {
            !chip.pwm_fans.is_empty()
                || fans
                    .iter()
                    .any(|fan| fan.temp().map(|t| t.hwmon) == Some(chip.index))
        })
        .collect()
}

/// Canonical config text for `interval` and the fans of `registry`
pub fn serialize(interval: u32, registry: &SensorRegistry) -> String {
    let fans = used_fans(registry);
    let chips = used_chips(registry, &fans);

    let mut out = format!("INTERVAL={}\n", interval);

    out += &line(
        "DEVPATH",
        chips.iter().map(|chip| {
            format!(
                "{}={}",
                chip_ident(chip.index),
                sanitize_device_path(&chip.path.to_string_lossy())
            )
        }),
    );
    out += &line(
        "DEVNAME",
        chips
            .iter()
            .map(|chip| format!("{}={}", chip_ident(chip.index), chip.name)),
    );
    out += &line(
        "FCTEMPS",
        fans.iter().filter_map(|fan| {
            let temp = fan.temp()?;
            Some(format!("{}={}", fan.id.pwm_ident(), temp.temp_ident()))
        }),
    );
    out += &line(
        "FCFANS",
        fans.iter()
            .map(|fan| format!("{}={}", fan.id.pwm_ident(), fan.id.fan_ident())),
    );
    for field in Threshold::ALL {
        out += &line(
            field.directive(),
            fans.iter()
                .map(|fan| format!("{}={}", fan.id.pwm_ident(), fan.threshold(field))),
        );
    }
    out
}

fn line(directive: &str, tokens: impl Iterator<Item = String>) -> String {
    format!("{}={}\n", directive, tokens.collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::ChannelId;
    use crate::test_utils::test_utils::{standard_hwmon, FakeHwmon};

    #[test]
    fn test_sanitize_device_path() {
        assert_eq!(
            sanitize_device_path("/sys/devices/platform/it87.656/hwmon/hwmon2"),
            "devices/platform/it87.656"
        );
        assert_eq!(
            sanitize_device_path("/sys/devices/pci0000:00/0000:00:18.3/hwmon/hwmon12"),
            "devices/pci0000:00/0000:00:18.3"
        );
        assert_eq!(sanitize_device_path("/sys/devices/virtual/thermal"), "devices/virtual/thermal");
        assert_eq!(sanitize_device_path("/other/sys/x"), "/other/sys/x");
    }

    #[test]
    fn test_serialize_empty_registry() {
        let hw = FakeHwmon::new();
        let text = serialize(10, &hw.registry());
        assert_eq!(
            text,
            "INTERVAL=10\nDEVPATH=\nDEVNAME=\nFCTEMPS=\nFCFANS=\nMINTEMP=\nMAXTEMP=\nMINSTART=\nMINSTOP=\nMINPWM=\nMAXPWM=\n"
        );
    }

    #[test]
    fn test_serialize_used_fans() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        {
            let fan = registry.pwm_fan_mut(ChannelId::new(0, 2)).unwrap();
            fan.set_temp(Some(ChannelId::new(1, 1)));
            fan.set_min_temp(35);
            fan.set_max_temp(80);
            fan.set_min_start(120);
            fan.set_min_stop(90);
            fan.set_min_pwm(20);
            fan.set_max_pwm(250);
        }

        let text = serialize(5, &registry);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "INTERVAL=5");
        assert!(lines[1].starts_with("DEVPATH=hwmon0="));
        assert!(lines[1].contains(" hwmon1="));
        assert!(lines[1].ends_with("devices/platform/coretemp"));
        assert_eq!(lines[2], "DEVNAME=hwmon0=it87 hwmon1=coretemp");
        assert_eq!(lines[3], "FCTEMPS=hwmon0/pwm2=hwmon1/temp1_input");
        assert_eq!(lines[4], "FCFANS=hwmon0/pwm2=hwmon0/fan2_input");
        assert_eq!(lines[5], "MINTEMP=hwmon0/pwm2=35");
        assert_eq!(lines[6], "MAXTEMP=hwmon0/pwm2=80");
        assert_eq!(lines[7], "MINSTART=hwmon0/pwm2=120");
        assert_eq!(lines[8], "MINSTOP=hwmon0/pwm2=90");
        assert_eq!(lines[9], "MINPWM=hwmon0/pwm2=20");
        assert_eq!(lines[10], "MAXPWM=hwmon0/pwm2=250");
    }

    #[test]
    fn test_unused_fans_are_filtered() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        {
            let fan = registry.pwm_fan_mut(ChannelId::new(0, 1)).unwrap();
            fan.set_temp(Some(ChannelId::new(0, 1)));
            fan.set_active(false);
            fan.set_max_temp(42);
        }
        registry
            .pwm_fan_mut(ChannelId::new(0, 3))
            .unwrap()
            .set_max_temp(43);

        let text = serialize(10, &registry);
        assert!(text.contains("FCTEMPS=\n"));
        assert!(text.contains("FCFANS=\n"));
        assert!(text.contains("MAXTEMP=\n"));
        // chips with pwm channels are still described
        assert!(text.contains("DEVNAME=hwmon0=it87\n"));
    }

    #[test]
    fn test_dangling_temp_is_not_used() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        registry
            .pwm_fan_mut(ChannelId::new(0, 1))
            .unwrap()
            .set_temp(Some(ChannelId::new(5, 1)));
        assert!(used_fans(&registry).is_empty());
    }
}
