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

//! Fan test: measure where a fan stops and where it starts again.
//!
//! The channel is switched to manual control and run at full duty. The duty
//! cycle is then lowered step by step until `fanM_input` reads 0, which
//! gives `minStop`, and raised again until the fan turns, which gives
//! `minStart`. The previous duty cycle and enable mode are restored
//! afterwards, also when the test fails.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::{fan, timing};
use crate::error::{FancontrolError, Result};
use crate::hwmon::read_trimmed;
use crate::ident::ChannelId;

/// Timing and step size of a fan test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanTestSettings {
    pub spin_up: Duration,
    pub step_delay: Duration,
    pub step: u32,
}

impl Default for FanTestSettings {
    fn default() -> Self {
        Self {
            spin_up: timing::FAN_SPIN_UP,
            step_delay: timing::FAN_STEP_DELAY,
            step: fan::TEST_STEP,
        }
    }
}

/// Measured thresholds of one fan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// Lowest duty cycle that keeps the fan turning
    pub min_stop: i32,
    /// Duty cycle that starts the fan from standstill
    pub min_start: i32,
}

/// Outcome of the fan test for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanTestReport {
    pub id: ChannelId,
    pub result: std::result::Result<Calibration, String>,
}

/// Duty cycle and enable mode as found before the test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmState {
    pub pwm: u32,
    pub enable: Option<u32>,
}

/// Access to one PWM output and its tachometer
pub trait PwmControl {
    fn state(&mut self) -> io::Result<PwmState>;
    fn set_manual(&mut self) -> io::Result<()>;
    fn write_pwm(&mut self, value: u32) -> io::Result<()>;
    fn rpm(&mut self) -> io::Result<u32>;
    fn restore(&mut self, state: PwmState) -> io::Result<()>;
}

/// `pwmM`, `pwmM_enable` and `fanM_input` of a hwmon device directory
#[derive(Debug, Clone)]
pub struct SysfsPwm {
    dir: PathBuf,
    channel: usize,
}

impl SysfsPwm {
    pub fn new(dir: impl Into<PathBuf>, channel: usize) -> Self {
        Self {
            dir: dir.into(),
            channel,
        }
    }

    fn file(&self, name: String) -> PathBuf {
        self.dir.join(name)
    }

    fn pwm_path(&self) -> PathBuf {
        self.file(format!("pwm{}", self.channel))
    }

    fn enable_path(&self) -> PathBuf {
        self.file(format!("pwm{}_enable", self.channel))
    }
}

fn parse_u32(raw: String) -> io::Result<u32> {
    raw.parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("not a number: '{}'", raw)))
}

impl PwmControl for SysfsPwm {
    fn state(&mut self) -> io::Result<PwmState> {
        let pwm = parse_u32(read_trimmed(self.pwm_path())?)?;
        let enable_path = self.enable_path();
        let enable = if enable_path.exists() {
            Some(parse_u32(read_trimmed(enable_path)?)?)
        } else {
            None
        };
        Ok(PwmState { pwm, enable })
    }

    fn set_manual(&mut self) -> io::Result<()> {
        let enable_path = self.enable_path();
        if enable_path.exists() {
            fs::write(enable_path, fan::ENABLE_MANUAL.to_string())?;
        }
        Ok(())
    }

    fn write_pwm(&mut self, value: u32) -> io::Result<()> {
        fs::write(self.pwm_path(), value.to_string())
    }

    fn rpm(&mut self) -> io::Result<u32> {
        parse_u32(read_trimmed(self.file(format!("fan{}_input", self.channel)))?)
    }

    fn restore(&mut self, state: PwmState) -> io::Result<()> {
        // The duty cycle only sticks while the channel is in manual mode
        self.set_manual()?;
        self.write_pwm(state.pwm)?;
        if let Some(enable) = state.enable {
            fs::write(self.enable_path(), enable.to_string())?;
        }
        Ok(())
    }
}

/// Run the stop/start ramp on one channel and put it back the way it was
pub fn test_fan(
    id: ChannelId,
    control: &mut dyn PwmControl,
    settings: &FanTestSettings,
) -> Result<Calibration> {
    let fail = |message: String| FancontrolError::FanTest {
        channel: id.pwm_ident(),
        message,
    };

    let saved = control.state().map_err(|e| fail(e.to_string()))?;
    info!(fan = %id, pwm = saved.pwm, enable = ?saved.enable, "Starting fan test");

    let outcome = ramp(id, control, settings);
    if let Err(e) = control.restore(saved) {
        warn!(fan = %id, error = %e, "Failed to restore fan state");
        return Err(fail(format!("could not restore pwm state: {}", e)));
    }
    outcome.map_err(|e| fail(e.to_string()))?.map_err(fail)
}

// Outer error: the channel could not be driven. Inner error: the fan did not
// behave. Either way the caller restores the saved state.
fn ramp(
    id: ChannelId,
    control: &mut dyn PwmControl,
    settings: &FanTestSettings,
) -> io::Result<std::result::Result<Calibration, String>> {
    let step = settings.step.max(1);

    control.set_manual()?;
    control.write_pwm(fan::PWM_FULL)?;
    thread::sleep(settings.spin_up);
    let full = control.rpm()?;
    if full == 0 {
        return Ok(Err("fan does not turn at full duty".to_string()));
    }
    debug!(fan = %id, rpm = full, "Fan at full duty");

    let mut duty = fan::PWM_FULL;
    let mut last_turning = fan::PWM_FULL;
    let stopped = loop {
        if duty == 0 {
            break false;
        }
        duty = duty.saturating_sub(step);
        control.write_pwm(duty)?;
        thread::sleep(settings.step_delay);
        let rpm = control.rpm()?;
        debug!(fan = %id, duty, rpm, "Ramping down");
        if rpm == 0 {
            break true;
        }
        last_turning = duty;
    };

    if !stopped {
        info!(fan = %id, "Fan keeps turning at zero duty");
        return Ok(Ok(Calibration {
            min_stop: 0,
            min_start: 0,
        }));
    }

    let min_start = loop {
        if duty >= fan::PWM_FULL {
            return Ok(Err("fan did not start again".to_string()));
        }
        duty = (duty + step).min(fan::PWM_FULL);
        control.write_pwm(duty)?;
        thread::sleep(settings.step_delay);
        let rpm = control.rpm()?;
        debug!(fan = %id, duty, rpm, "Ramping up");
        if rpm > 0 {
            break duty;
        }
    };

    let calibration = Calibration {
        min_stop: last_turning as i32,
        min_start: min_start as i32,
    };
    info!(
        fan = %id,
        min_stop = calibration.min_stop,
        min_start = calibration.min_start,
        "Fan test finished"
    );
    Ok(Ok(calibration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::FakeHwmon;

    /// A fan with start/stop hysteresis
    struct SimFan {
        pwm: u32,
        enable: Option<u32>,
        turning: bool,
        stops_below: u32,
        starts_at: u32,
        writes: Vec<u32>,
        broken_after: Option<usize>,
    }

    impl SimFan {
        fn new(stops_below: u32, starts_at: u32) -> Self {
            Self {
                pwm: 90,
                enable: Some(2),
                turning: true,
                stops_below,
                starts_at,
                writes: Vec::new(),
                broken_after: None,
            }
        }
    }

    impl PwmControl for SimFan {
        fn state(&mut self) -> io::Result<PwmState> {
            Ok(PwmState {
                pwm: self.pwm,
                enable: self.enable,
            })
        }

        fn set_manual(&mut self) -> io::Result<()> {
            self.enable = Some(1);
            Ok(())
        }

        fn write_pwm(&mut self, value: u32) -> io::Result<()> {
            if self.broken_after.map_or(false, |n| self.writes.len() >= n) {
                return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
            }
            self.writes.push(value);
            self.pwm = value;
            if self.turning && value < self.stops_below {
                self.turning = false;
            } else if !self.turning && value >= self.starts_at {
                self.turning = true;
            }
            Ok(())
        }

        fn rpm(&mut self) -> io::Result<u32> {
            Ok(if self.turning { 300 + self.pwm * 4 } else { 0 })
        }

        fn restore(&mut self, state: PwmState) -> io::Result<()> {
            self.pwm = state.pwm;
            self.enable = state.enable;
            Ok(())
        }
    }

    fn quick() -> FanTestSettings {
        FanTestSettings {
            spin_up: Duration::ZERO,
            step_delay: Duration::ZERO,
            step: 10,
        }
    }

    #[test]
    fn test_finds_stop_and_start() {
        let mut sim = SimFan::new(60, 120);
        let calibration = test_fan(ChannelId::new(0, 1), &mut sim, &quick()).unwrap();
        assert_eq!(
            calibration,
            Calibration {
                min_stop: 65,
                min_start: 125,
            }
        );
        assert_eq!(sim.writes.first(), Some(&255));
    }

    #[test]
    fn test_restores_previous_state() {
        let mut sim = SimFan::new(60, 120);
        test_fan(ChannelId::new(0, 1), &mut sim, &quick()).unwrap();
        assert_eq!(sim.pwm, 90);
        assert_eq!(sim.enable, Some(2));
    }

    #[test]
    fn test_fan_that_never_stops() {
        let mut sim = SimFan::new(0, 0);
        let calibration = test_fan(ChannelId::new(0, 1), &mut sim, &quick()).unwrap();
        assert_eq!(
            calibration,
            Calibration {
                min_stop: 0,
                min_start: 0,
            }
        );
        assert_eq!(sim.writes.last(), Some(&0));
    }

    #[test]
    fn test_fan_that_never_turns() {
        let mut sim = SimFan::new(300, 300);
        sim.turning = false;
        let err = test_fan(ChannelId::new(0, 2), &mut sim, &quick()).unwrap_err();
        assert!(err.to_string().contains("hwmon0/pwm2"));
        assert!(err.to_string().contains("full duty"));
        assert_eq!(sim.pwm, 90);
    }

    #[test]
    fn test_fan_that_does_not_restart() {
        let mut sim = SimFan::new(60, 300);
        let err = test_fan(ChannelId::new(0, 1), &mut sim, &quick()).unwrap_err();
        assert!(err.to_string().contains("did not start again"));
        assert_eq!(sim.writes.last(), Some(&255));
        assert_eq!(sim.pwm, 90);
    }

    #[test]
    fn test_write_error_still_restores() {
        let mut sim = SimFan::new(60, 120);
        sim.broken_after = Some(3);
        assert!(test_fan(ChannelId::new(0, 1), &mut sim, &quick()).is_err());
        assert_eq!(sim.pwm, 90);
        assert_eq!(sim.enable, Some(2));
    }

    #[test]
    fn test_sysfs_state_and_restore() {
        let hw = FakeHwmon::new();
        let dir = hw.add_chip(0, "nct6775", &[1], &[1]);
        hw.set_value(0, "pwm1", "140");

        let mut pwm = SysfsPwm::new(&dir, 1);
        let saved = pwm.state().unwrap();
        assert_eq!(saved, PwmState { pwm: 140, enable: Some(2) });
        assert_eq!(pwm.rpm().unwrap(), 1200);

        pwm.set_manual().unwrap();
        pwm.write_pwm(30).unwrap();
        assert_eq!(read_trimmed(dir.join("pwm1_enable")).unwrap(), "1");
        assert_eq!(read_trimmed(dir.join("pwm1")).unwrap(), "30");

        pwm.restore(saved).unwrap();
        assert_eq!(read_trimmed(dir.join("pwm1")).unwrap(), "140");
        assert_eq!(read_trimmed(dir.join("pwm1_enable")).unwrap(), "2");
    }

    #[test]
    fn test_sysfs_missing_tachometer() {
        let hw = FakeHwmon::new();
        let dir = hw.add_chip(0, "nct6775", &[1], &[1]);
        fs::remove_file(dir.join("fan1_input")).unwrap();

        let mut pwm = SysfsPwm::new(&dir, 1);
        assert!(test_fan(ChannelId::new(0, 1), &mut pwm, &quick()).is_err());
        assert_eq!(read_trimmed(dir.join("pwm1")).unwrap(), "255");
        assert_eq!(read_trimmed(dir.join("pwm1_enable")).unwrap(), "2");
    }
}
