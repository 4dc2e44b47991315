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

//! Reader for the fancontrol config format.
//!
//! Parsing happens in two steps. [`parse`] turns text into [`ConfigEdits`]
//! without looking at hardware: every logical line becomes a [`Statement`]
//! (directive plus payload) and is handed to the handler registered for its
//! directive. [`ConfigEdits::apply_to`] then resolves the identifiers against
//! a [`SensorRegistry`].
//!
//! The format is read leniently. Unknown directives are ignored, numbers
//! that do not parse become 0 and references to missing chips or channels
//! drop only that single assignment.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::constants::document::MAX_CONFIG_SIZE;
use crate::hwmon::SensorRegistry;
use crate::ident::{self, ChannelId};
use crate::sensors::Threshold;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Config text too large ({size} bytes, max {max_size} bytes)")]
    TooLarge { size: usize, max_size: usize },
}

/// One non-empty line with comments removed and whitespace collapsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based line number in the source text
    pub line: usize,
    /// Text before the first `=`, e.g. `FCTEMPS`
    pub directive: String,
    /// Text after the first `=`
    pub payload: String,
}

impl Statement {
    /// Space separated `identifier=value` pairs of the payload.
    ///
    /// Tokens without `=` are skipped.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.payload
            .split(' ')
            .filter(|tok| !tok.is_empty())
            .filter_map(|tok| match tok.split_once('=') {
                Some(pair) => Some(pair),
                None => {
                    debug!(line = self.line, token = tok, "Ignoring token without '='");
                    None
                }
            })
            .collect()
    }
}

/// A single change requested by the config text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// `FCTEMPS` entry; `temp` is `None` when the temperature side did not parse
    Associate {
        pwm: ChannelId,
        temp: Option<ChannelId>,
    },
    /// `MINTEMP`, `MAXTEMP`, `MINSTART`, `MINSTOP`, `MINPWM` or `MAXPWM` entry
    Threshold {
        pwm: ChannelId,
        field: Threshold,
        value: i32,
    },
}

/// Everything a config text asks for, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEdits {
    interval: Option<u32>,
    edits: Vec<Edit>,
}

/// Outcome of [`ConfigEdits::apply_to`]
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
    /// Fans whose state differs from before the apply
    pub changed: BTreeSet<ChannelId>,
}

impl ConfigEdits {
    /// `INTERVAL=` value of the last such line, if any
    pub fn interval(&self) -> Option<u32> {
        self.interval
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Apply the edits to the fans of `registry`.
    ///
    /// Every fan's temperature association is cleared first, so the result
    /// reflects this text only and never state from an earlier load.
    pub fn apply_to(&self, registry: &mut SensorRegistry) -> ApplyReport {
        let mut report = ApplyReport::default();

        for fan in registry.pwm_fans_mut() {
            if fan.reset() {
                report.changed.insert(fan.id);
            }
        }

        for edit in &self.edits {
            match *edit {
                Edit::Associate { pwm, temp } => {
                    let temp = temp.filter(|t| registry.temp(*t).is_some());
                    let Some(fan) = registry.pwm_fan_mut(pwm) else {
                        debug!(pwm = %pwm.pwm_ident(), "FCTEMPS names an unknown fan");
                        report.skipped += 1;
                        continue;
                    };
                    let mut changed = fan.set_temp(temp);
                    if temp.is_some() {
                        changed |= fan.set_min_pwm(0);
                    }
                    if changed {
                        report.changed.insert(pwm);
                    }
                    report.applied += 1;
                }
                Edit::Threshold { pwm, field, value } => {
                    let Some(fan) = registry.pwm_fan_mut(pwm) else {
                        debug!(
                            pwm = %pwm.pwm_ident(),
                            directive = field.directive(),
                            "Threshold names an unknown fan"
                        );
                        report.skipped += 1;
                        continue;
                    };
                    if fan.set_threshold(field, value) {
                        report.changed.insert(pwm);
                    }
                    report.applied += 1;
                }
            }
        }

        debug!(
            applied = report.applied,
            skipped = report.skipped,
            changed = report.changed.len(),
            "Config edits applied"
        );
        report
    }
}

type Handler = fn(&Statement, &mut ConfigEdits);

macro_rules! threshold_handler {
    ($name:ident, $field:expr) => {
        fn $name(stmt: &Statement, edits: &mut ConfigEdits) {
            handle_threshold(stmt, edits, $field)
        }
    };
}

threshold_handler!(handle_min_temp, Threshold::MinTemp);
threshold_handler!(handle_max_temp, Threshold::MaxTemp);
threshold_handler!(handle_min_start, Threshold::MinStart);
threshold_handler!(handle_min_stop, Threshold::MinStop);
threshold_handler!(handle_min_pwm, Threshold::MinPwm);
threshold_handler!(handle_max_pwm, Threshold::MaxPwm);

/// Directives this reader acts on. `DEVPATH`, `DEVNAME` and `FCFANS` are
/// regenerated from hardware on save and need no handler.
const HANDLERS: &[(&str, Handler)] = &[
    ("INTERVAL", handle_interval),
    ("FCTEMPS", handle_fctemps),
    ("MINTEMP", handle_min_temp),
    ("MAXTEMP", handle_max_temp),
    ("MINSTART", handle_min_start),
    ("MINSTOP", handle_min_stop),
    ("MINPWM", handle_min_pwm),
    ("MAXPWM", handle_max_pwm),
];

/// Parse config text into edits. Only oversized input is rejected.
pub fn parse(text: &str) -> Result<ConfigEdits, ParseError> {
    if text.len() > MAX_CONFIG_SIZE {
        return Err(ParseError::TooLarge {
            size: text.len(),
            max_size: MAX_CONFIG_SIZE,
        });
    }

    let mut edits = ConfigEdits::default();
    for stmt in statements(text) {
        match HANDLERS.iter().find(|(name, _)| *name == stmt.directive) {
            Some((_, handler)) => handler(&stmt, &mut edits),
            None => debug!(line = stmt.line, directive = %stmt.directive, "Ignoring directive"),
        }
    }
    Ok(edits)
}

/// Split text into statements: comments stripped, whitespace collapsed,
/// empty lines and lines without `=` dropped.
pub fn statements(text: &str) -> Vec<Statement> {
    text.lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let code = match raw.find('#') {
                Some(offset) => &raw[..offset],
                None => raw,
            };
            let line = code.split_whitespace().collect::<Vec<_>>().join(" ");
            let (directive, payload) = line.split_once('=')?;
            Some(Statement {
                line: i + 1,
                directive: directive.to_string(),
                payload: payload.to_string(),
            })
        })
        .collect()
}

fn parse_number(s: &str) -> i32 {
    s.trim().parse().unwrap_or(0)
}

fn handle_interval(stmt: &Statement, edits: &mut ConfigEdits) {
    edits.interval = Some(stmt.payload.trim().parse().unwrap_or(0));
}

fn handle_fctemps(stmt: &Statement, edits: &mut ConfigEdits) {
    for (pwm, temp) in stmt.pairs() {
        let Some(pwm) = ident::parse_pwm(pwm) else {
            debug!(line = stmt.line, pwm, "Unresolvable pwm identifier");
            continue;
        };
        edits.edits.push(Edit::Associate {
            pwm,
            temp: ident::parse_temp(temp),
        });
    }
}

fn handle_threshold(stmt: &Statement, edits: &mut ConfigEdits, field: Threshold) {
    for (pwm, value) in stmt.pairs() {
        let Some(pwm) = ident::parse_pwm(pwm) else {
            debug!(line = stmt.line, pwm, "Unresolvable pwm identifier");
            continue;
        };
        edits.edits.push(Edit::Threshold {
            pwm,
            field,
            value: parse_number(value),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{standard_hwmon, SAMPLE_CONFIG};

    #[test]
    fn test_statements_strip_comments_and_whitespace() {
        let text = "# header\n\n  INTERVAL=7   # seconds\nFCTEMPS=hwmon0/pwm1=hwmon0/temp1_input    hwmon0/pwm2=hwmon0/temp2_input\n   # indented comment\nno equals here\n";
        let stmts = statements(text);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].directive, "INTERVAL");
        assert_eq!(stmts[0].payload, "7");
        assert_eq!(stmts[0].line, 3);
        assert_eq!(
            stmts[1].pairs(),
            vec![
                ("hwmon0/pwm1", "hwmon0/temp1_input"),
                ("hwmon0/pwm2", "hwmon0/temp2_input"),
            ]
        );
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse("INTERVAL=5\n").unwrap().interval(), Some(5));
        assert_eq!(parse("INTERVAL=soon\n").unwrap().interval(), Some(0));
        assert_eq!(parse("INTERVAL=\n").unwrap().interval(), Some(0));
        assert_eq!(parse("MINTEMP=hwmon0/pwm1=3\n").unwrap().interval(), None);
    }

    #[test]
    fn test_parse_malformed_number_is_zero() {
        let edits = parse("MINTEMP=hwmon0/pwm1=abc\n").unwrap();
        assert_eq!(
            edits.edits(),
            &[Edit::Threshold {
                pwm: ChannelId::new(0, 1),
                field: Threshold::MinTemp,
                value: 0,
            }]
        );
    }

    #[test]
    fn test_parse_ignores_unknown_directives() {
        let edits = parse("DEVPATH=hwmon0=devices/platform/it87\nFCFANS=hwmon0/pwm1=hwmon0/fan1_input\nFOO=bar\n").unwrap();
        assert!(edits.edits().is_empty());
        assert_eq!(edits.interval(), None);
    }

    #[test]
    fn test_parse_skips_bad_tokens_only() {
        let edits = parse("MAXTEMP=hwmon0/pwm1=70 garbage hwmonX/pwm2=60 hwmon0/pwm3=65\n").unwrap();
        assert_eq!(edits.edits().len(), 2);
    }

    #[test]
    fn test_parse_rejects_oversized_text() {
        let text = "#".repeat(MAX_CONFIG_SIZE + 1);
        assert!(matches!(parse(&text), Err(ParseError::TooLarge { .. })));
    }

    #[test]
    fn test_apply_sample_config() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        let edits = parse(SAMPLE_CONFIG).unwrap();
        assert_eq!(edits.interval(), Some(5));

        let report = edits.apply_to(&mut registry);
        assert_eq!(report.skipped, 0);

        let pwm1 = registry.pwm_fan(ChannelId::new(0, 1)).unwrap();
        assert_eq!(pwm1.temp(), Some(ChannelId::new(0, 1)));
        assert_eq!(pwm1.min_temp(), 30);
        assert_eq!(pwm1.max_temp(), 70);
        assert_eq!(pwm1.min_start(), 150);
        assert_eq!(pwm1.min_stop(), 100);
        assert_eq!(pwm1.min_pwm(), 0);
        assert_eq!(pwm1.max_pwm(), 200);

        let pwm2 = registry.pwm_fan(ChannelId::new(0, 2)).unwrap();
        assert_eq!(pwm2.temp(), Some(ChannelId::new(1, 1)));
        assert_eq!(pwm2.min_pwm(), 20);

        let pwm3 = registry.pwm_fan(ChannelId::new(0, 3)).unwrap();
        assert!(!pwm3.has_temp());
    }

    #[test]
    fn test_apply_unknown_chip_changes_nothing() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        let before = format!("{:?}", registry.chips());

        let report = parse("FCTEMPS=hwmon9/pwm1=hwmon9/temp1_input\nMAXTEMP=hwmon9/pwm1=70\n")
            .unwrap()
            .apply_to(&mut registry);

        assert_eq!(report.skipped, 2);
        assert!(report.changed.is_empty());
        assert_eq!(format!("{:?}", registry.chips()), before);
    }

    #[test]
    fn test_apply_clears_stale_association() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        parse(SAMPLE_CONFIG).unwrap().apply_to(&mut registry);

        let report = parse("INTERVAL=10\n").unwrap().apply_to(&mut registry);
        assert!(registry.pwm_fans().all(|f| !f.has_temp()));
        assert!(report.changed.contains(&ChannelId::new(0, 1)));
    }

    #[test]
    fn test_apply_unresolvable_temp_clears_association() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        registry
            .pwm_fan_mut(ChannelId::new(0, 1))
            .unwrap()
            .set_min_pwm(40);

        parse("FCTEMPS=hwmon0/pwm1=hwmon7/temp1_input\n")
            .unwrap()
            .apply_to(&mut registry);

        let fan = registry.pwm_fan(ChannelId::new(0, 1)).unwrap();
        assert!(!fan.has_temp());
        assert_eq!(fan.min_pwm(), 40);
    }

    #[test]
    fn test_minpwm_reset_then_explicit_value() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        registry
            .pwm_fan_mut(ChannelId::new(0, 1))
            .unwrap()
            .set_min_pwm(40);

        parse("FCTEMPS=hwmon0/pwm1=hwmon0/temp1_input\n")
            .unwrap()
            .apply_to(&mut registry);
        assert_eq!(registry.pwm_fan(ChannelId::new(0, 1)).unwrap().min_pwm(), 0);

        parse("FCTEMPS=hwmon0/pwm1=hwmon0/temp1_input\nMINPWM=hwmon0/pwm1=60\n")
            .unwrap()
            .apply_to(&mut registry);
        assert_eq!(registry.pwm_fan(ChannelId::new(0, 1)).unwrap().min_pwm(), 60);

        // MINPWM before FCTEMPS is overridden by the association reset
        parse("MINPWM=hwmon0/pwm1=60\nFCTEMPS=hwmon0/pwm1=hwmon0/temp1_input\n")
            .unwrap()
            .apply_to(&mut registry);
        assert_eq!(registry.pwm_fan(ChannelId::new(0, 1)).unwrap().min_pwm(), 0);
    }

    #[test]
    fn test_apply_keeps_active_flag() {
        let hw = standard_hwmon();
        let mut registry = hw.registry();
        registry
            .pwm_fan_mut(ChannelId::new(0, 1))
            .unwrap()
            .set_active(false);

        parse("INTERVAL=5\nFCTEMPS=hwmon0/pwm1=hwmon0/temp1_input\nMAXTEMP=hwmon0/pwm1=70\n")
            .unwrap()
            .apply_to(&mut registry);

        let fan = registry.pwm_fan(ChannelId::new(0, 1)).unwrap();
        assert!(!fan.active());
        assert_eq!(fan.temp(), Some(ChannelId::new(0, 1)));
        assert_eq!(fan.max_temp(), 70);
    }
}
