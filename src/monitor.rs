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

//! Background refresh of live sensor readings.
//!
//! The monitor thread takes the document lock once per period and calls
//! [`ConfigDocument::refresh`]. Loads and saves go through the same lock,
//! so a refresh never runs in the middle of a parse.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::ConfigDocument;

pub struct Monitor {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Start refreshing `doc` every `period`
    pub fn spawn(doc: Arc<Mutex<ConfigDocument>>, period: Duration) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("sensor-monitor".into())
            .spawn(move || {
                info!(period_ms = period.as_millis() as u64, "Sensor monitor started");
                let mut iterations: u64 = 0;
                while !flag.load(Ordering::SeqCst) {
                    let sampled = doc.lock().refresh();
                    iterations += 1;
                    if sampled == 0 && iterations == 1 {
                        debug!("No live readings available");
                    }
                    // stop() unparks us early
                    thread::park_timeout(period);
                }
                info!(iterations, "Sensor monitor stopped");
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stop the thread and wait for it to finish
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentEvent;
    use crate::helper::NoHelper;
    use crate::ident::ChannelId;
    use crate::test_utils::test_utils::standard_hwmon;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_monitor_refreshes_until_stopped() {
        let hw = standard_hwmon();
        let mut doc = ConfigDocument::new(hw.registry(), Box::new(NoHelper));

        let refreshes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&refreshes);
        doc.subscribe(move |e| {
            if *e == DocumentEvent::SensorsUpdated {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let doc = Arc::new(Mutex::new(doc));
        let mut monitor = Monitor::spawn(Arc::clone(&doc), Duration::from_millis(20)).unwrap();
        assert!(monitor.is_running());

        hw.set_value(1, "temp1_input", "61000");
        let deadline = Instant::now() + Duration::from_secs(5);
        while refreshes.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        monitor.stop();
        assert!(!monitor.is_running());
        let seen = refreshes.load(Ordering::SeqCst);
        assert!(seen >= 3);

        thread::sleep(Duration::from_millis(60));
        assert_eq!(refreshes.load(Ordering::SeqCst), seen);
        assert_eq!(
            doc.lock().registry().temp(ChannelId::new(1, 1)).unwrap().value,
            Some(61.0)
        );
    }

    #[test]
    fn test_stop_wakes_long_period() {
        let hw = standard_hwmon();
        let doc = Arc::new(Mutex::new(ConfigDocument::new(hw.registry(), Box::new(NoHelper))));
        let monitor = Monitor::spawn(doc, Duration::from_secs(60)).unwrap();

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        drop(monitor);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
