/*
 * Test utilities for Fancontrol-GUI
 *
 * Builds throwaway hwmon trees so the registry, parser and document can be
 * exercised without real hardware.
 */

#[cfg(test)]
pub mod test_utils {
    use std::fs;
    use std::os::unix::fs::symlink;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use crate::hwmon::SensorRegistry;

    /// A fake `/sys` with a `class/hwmon` directory of symlinks
    pub struct FakeHwmon {
        dir: TempDir,
    }

    impl FakeHwmon {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("class/hwmon")).unwrap();
            Self { dir }
        }

        /// The directory that plays `/sys/class/hwmon`
        pub fn root(&self) -> PathBuf {
            self.dir.path().join("class/hwmon")
        }

        /// Create `hwmon<n>` for driver `name` with the given temp and pwm channels
        pub fn add_chip(&self, n: usize, name: &str, temps: &[usize], pwms: &[usize]) -> PathBuf {
            let device = self
                .dir
                .path()
                .join("devices/platform")
                .join(name)
                .join("hwmon")
                .join(format!("hwmon{}", n));
            fs::create_dir_all(&device).unwrap();
            fs::write(device.join("name"), format!("{}\n", name)).unwrap();
            for t in temps {
                fs::write(device.join(format!("temp{}_input", t)), "40000\n").unwrap();
            }
            for p in pwms {
                fs::write(device.join(format!("pwm{}", p)), "255\n").unwrap();
                fs::write(device.join(format!("pwm{}_enable", p)), "2\n").unwrap();
                fs::write(device.join(format!("fan{}_input", p)), "1200\n").unwrap();
            }
            symlink(&device, self.root().join(format!("hwmon{}", n))).unwrap();
            device
        }

        /// Overwrite a channel file of `hwmon<n>`
        pub fn set_value(&self, n: usize, file: &str, value: &str) {
            let device = fs::canonicalize(self.root().join(format!("hwmon{}", n))).unwrap();
            fs::write(device.join(file), format!("{}\n", value)).unwrap();
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        pub fn registry(&self) -> SensorRegistry {
            SensorRegistry::discover_at(self.root())
        }
    }

    /// hwmon0 (`it87`, temps 1-2, pwms 1-3) and hwmon1 (`coretemp`, temp 1)
    pub fn standard_hwmon() -> FakeHwmon {
        let hw = FakeHwmon::new();
        hw.add_chip(0, "it87.656", &[1, 2], &[1, 2, 3]);
        hw.add_chip(1, "coretemp", &[1], &[]);
        hw
    }

    /// A config for [`standard_hwmon`] as fancontrol's pwmconfig would write it
    pub const SAMPLE_CONFIG: &str = "\
# Configuration file generated by pwmconfig
INTERVAL=5
DEVPATH=hwmon0=devices/platform/it87.656 hwmon1=devices/platform/coretemp
DEVNAME=hwmon0=it87 hwmon1=coretemp
FCTEMPS=hwmon0/pwm1=hwmon0/temp1_input hwmon0/pwm2=hwmon1/temp1_input
FCFANS=hwmon0/pwm1=hwmon0/fan1_input hwmon0/pwm2=hwmon0/fan2_input
MINTEMP=hwmon0/pwm1=30 hwmon0/pwm2=35
MAXTEMP=hwmon0/pwm1=70 hwmon0/pwm2=80
MINSTART=hwmon0/pwm1=150 hwmon0/pwm2=120
MINSTOP=hwmon0/pwm1=100 hwmon0/pwm2=90
MINPWM=hwmon0/pwm2=20
MAXPWM=hwmon0/pwm1=200 hwmon0/pwm2=255
";
}
