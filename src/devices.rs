//! Padauk device catalogue.
//!
//! Static data only: the synchronizer uses it to validate `DEVICE` and `ARCH`
//! values before they are written, and the CLI uses it for `makefig devices`.
//! ROM sizes are in program words, RAM sizes in bytes, matching the
//! `ROM_SIZES` / `RAM_SIZES` tables the generated Makefile carries.

use serde::Serialize;

/// Memory sizes for one supported microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Device {
    pub name: &'static str,
    pub rom: u32,
    pub ram: u32,
}

const fn device(name: &'static str, rom: u32, ram: u32) -> Device {
    Device { name, rom, ram }
}

pub const DEVICES: &[Device] = &[
    device("MCU390", 2048, 128),
    device("PFS154", 2048, 128),
    device("PFS172", 2048, 128),
    device("PFS173", 3072, 256),
    device("PMC131", 1536, 88),
    device("PMC251", 1024, 59),
    device("PMC271", 1024, 64),
    device("PMS131", 1536, 88),
    device("PMS132", 2048, 128),
    device("PMS132B", 2048, 128),
    device("PMS133", 4096, 256),
    device("PMS134", 4096, 256),
    device("PMS150C", 1024, 64),
    device("PMS152", 1280, 80),
    device("PMS154B", 2048, 128),
    device("PMS154C", 2048, 128),
    device("PMS15A", 1024, 64),
    device("PMS171B", 1536, 96),
    device("PMS271", 1024, 64),
];

/// Instruction-set architectures accepted for `ARCH`.
pub const ARCHITECTURES: &[&str] = &["pdk13", "pdk14", "pdk15"];

pub const DEVICE_NAMES: &[&str] = &[
    "MCU390", "PFS154", "PFS172", "PFS173", "PMC131", "PMC251", "PMC271", "PMS131", "PMS132",
    "PMS132B", "PMS133", "PMS134", "PMS150C", "PMS152", "PMS154B", "PMS154C", "PMS15A", "PMS171B",
    "PMS271",
];

/// Look up a device by exact (case-sensitive) name.
pub fn lookup(name: &str) -> Option<&'static Device> {
    DEVICES.iter().find(|d| d.name == name)
}
