use std::{fmt, str::FromStr};

use crate::error::{ProxyError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Cpu,
    Cuda,
    Meta,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    devicetype: DeviceType,
    index: Option<u32>,
}

impl Device {
    pub const fn cpu() -> Device {
        Device {
            devicetype: DeviceType::Cpu,
            index: None,
        }
    }

    pub const fn cuda(index: u32) -> Device {
        Device {
            devicetype: DeviceType::Cuda,
            index: Some(index),
        }
    }

    pub const fn meta() -> Device {
        Device {
            devicetype: DeviceType::Meta,
            index: None,
        }
    }

    pub const fn devicetype(&self) -> DeviceType {
        self.devicetype
    }

    pub const fn index(&self) -> Option<u32> {
        self.index
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.devicetype, self.index) {
            (DeviceType::Cpu, _) => f.write_str("cpu"),
            (DeviceType::Meta, _) => f.write_str("meta"),
            (DeviceType::Cuda, index) => write!(f, "cuda:{}", index.unwrap_or(0)),
        }
    }
}

/// `cpu`, `meta`, `cuda` or `cuda:N`.
impl FromStr for Device {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ProxyError::InvalidDevice(s.to_string());
        let (kind, index) = match s.split_once(':') {
            Some((kind, index)) => (kind, Some(index.parse::<u32>().map_err(|_| invalid())?)),
            None => (s, None),
        };
        match (kind, index) {
            ("cpu", None) => Ok(Device::cpu()),
            ("meta", None) => Ok(Device::meta()),
            ("cuda", index) => Ok(Device::cuda(index.unwrap_or(0))),
            _ => Err(invalid()),
        }
    }
}

pub trait IntoDevice {
    fn into_device(self) -> Result<Device>;
}

impl IntoDevice for Device {
    fn into_device(self) -> Result<Device> {
        Ok(self)
    }
}

impl IntoDevice for &str {
    fn into_device(self) -> Result<Device> {
        self.parse()
    }
}

impl IntoDevice for String {
    fn into_device(self) -> Result<Device> {
        self.parse()
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn parses_known_devices() {
        assert_eq!("cpu".parse::<Device>(), Ok(Device::cpu()));
        assert_eq!("cuda".parse::<Device>(), Ok(Device::cuda(0)));
        assert_eq!("cuda:3".parse::<Device>(), Ok(Device::cuda(3)));
        assert_eq!(Device::cuda(1).to_string(), "cuda:1");
    }

    #[test]
    fn rejects_unknown_devices() {
        for s in ["tpu", "cpu:1", "cuda:x", ""] {
            assert_eq!(
                s.parse::<Device>(),
                Err(ProxyError::InvalidDevice(s.to_string()))
            );
        }
    }
}
