//! Non-volatile byte store adapter.
//!
//! Implements [`ByteStore`] on NVS flash: one `u8` entry per sensor-setting
//! slot plus named blobs for the config.  Writes commit immediately — a
//! power cut between a settings commit and the next boot must not lose the
//! slot.  The host backend is an in-memory map (dev/test only).

use crate::app::ports::{ByteStore, SettingKey};
use crate::error::StorageError;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &str = "enose";

/// NVS entry name per setting slot.
#[cfg(any(target_os = "espidf", test))]
const fn slot_name(key: SettingKey) -> &'static [u8] {
    match key {
        SettingKey::HumidityOsr => b"h_osr\0",
        SettingKey::TemperatureOsr => b"t_osr\0",
        SettingKey::PressureOsr => b"p_osr\0",
        SettingKey::Standby => b"sb_time\0",
        SettingKey::Filter => b"filt\0",
    }
}

pub struct NvsByteStore {
    #[cfg(not(target_os = "espidf"))]
    bytes: HashMap<u16, u8>,
    #[cfg(not(target_os = "espidf"))]
    blobs: HashMap<String, Vec<u8>>,
}

impl NvsByteStore {
    /// Create the store and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("nvs: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(StorageError::OpenFailed);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(StorageError::OpenFailed);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::OpenFailed);
            }
            info!("nvs: flash initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("nvs: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            bytes: HashMap::new(),
            #[cfg(not(target_os = "espidf"))]
            blobs: HashMap::new(),
        })
    }

    /// Open the namespace, run a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = NAMESPACE.as_bytes();
        ns_buf[..ns_bytes.len()].copy_from_slice(ns_bytes);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

#[cfg(target_os = "espidf")]
impl ByteStore for NvsByteStore {
    fn read_byte(&mut self, key: SettingKey) -> Result<u8, StorageError> {
        Self::with_nvs_handle(false, |handle| {
            let mut value: u8 = 0;
            let ret = unsafe { nvs_get_u8(handle, slot_name(key).as_ptr() as *const _, &mut value) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(value)
        })
        .map_err(|_| StorageError::ReadFailed)
    }

    fn write_byte(&mut self, key: SettingKey, value: u8) -> Result<(), StorageError> {
        Self::with_nvs_handle(true, |handle| {
            let ret = unsafe { nvs_set_u8(handle, slot_name(key).as_ptr() as *const _, value) };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|_| StorageError::WriteFailed)
    }

    fn read_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let mut key_buf = [0u8; 16];
        let key_bytes = key.as_bytes();
        if key_bytes.len() >= key_buf.len() {
            return Err(StorageError::ReadFailed);
        }
        key_buf[..key_bytes.len()].copy_from_slice(key_bytes);

        Self::with_nvs_handle(false, |handle| {
            let mut size = buf.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        })
        .map_err(|_| StorageError::ReadFailed)
    }

    fn write_blob(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut key_buf = [0u8; 16];
        let key_bytes = key.as_bytes();
        if key_bytes.len() >= key_buf.len() {
            return Err(StorageError::WriteFailed);
        }
        key_buf[..key_bytes.len()].copy_from_slice(key_bytes);

        Self::with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|_| StorageError::WriteFailed)
    }
}

#[cfg(not(target_os = "espidf"))]
impl ByteStore for NvsByteStore {
    fn read_byte(&mut self, key: SettingKey) -> Result<u8, StorageError> {
        self.bytes
            .get(&key.addr())
            .copied()
            .ok_or(StorageError::ReadFailed)
    }

    fn write_byte(&mut self, key: SettingKey, value: u8) -> Result<(), StorageError> {
        self.bytes.insert(key.addr(), value);
        Ok(())
    }

    fn read_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.blobs.get(key).ok_or(StorageError::ReadFailed)?;
        if data.len() > buf.len() {
            return Err(StorageError::ReadFailed);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write_blob(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
