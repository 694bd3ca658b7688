// ── Device registry ──
//
// Fixed-capacity, ordered list of configured actuators with stable
// external identifiers, mirrored into the key-value store after every
// mutation.
//
// Persisted layout, per device at position `i`:
//
//   dev{i}_name    string
//   dev{i}_custom  bool    (true = custom URL target)
//   dev{i}_pin     int     (-1 for URL targets)
//   dev{i}_url     string  ("" for pin targets)
//   dev{i}_uuid    string  (stable identifier)
//
// plus `device_count` and `next_slot` (the next identifier allocation
// slot, never reused).

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{MAX_DEVICES, RegistryLimits};
use crate::error::{CoreError, persist};
use crate::model::{Device, DeviceTarget, MacAddress, StableId};
use crate::ports::KeyValueStore;

const COUNT_KEY: &str = "device_count";
const NEXT_SLOT_KEY: &str = "next_slot";

fn field_key(index: usize, field: &str) -> String {
    format!("dev{index}_{field}")
}

/// What [`DeviceRegistry::load`] found in storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Records skipped because they were empty, duplicated or unusable.
    pub dropped: usize,
    /// Devices that had no stored identifier and received a fresh one.
    pub regenerated_ids: usize,
    /// The stored count was negative or above capacity.
    pub count_clamped: bool,
    /// A repair was needed but could not be written back. The loaded set is
    /// still usable; the repair is retried on the next successful save.
    pub repair_failed: bool,
}

/// The set of configured devices.
///
/// Names are unique ignoring case. Every mutation is persisted before the
/// call returns; if persisting fails the in-memory change is rolled back and
/// the error is returned.
pub struct DeviceRegistry<S: KeyValueStore> {
    store: Arc<S>,
    devices: heapless::Vec<Device, MAX_DEVICES>,
    limits: RegistryLimits,
    node_mac: MacAddress,
    next_slot: u16,
}

impl<S: KeyValueStore> DeviceRegistry<S> {
    /// An empty registry. Nothing is read from `store` until [`load`](Self::load).
    pub fn new(store: Arc<S>, node_mac: MacAddress, limits: RegistryLimits) -> Self {
        Self {
            store,
            devices: heapless::Vec::new(),
            limits,
            node_mac,
            next_slot: 0,
        }
    }

    /// Create a registry and restore its contents from `store`.
    pub fn open(
        store: Arc<S>,
        node_mac: MacAddress,
        limits: RegistryLimits,
    ) -> Result<Self, CoreError> {
        let mut registry = Self::new(store, node_mac, limits);
        let report = registry.load()?;
        info!(
            devices = report.loaded,
            dropped = report.dropped,
            repair_failed = report.repair_failed,
            "device registry loaded"
        );
        Ok(registry)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Add a device that pulses `pin` on the default actuator.
    pub fn add_pin_device(&mut self, name: &str, pin: u8) -> Result<StableId, CoreError> {
        self.add(name, DeviceTarget::Pin(pin))
    }

    /// Add a device that calls `url`.
    pub fn add_url_device(&mut self, name: &str, url: &str) -> Result<StableId, CoreError> {
        self.add(name, DeviceTarget::Url(url.trim().to_owned()))
    }

    /// Validate, assign a stable identifier, append, and persist.
    pub fn add(&mut self, name: &str, target: DeviceTarget) -> Result<StableId, CoreError> {
        let name = self.validate_name(name)?;
        self.validate_target(&target)?;

        if self.is_full() {
            return Err(CoreError::Capacity {
                capacity: MAX_DEVICES,
            });
        }
        if self.exists(&name) {
            return Err(CoreError::DuplicateName { name });
        }

        let stable_id = self.allocate_id()?;
        let device = Device::new(name, target, stable_id.clone());
        if self.devices.push(device).is_err() {
            return Err(CoreError::Capacity {
                capacity: MAX_DEVICES,
            });
        }

        if let Err(e) = self.save() {
            self.devices.pop();
            return Err(e);
        }

        if let Some(device) = self.devices.last() {
            info!(name = %device.name, id = %stable_id, target = %device.target, "device added");
        }
        Ok(stable_id)
    }

    /// Remove the device called `name`, shifting later entries down.
    pub fn remove(&mut self, name: &str) -> Result<Device, CoreError> {
        let Some(index) = self.position(name) else {
            warn!(name, "remove: device not found");
            return Err(CoreError::NotFound {
                name: name.to_owned(),
            });
        };

        let removed = self.devices.remove(index);
        if let Err(e) = self.save() {
            if self.devices.insert(index, removed).is_err() {
                warn!(index, "could not restore device after failed save");
            }
            // Compaction may already have shifted records in storage.
            if let Err(restore) = self.save() {
                warn!(error = %restore, "could not restore stored device records");
            }
            return Err(e);
        }

        info!(name = %removed.name, id = %removed.stable_id, "device removed");
        Ok(removed)
    }

    /// Remove every device.
    pub fn clear(&mut self) -> Result<(), CoreError> {
        let previous = std::mem::take(&mut self.devices);
        if let Err(e) = self.save() {
            self.devices = previous;
            return Err(e);
        }
        info!(removed = previous.len(), "all devices removed");
        Ok(())
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Case-insensitive linear lookup.
    pub fn find(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.matches(name))
    }

    /// Mutable lookup. Changes are not persisted until [`save`](Self::save).
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.matches(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Devices in insertion order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.devices.is_full()
    }

    pub fn capacity(&self) -> usize {
        MAX_DEVICES
    }

    pub fn node_mac(&self) -> MacAddress {
        self.node_mac
    }

    pub fn limits(&self) -> &RegistryLimits {
        &self.limits
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Replace the in-memory set with what `store` holds.
    ///
    /// A missing or zero count is an empty registry. A negative count reads
    /// as zero and a count above capacity is clamped. Records that cannot be
    /// used (empty name, duplicate name, missing pin, empty URL) are dropped;
    /// devices without an identifier get a fresh one. If anything was
    /// dropped or regenerated the repaired set is written back; a store that
    /// refuses the write is logged and flagged in the report, not an error.
    pub fn load(&mut self) -> Result<LoadReport, CoreError> {
        let mut report = LoadReport::default();

        let raw_count = self.store.get_int(COUNT_KEY, 0);
        let count = match usize::try_from(raw_count) {
            Ok(n) if n <= MAX_DEVICES => n,
            Ok(n) => {
                warn!(stored = n, capacity = MAX_DEVICES, "device count clamped");
                report.count_clamped = true;
                MAX_DEVICES
            }
            Err(_) => {
                warn!(stored = raw_count, "negative device count, treating as empty");
                report.count_clamped = true;
                0
            }
        };

        self.devices.clear();
        let mut missing_ids = Vec::new();
        for index in 0..count {
            let Some((device, has_id)) = self.read_record(index) else {
                report.dropped += 1;
                continue;
            };
            if !has_id {
                missing_ids.push(self.devices.len());
            }
            // `count` is clamped to capacity, so this cannot overflow.
            if self.devices.push(device).is_err() {
                report.dropped += 1;
            }
        }

        let stored_slot = u16::try_from(self.store.get_int(NEXT_SLOT_KEY, 0)).unwrap_or(0);
        let used_floor = self
            .devices
            .iter()
            .filter_map(|d| d.stable_id.slot())
            .max()
            .map_or(0, |s| s.saturating_add(1));
        self.next_slot = stored_slot.max(used_floor);

        for index in missing_ids {
            let id = self.allocate_id()?;
            if let Some(device) = self.devices.get_mut(index) {
                debug!(name = %device.name, id = %id, "regenerated device identifier");
                device.stable_id = id;
                report.regenerated_ids += 1;
            }
        }

        report.loaded = self.devices.len();
        if report.dropped > 0 || report.regenerated_ids > 0 || report.count_clamped {
            if let Err(e) = self.save() {
                warn!(error = %e, "could not write repaired device registry");
                report.repair_failed = true;
            }
        }
        Ok(report)
    }

    /// Write every device, then the count, then drop stale trailing slots.
    ///
    /// Fields go before the count, so an appended record that is cut off
    /// mid-save stays invisible. Removal rewrites slots that are already
    /// visible: until a save completes, a slot can hold fields from two
    /// neighbouring devices. [`remove`](Self::remove) rewrites the restored
    /// set after a failed save to close that window.
    pub fn save(&self) -> Result<(), CoreError> {
        let previous = usize::try_from(self.store.get_int(COUNT_KEY, 0))
            .unwrap_or(0)
            .min(MAX_DEVICES);

        for (index, device) in self.devices.iter().enumerate() {
            self.write_record(index, device)?;
        }
        let count = i32::try_from(self.devices.len()).unwrap_or(i32::MAX);
        persist(self.store.put_int(COUNT_KEY, count), COUNT_KEY)?;
        persist(
            self.store.put_int(NEXT_SLOT_KEY, i32::from(self.next_slot)),
            NEXT_SLOT_KEY,
        )?;

        for index in self.devices.len()..previous {
            for field in ["name", "pin", "custom", "url", "uuid"] {
                let key = field_key(index, field);
                persist(self.store.remove(&key), &key)?;
            }
        }
        debug!(count = self.devices.len(), "device registry saved");
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn position(&self, name: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.matches(name))
    }

    fn allocate_id(&mut self) -> Result<StableId, CoreError> {
        let slot = self.next_slot;
        self.next_slot = slot.checked_add(1).ok_or_else(|| CoreError::Storage {
            key: NEXT_SLOT_KEY.into(),
            message: "identifier slots exhausted".into(),
        })?;
        Ok(StableId::generate(self.node_mac, slot))
    }

    fn validate_name(&self, name: &str) -> Result<String, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::invalid("name", "must not be empty"));
        }
        let len = name.chars().count();
        if len > self.limits.max_name_len {
            return Err(CoreError::invalid(
                "name",
                format!("{len} characters, maximum is {}", self.limits.max_name_len),
            ));
        }
        Ok(name.to_owned())
    }

    fn validate_target(&self, target: &DeviceTarget) -> Result<(), CoreError> {
        match target {
            DeviceTarget::Pin(pin) => {
                let (min, max) = (self.limits.min_pin, self.limits.max_pin);
                if !(min..=max).contains(pin) {
                    return Err(CoreError::invalid(
                        "pin",
                        format!("{pin} is outside {min}-{max}"),
                    ));
                }
            }
            DeviceTarget::Url(url) => {
                if url.is_empty() {
                    return Err(CoreError::invalid("url", "must not be empty"));
                }
                if url.len() > self.limits.max_url_len {
                    return Err(CoreError::invalid(
                        "url",
                        format!("longer than {} characters", self.limits.max_url_len),
                    ));
                }
                let parsed =
                    url::Url::parse(url).map_err(|e| CoreError::invalid("url", e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(CoreError::invalid(
                        "url",
                        format!("scheme '{}' is not http or https", parsed.scheme()),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Read record `index`; `None` if it is unusable. The flag reports
    /// whether a stable identifier was stored.
    fn read_record(&self, index: usize) -> Option<(Device, bool)> {
        let name = self.store.get_string(&field_key(index, "name"), "");
        let name = name.trim();
        if name.is_empty() {
            warn!(index, "dropping device record without a name");
            return None;
        }
        if self.exists(name) {
            warn!(index, name, "dropping duplicate device record");
            return None;
        }

        let target = if self.store.get_bool(&field_key(index, "custom"), false) {
            let url = self.store.get_string(&field_key(index, "url"), "");
            if url.is_empty() {
                warn!(index, name, "dropping URL device without a URL");
                return None;
            }
            DeviceTarget::Url(url)
        } else {
            let raw = self.store.get_int(&field_key(index, "pin"), -1);
            let Ok(pin) = u8::try_from(raw) else {
                warn!(index, name, pin = raw, "dropping pin device with unusable pin");
                return None;
            };
            DeviceTarget::Pin(pin)
        };

        let uuid = self.store.get_string(&field_key(index, "uuid"), "");
        let has_id = !uuid.trim().is_empty();
        Some((Device::new(name, target, StableId::from(uuid)), has_id))
    }

    fn write_record(&self, index: usize, device: &Device) -> Result<(), CoreError> {
        let (custom, pin, url) = match &device.target {
            DeviceTarget::Pin(pin) => (false, i32::from(*pin), ""),
            DeviceTarget::Url(url) => (true, -1, url.as_str()),
        };

        let key = field_key(index, "name");
        persist(self.store.put_string(&key, &device.name), &key)?;
        let key = field_key(index, "custom");
        persist(self.store.put_bool(&key, custom), &key)?;
        let key = field_key(index, "pin");
        persist(self.store.put_int(&key, pin), &key)?;
        let key = field_key(index, "url");
        persist(self.store.put_string(&key, url), &key)?;
        let key = field_key(index, "uuid");
        persist(self.store.put_string(&key, device.stable_id.as_str()), &key)
    }
}
