// ── Callback guard ──
//
// The discovery responder calls back through a bare `fn` with no context
// pointer, so the trampoline has to find its controller on its own. Only two
// things are global: the enable flag and a weak reference to the active
// controller's inbox. Both are process-wide, so a controller initialised on
// one thread can be serviced from another.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, trace};

use crate::ports::DeviceHandle;

/// A voice command accepted by the trampoline, waiting for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub handle: DeviceHandle,
    pub device: String,
    pub state: bool,
    pub value: u8,
}

pub(crate) type Inbox = Mutex<VecDeque<DeviceCommand>>;

static CALLBACK_ENABLED: AtomicBool = AtomicBool::new(false);
static ACTIVE_INSTANCE: Mutex<Weak<Inbox>> = Mutex::new(Weak::new());

/// Whether the trampoline currently forwards commands.
pub fn callbacks_enabled() -> bool {
    CALLBACK_ENABLED.load(Ordering::Acquire)
}

pub(crate) fn set_enabled(enabled: bool) {
    CALLBACK_ENABLED.store(enabled, Ordering::Release);
    trace!(enabled, "dispatch callbacks toggled");
}

pub(crate) fn set_active(inbox: &Arc<Inbox>) {
    *active() = Arc::downgrade(inbox);
}

pub(crate) fn is_active(inbox: &Arc<Inbox>) -> bool {
    std::ptr::eq(active().as_ptr(), Arc::as_ptr(inbox))
}

/// Forget the active instance, but only if it is `inbox`.
pub(crate) fn release(inbox: &Arc<Inbox>) {
    let mut slot = active();
    if std::ptr::eq(slot.as_ptr(), Arc::as_ptr(inbox)) {
        CALLBACK_ENABLED.store(false, Ordering::Release);
        *slot = Weak::new();
    }
}

/// The function registered with the discovery responder.
///
/// Returns without side effects when callbacks are disabled, when no
/// controller is active, or when the device name is empty. Otherwise the
/// command is queued for the active controller's next service tick.
pub fn command_trampoline(handle: DeviceHandle, device: &str, state: bool, value: u8) {
    if !callbacks_enabled() {
        debug!(device, "voice command ignored, dispatch disabled");
        return;
    }
    if device.is_empty() {
        return;
    }
    let Some(inbox) = active().upgrade() else {
        debug!(device, "voice command ignored, no active controller");
        return;
    };

    info!(device, state, value, "voice command received");
    lock(&inbox).push_back(DeviceCommand {
        handle,
        device: device.to_owned(),
        state,
        value,
    });
}

pub(crate) fn drain(inbox: &Inbox) -> Vec<DeviceCommand> {
    lock(inbox).drain(..).collect()
}

pub(crate) fn clear(inbox: &Inbox) {
    lock(inbox).clear();
}

fn lock(inbox: &Inbox) -> MutexGuard<'_, VecDeque<DeviceCommand>> {
    inbox.lock().unwrap_or_else(PoisonError::into_inner)
}

fn active() -> MutexGuard<'static, Weak<Inbox>> {
    ACTIVE_INSTANCE.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn new_inbox() -> Arc<Inbox> {
        Arc::new(Mutex::new(VecDeque::new()))
    }

    #[test]
    #[serial]
    fn disabled_trampoline_has_no_effect() {
        let inbox = new_inbox();
        set_active(&inbox);
        set_enabled(false);

        for _ in 0..10 {
            command_trampoline(0, "Lamp", true, 255);
        }
        assert!(drain(&inbox).is_empty());
        release(&inbox);
    }

    #[test]
    #[serial]
    fn enabled_trampoline_queues_command() {
        let inbox = new_inbox();
        set_active(&inbox);
        set_enabled(true);

        command_trampoline(3, "Lamp", true, 128);
        command_trampoline(3, "", true, 128);

        let queued = drain(&inbox);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].device, "Lamp");
        assert_eq!(queued[0].handle, 3);
        release(&inbox);
        assert!(!callbacks_enabled());
    }

    #[test]
    #[serial]
    fn dropped_instance_is_not_reached() {
        let inbox = new_inbox();
        set_active(&inbox);
        set_enabled(true);
        drop(inbox);

        // Must not panic or queue anywhere.
        command_trampoline(0, "Lamp", false, 0);
        set_enabled(false);
    }

    #[test]
    #[serial]
    fn release_ignores_other_instances() {
        let ours = new_inbox();
        let other = new_inbox();
        set_active(&ours);
        set_enabled(true);

        release(&other);
        assert!(callbacks_enabled());
        assert!(is_active(&ours));

        release(&ours);
        assert!(!is_active(&ours));
    }

    #[test]
    #[serial]
    fn callback_from_another_thread_reaches_active_instance() {
        let inbox = new_inbox();
        set_active(&inbox);
        set_enabled(true);

        std::thread::spawn(|| command_trampoline(2, "Lamp", false, 0))
            .join()
            .unwrap();

        let queued = drain(&inbox);
        assert_eq!(queued.len(), 1);
        assert!(!queued[0].state);
        release(&inbox);
    }
}
