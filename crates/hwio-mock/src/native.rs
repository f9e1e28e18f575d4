use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hwio::native::RawHandle;
use hwio::{NativeBackend, NativeError};
use parking_lot::Mutex;
use tracing::trace;

pub const ENOENT: i32 = 2;
pub const EIO: i32 = 5;
pub const EBADF: i32 = 9;

fn describe(code: i32) -> String {
    match code {
        0 => "success",
        ENOENT => "no such file or directory",
        EIO => "input/output error",
        EBADF => "bad file descriptor",
        _ => "unknown error",
    }
    .to_owned()
}

/// One recorded `io_control` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoControl {
    pub path: String,
    pub command: u64,
    pub value: u64,
}

#[derive(Default)]
struct State {
    next_handle: RawHandle,
    handles: HashMap<RawHandle, String>,
    opens: HashMap<String, usize>,
    closes: HashMap<String, usize>,
    fail_open: HashSet<String>,
    fail_close: HashSet<String>,
    fail_io_control: HashSet<String>,
    io_controls: Vec<IoControl>,
    open_delay: Duration,
    last_error: i32,
}

impl State {
    fn fail(&mut self, code: i32) -> NativeError {
        self.last_error = code;
        NativeError::new(code, describe(code))
    }
}

/// In-memory [`NativeBackend`].
///
/// Counts opens and closes per path and can be told to fail them. Clones
/// share state, so a test can keep one clone to inspect what a plugin did
/// with another.
#[derive(Clone, Default)]
pub struct MockNative {
    state: Arc<Mutex<State>>,
}

impl MockNative {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open attempts on `path`, failed ones included.
    pub fn open_count(&self, path: &str) -> usize {
        self.state.lock().opens.get(path).copied().unwrap_or(0)
    }

    pub fn close_count(&self, path: &str) -> usize {
        self.state.lock().closes.get(path).copied().unwrap_or(0)
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.state.lock().handles.values().any(|p| p == path)
    }

    pub fn open_handles(&self) -> usize {
        self.state.lock().handles.len()
    }

    pub fn io_controls(&self) -> Vec<IoControl> {
        self.state.lock().io_controls.clone()
    }

    pub fn fail_open(&self, path: &str) {
        self.state.lock().fail_open.insert(path.to_owned());
    }

    pub fn fail_close(&self, path: &str) {
        self.state.lock().fail_close.insert(path.to_owned());
    }

    pub fn fail_io_control(&self, path: &str) {
        self.state.lock().fail_io_control.insert(path.to_owned());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.fail_open.clear();
        state.fail_close.clear();
        state.fail_io_control.clear();
    }

    /// Make every open block for `delay` first.
    pub fn set_open_delay(&self, delay: Duration) {
        self.state.lock().open_delay = delay;
    }
}

impl NativeBackend for MockNative {
    fn open(&self, path: &str) -> Result<RawHandle, NativeError> {
        let delay = self.state.lock().open_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        *state.opens.entry(path.to_owned()).or_default() += 1;
        if state.fail_open.contains(path) {
            return Err(state.fail(ENOENT));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.handles.insert(handle, path.to_owned());
        trace!(path, handle, "mock open");
        Ok(handle)
    }

    fn close(&self, handle: RawHandle) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        let Some(path) = state.handles.remove(&handle) else {
            return Err(state.fail(EBADF));
        };
        *state.closes.entry(path.clone()).or_default() += 1;
        trace!(path = %path, handle, "mock close");
        if state.fail_close.contains(&path) {
            return Err(state.fail(EIO));
        }
        Ok(())
    }

    fn io_control(
        &self,
        handle: RawHandle,
        command: u64,
        value: u64,
    ) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        let Some(path) = state.handles.get(&handle).cloned() else {
            return Err(state.fail(EBADF));
        };
        if state.fail_io_control.contains(&path) {
            return Err(state.fail(EIO));
        }
        state.io_controls.push(IoControl { path, command, value });
        Ok(())
    }

    fn last_error_code(&self) -> i32 {
        self.state.lock().last_error
    }

    fn describe_error(&self, code: i32) -> String {
        describe(code)
    }
}
