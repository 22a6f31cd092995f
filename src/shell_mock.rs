//! Test mock for `shell::run_host` and related functions.
//!
//! Installs a thread-local handler that intercepts host commands during
//! tests and records every script it sees, so tests can assert on the
//! exact sequence of hypervisor calls.

use std::cell::RefCell;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};

/// Mock response for a host command.
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
}

impl MockResponse {
    pub fn ok(stdout: &str) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.to_string(),
        }
    }

    pub fn empty() -> Self {
        Self::ok("")
    }

    pub fn fail(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
        }
    }

    fn to_output(&self) -> Output {
        Output {
            // Unix exit code encoding: status = code << 8
            status: ExitStatus::from_raw(self.exit_code << 8),
            stdout: self.stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }
}

type MockHandler = Box<dyn Fn(&str) -> MockResponse>;

thread_local! {
    static HANDLER: RefCell<Option<MockHandler>> = const { RefCell::new(None) };
}

/// Guard that clears the mock handler on drop.
pub struct MockGuard;

impl Drop for MockGuard {
    fn drop(&mut self) {
        HANDLER.with(|h| *h.borrow_mut() = None);
    }
}

/// Try to intercept a host command via the installed mock handler.
pub(crate) fn intercept(script: &str) -> Option<Output> {
    HANDLER.with(|h| h.borrow().as_ref().map(|f| f(script).to_output()))
}

/// Chronological log of every script the mock handled.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Install a scripted hypervisor mock.
///
/// Every intercepted script is appended to the returned [`CallLog`] before
/// being passed to `handler`. The mock is removed when the guard drops.
pub fn install<F>(handler: F) -> (MockGuard, CallLog)
where
    F: Fn(&str) -> MockResponse + 'static,
{
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let log_ref = log.clone();

    HANDLER.with(|h| {
        *h.borrow_mut() = Some(Box::new(move |script: &str| {
            log_ref.lock().unwrap().push(script.to_string());
            handler(script)
        }));
    });

    (MockGuard, log)
}

/// A stateful pct/qm simulation for lifecycle tests.
///
/// Tracks which node ids exist and which are running, answering `status`
/// queries accordingly and mutating state on create/restore/start/stop/
/// destroy. Commands matching `fail_on` return the given exit code.
pub struct FakeHypervisor {
    state: Arc<Mutex<FakeState>>,
    fail_on: Vec<(String, i32)>,
}

#[derive(Default)]
struct FakeState {
    existing: Vec<u32>,
    running: Vec<u32>,
}

impl FakeHypervisor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            fail_on: Vec::new(),
        }
    }

    /// Pre-seed a node as already existing (optionally running).
    pub fn with_existing(self, id: u32, running: bool) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.existing.push(id);
            if running {
                st.running.push(id);
            }
        }
        self
    }

    /// Fail any script containing `needle` with the given exit code.
    pub fn fail_on(mut self, needle: &str, exit_code: i32) -> Self {
        self.fail_on.push((needle.to_string(), exit_code));
        self
    }

    pub fn install(self) -> (MockGuard, CallLog) {
        let state = self.state;
        let fail_on = self.fail_on;
        install(move |script| {
            for (needle, code) in &fail_on {
                if script.contains(needle.as_str()) {
                    return MockResponse::fail(*code);
                }
            }
            handle(script, &state)
        })
    }
}

fn leading_id(rest: &str) -> Option<u32> {
    rest.split_whitespace().next()?.parse().ok()
}

fn handle(script: &str, state: &Arc<Mutex<FakeState>>) -> MockResponse {
    let s = script.trim();
    let mut st = state.lock().unwrap();

    for verb in ["pct status ", "qm status "] {
        if let Some(rest) = s.strip_prefix(verb)
            && let Some(id) = leading_id(rest)
        {
            if !st.existing.contains(&id) {
                return MockResponse::fail(2);
            }
            let word = if st.running.contains(&id) {
                "running"
            } else {
                "stopped"
            };
            return MockResponse::ok(&format!("status: {}", word));
        }
    }

    for verb in ["pct create ", "qmrestore "] {
        if let Some(rest) = s.strip_prefix(verb) {
            // qmrestore takes the image before the id
            let id = if verb == "qmrestore " {
                rest.split_whitespace().nth(1).and_then(|t| t.parse().ok())
            } else {
                leading_id(rest)
            };
            if let Some(id) = id {
                st.existing.push(id);
            }
            return MockResponse::empty();
        }
    }

    for verb in ["pct start ", "qm start "] {
        if let Some(rest) = s.strip_prefix(verb)
            && let Some(id) = leading_id(rest)
        {
            st.running.push(id);
            return MockResponse::empty();
        }
    }

    for verb in ["pct stop ", "qm stop "] {
        if let Some(rest) = s.strip_prefix(verb)
            && let Some(id) = leading_id(rest)
        {
            st.running.retain(|r| *r != id);
            return MockResponse::empty();
        }
    }

    for verb in ["pct destroy ", "qm destroy "] {
        if let Some(rest) = s.strip_prefix(verb)
            && let Some(id) = leading_id(rest)
        {
            st.existing.retain(|r| *r != id);
            st.running.retain(|r| *r != id);
            return MockResponse::empty();
        }
    }

    // exec, push, set, resize: succeed silently
    MockResponse::empty()
}
