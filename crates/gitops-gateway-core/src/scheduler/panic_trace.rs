//! Backtrace capture for panics caught by the schedulers.
//!
//! `catch_unwind` only yields the panic payload. The backtrace has to be
//! captured by the panic hook on the panicking thread; the hook parks it in a
//! thread local that the scheduler reads right after the unwind is caught,
//! which happens on the same thread within the same poll.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::sync::Once;

const MAX_TRACE_BYTES: usize = 8 * 1024;

static INSTALL: Once = Once::new();

thread_local! {
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Install the capturing hook, chained in front of the existing one.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let trace = truncate(Backtrace::force_capture().to_string());
            LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Trace of the most recent panic on this thread, if one was captured.
pub(crate) fn take() -> Option<String> {
    LAST_TRACE.with(|slot| slot.borrow_mut().take())
}

pub(crate) fn message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn truncate(mut trace: String) -> String {
    if trace.len() > MAX_TRACE_BYTES {
        let mut cut = MAX_TRACE_BYTES;
        while !trace.is_char_boundary(cut) {
            cut -= 1;
        }
        trace.truncate(cut);
        trace.push_str("\n<truncated>");
    }
    trace
}
