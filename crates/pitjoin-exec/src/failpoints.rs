//! Failure injection hooks (feature: `failpoints`).
//!
//! `fail_point!(name)` expands to nothing unless the feature is enabled.
//! With it, a point armed through [`arm`] makes the enclosing function return
//! a backend error once, so retry paths can be tested deterministically.

#[cfg(feature = "failpoints")]
mod armed {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    static ARMED: Lazy<Mutex<BTreeMap<String, usize>>> = Lazy::new(Mutex::default);

    /// Make the next `times` hits of `name` fail.
    pub fn arm(name: &str, times: usize) {
        if let Ok(mut armed) = ARMED.lock() {
            armed.insert(name.to_string(), times);
        }
    }

    pub fn disarm_all() {
        if let Ok(mut armed) = ARMED.lock() {
            armed.clear();
        }
    }

    /// Consume one armed hit of `name`, if any.
    pub fn take(name: &str) -> bool {
        let Ok(mut armed) = ARMED.lock() else {
            return false;
        };
        match armed.get_mut(name) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

#[cfg(feature = "failpoints")]
pub use armed::{arm, disarm_all, take};

#[cfg(feature = "failpoints")]
#[macro_export]
macro_rules! fail_point {
    ($name:expr) => {{
        if $crate::failpoints::take($name) {
            return Err(pitjoin_core::Error::Backend(format!(
                "failpoint triggered: {}",
                $name
            ))
            .into());
        }
    }};
}

#[cfg(not(feature = "failpoints"))]
#[macro_export]
macro_rules! fail_point {
    ($name:expr) => {
        // no-op
        let _ = $name;
    };
}
