//! Assertion macros shared by integration tests.

/// Await the next connection event, panicking with the call site if the
/// stream ends or nothing arrives within a second.
#[macro_export]
macro_rules! next_event {
    ($events:expr) => {{
        ::tokio::time::timeout(::std::time::Duration::from_secs(1), $events.recv())
            .await
            .expect(concat!("no event in time at ", file!(), ":", line!()))
            .expect(concat!("event stream ended at ", file!(), ":", line!()))
    }};
}

/// Skip events until one matches `$pattern`, returning the bound value of
/// `$out`.
#[macro_export]
macro_rules! expect_event {
    ($events:expr, $pattern:pat => $out:expr) => {{
        loop {
            match $crate::next_event!($events) {
                $pattern => break $out,
                _ => continue,
            }
        }
    }};
}

pub use crate::{expect_event, next_event};
