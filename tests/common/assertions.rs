//! Custom assertion macros and utilities
//!
//! Provides assertion macros with more descriptive failure output than a
//! bare `unwrap`.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a backend result failed with the given HTTP status
#[macro_export]
macro_rules! assert_status {
    ($result:expr, $status:expr) => {
        match $result {
            Ok(value) => panic!("Expected {}, got Ok: {:?}", $status, value),
            Err(e) => assert_eq!(e.status_code(), $status, "unexpected error: {:?}", e),
        }
    };
}
