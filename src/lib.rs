pub mod binding;
pub mod chain;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod submit;
pub mod sync;
pub mod wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{
    FaucetError,
    FaucetResult,
};
