//! Test support utilities for the solver workspace.
//!
//! Provides prebuilt sessions for the classic assignment problems the
//! engine is exercised with (N-Queens boards, employee shift rosters),
//! record-building helpers, and assertion helpers shared across crates.
//!
//! # Example Usage
//!
//! ```no_run
//! use testsupport::prelude::*;
//!
//! let mut s = queens_session(8);
//! let result = s.solve_with(fast_config(10)).unwrap();
//! assert_feasible(&result);
//! ```

pub mod assertions;
pub mod fixtures;

use tracing_subscriber::EnvFilter;

/// Route solver tracing to the test output when `RUST_LOG` asks for it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Convenient re-exports for common testing patterns.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::fixtures::*;
    pub use crate::init_tracing;
}
