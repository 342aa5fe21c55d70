//! Test utilities for arena-based testing.
//!
//! Each test gets its own bounded arena, the way a host pipeline hands one
//! arena to each pass run.
