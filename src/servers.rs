/// Contains ready-made [Servers][crate::Server] which can be used in tests.
#[cfg(feature = "mock")]
pub mod mock;
