//! Host-side simulation harness for the Pandos kernel: a mock hardware
//! façade plus scripted reproductions of the reference test programs'
//! kernel-visible behavior, used by both the binary runner and the
//! integration test suite.

pub mod mock_hal;
pub mod simulation;

pub use mock_hal::MockHal;
pub use simulation::Simulation;
