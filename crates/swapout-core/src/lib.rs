//! swapout Core Library
//!
//! Pushes a process's resident memory into swap by parking it in a temporary
//! cgroup with a low memory ceiling, then lifts the ceiling again.
//! Also provides the swapped-process scanner behind `swapmon`.

pub mod cgroups;
pub mod config;
pub mod controller;
pub mod error;
pub mod sampler;
pub mod scanner;

pub use cgroups::{CgroupVersion, ControlGroupBackend, ControlGroupContext};
pub use config::{RunConfiguration, Settings};
pub use controller::{RunReport, RunState, StopReason, SwapoutController};
pub use error::{Error, Result};
pub use sampler::{MemorySampler, ProcSampler, ProcessMemorySample};
pub use scanner::{ProcessScanner, SwappedProcess, SystemSwap};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
