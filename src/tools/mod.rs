pub mod base;
pub mod gobuster;
pub mod hydra;
pub mod masscan;
pub mod nmap;
pub mod registry;
pub mod sqlmap;

pub use base::{
    ErrorKind, ExecutionLimits, Rejection, ToolDescriptor, ToolInput, ToolOutput, ToolProfile,
};
pub use registry::{Registry, ToolEntry};
