//! Engine runtime - discovery, process lifecycle, and pipe transport
//!
//! This crate provides the host-side plumbing for talking to an external
//! script engine over its standard streams:
//!
//! - **Descriptors**: Immutable configuration naming one kind of engine
//! - **Probe**: Resolving a descriptor's commands without starting anything
//! - **Transport**: Writing framed requests and reading response lines
//! - **Process**: One spawned engine and its streams
//! - **Manager**: Spawn-or-attach of shared processes, per-context spawns
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   jsbridge   │  Contexts, runtimes, selection
//! └──────┬───────┘
//!        │ Launch / ProcessManager
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Manager│  │  Shared slot, spawn failures
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │Process │  │  Child, stderr drain, evaluate
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Line / chunked framing
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod descriptor;
pub mod error;
pub mod manager;
pub mod probe;
pub mod process;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use descriptor::{DEFAULT_LINE_SAFE_FRAME_SIZE, DEFAULT_SYNTAX_ERROR_MARKER, DescriptorBuilder, RuntimeDescriptor};
pub use error::{Error, Result};
pub use jsbridge_protocol::ContextId;
pub use manager::{CommandLauncher, Launch, ProcessHandle, ProcessManager, SharedProcess};
pub use probe::{Locate, PathLocator, ResolvedCommand, resolve};
pub use process::{Lifeline, Process};
pub use transport::LineTransport;
