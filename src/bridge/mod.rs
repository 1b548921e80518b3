//! # Bridge Core
//!
//! Everything between the host adapters and the MQTT gateway.
//!
//! ```text
//! bridge/
//! ├── state.rs      - StatePublisher: query, format, publish
//! ├── router.rs     - Command table, payload parsing, command worker
//! └── scheduler.rs  - Music and battery refresh tasks
//! ```
//!
//! Outbound: `Scheduler` tick → `StatePublisher` → collaborator → gateway.
//! Inbound: gateway event loop → `CommandRouter` handler → command worker →
//! `MediaController` → `StatePublisher::publish_music`.

pub mod router;
pub mod scheduler;
pub mod state;

pub use router::{Command, CommandError, CommandQueue, CommandRouter};
pub use scheduler::{ScheduledTask, Scheduler, SchedulerError};
pub use state::{QueryTimeouts, StatePublisher};
