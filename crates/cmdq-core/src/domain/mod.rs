//! Domain model (ids, handles, tags, lifecycle state).

pub mod handle;
pub mod ids;
pub mod state;

pub use handle::{CommandHandle, DEFAULT_PRIORITY, HandleView, Tags};
pub use ids::{HandleId, Id, IdMarker, ProcessorId};
pub use state::{ProcessorState, StopMode};
