//! Period closing
//!
//! A manager closes a month once its books are final. From then on no report,
//! cost, harvest, transport or taksasi record dated inside that month may be
//! created, changed or removed until the period is reopened.

pub mod gate;
pub mod period;
pub mod registry;

pub use gate::{Mutation, MutationGate};
pub use period::{ClosePeriodRequest, ClosedMonth, ClosingPeriod, NewClosingPeriod, PeriodStatus};
pub use registry::{ClosingRegistry, MemoryClosingRegistry, MongoClosingRegistry};
