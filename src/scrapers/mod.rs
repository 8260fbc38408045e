pub mod assembler;
pub mod browser;
pub mod extractors;
pub mod readiness;
#[cfg(feature = "test-support")]
pub mod snapshot;
pub mod traits;
pub mod types;

pub use assembler::{ListingSource, RoomAssembler, SubPage};
pub use browser::ChromeSession;
pub use readiness::PageReadiness;
#[cfg(feature = "test-support")]
pub use snapshot::SnapshotPage;
pub use traits::{Node, RenderedPage};
pub use types::Selectors;
