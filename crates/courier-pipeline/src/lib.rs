//! Courier upload pipeline
//!
//! Classification of inbound chat content, chunk planning, and the sequential
//! append driver that writes chunks to a destination with bounded retries.
//! Transport clients plug in through the [`FileFetcher`] and [`Destination`]
//! traits.

pub mod classifier;
pub mod destination;
pub mod driver;
pub mod gateway;
pub mod locks;
pub mod planner;
pub mod retry;
pub mod source;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use classifier::{AttachmentMeta, ClassificationError, ContentClassifier, InboundEvent};
pub use destination::{ChunkContent, ChunkUpload, Destination, DestinationError};
pub use driver::{PayloadFormat, UploadDriver, UploadRequest};
pub use gateway::{DirectPayload, DirectUploadGateway};
pub use locks::{ItemGuard, ItemLocks};
pub use planner::{plan, plan_text, Chunk, ChunkLimit, ChunkPlan, PlanError, MIN_TEXT_CHUNK_LIMIT};
pub use retry::{retry_transient, RetryFailure, RetryPolicy};
pub use source::{ByteSource, FetchError, FileFetcher, InboundItem};
