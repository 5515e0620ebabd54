//! Utilities for exercising the `wsframe` engine in tests.
//!
//! Raw frame builders produce wire bytes without going through the crate's
//! own encoder, [`RecordingHandler`] captures every callback a
//! [`Receiver`](wsframe::Receiver) makes, and [`feed_chunked`] replays a
//! byte stream in arbitrary slices to mimic TCP segmentation.
//!
//! ```rust
//! use wsframe::{Receiver, ReceiverConfig};
//! use wsframe_testing::{Event, RecordingHandler, feed_chunked, masked_frame};
//!
//! # async fn example() {
//! let mut receiver = Receiver::new(RecordingHandler::default(), ReceiverConfig::default());
//! feed_chunked(&mut receiver, &masked_frame(0x81, b"hi"), 1).await;
//! assert_eq!(receiver.handler().events(), &[Event::Text("hi".into())]);
//! # }
//! ```

pub mod frames;
pub mod logging;
pub mod metrics;
pub mod recording;

pub use frames::{TEST_MASK_KEY, close_payload, feed_chunked, masked_frame, raw_frame, unmasked_frame};
pub use logging::{LoggerHandle, logger};
pub use metrics::{counter_value, debugging_recorder_setup};
pub use recording::{Event, RecordingHandler};
