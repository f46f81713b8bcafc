//! Live preview core: chat stream → code blocks → composed document → sandbox.
//!
//! ARCHITECTURE
//! ============
//! An assistant reply arrives as a server-sent event stream. The chat layer
//! aggregates it into messages, re-extracting fenced code blocks after every
//! fragment. The composer turns the previewable blocks of a reply into one
//! self-contained document, which the execution channel renders inside an
//! isolated frame while collecting console output. A synthetic test run can
//! walk the same document through a fixed catalog of validation steps.
//!
//! DESIGN
//! ======
//! Every outward boundary (HTTP transport, persistent storage, the isolated
//! frame, step execution) is a trait so the logic can be driven in tests
//! without a browser or network. No error escapes the session boundaries:
//! each one degrades to a user-visible value instead.

pub mod blocks;
pub mod chat;
pub mod compose;
pub mod error;
pub mod sandbox;
pub mod session;
pub mod testrun;

pub use blocks::{CodeBlock, extract_code_blocks, strip_code_blocks};
pub use chat::ChatSession;
pub use compose::{ComposedDocument, compose, compose_or_raw};
pub use error::ErrorCode;
pub use sandbox::ExecutionChannel;
pub use session::PreviewSession;
pub use testrun::TestRunner;
