//! Core types shared by every component
//!
//! # Modules
//!
//! - `error` - [`RenderError`] taxonomy, [`BoxError`] for collaborator failures and
//!   [`ErrorContext`]/[`user_friendly_error`] for CLI presentation
//! - `context` - [`RenderContext`], cooperative cancellation with optional deadline
//! - `object` - [`Object`], the structured manifest type produced by rendering
//!
//! # Error Handling Pattern
//!
//! ```rust
//! use chart_render::core::{RenderContext, RenderError};
//!
//! let ctx = RenderContext::new();
//! ctx.cancel();
//!
//! let err = ctx.check("before render").unwrap_err();
//! assert!(err.is_cancelled());
//! assert!(matches!(err, RenderError::Cancelled { .. }));
//! ```

pub mod context;
pub mod error;
pub mod object;

pub use context::RenderContext;
pub use error::{BoxError, CancelCause, ErrorContext, RenderError, Result, user_friendly_error};
pub use object::Object;
