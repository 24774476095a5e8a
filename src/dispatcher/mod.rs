//! # Dispatcher Module
//!
//! The transport-neutral request pipeline. A [`ServiceRequest`] goes in, a
//! [`HandlerResponse`] comes out; nothing here knows about sockets.
//!
//! ## Request Flow
//!
//! Each request moves through a fixed sequence of stages and stops at the
//! first failure:
//!
//! 1. **RouteLookup** - the operation name is the last non-empty path
//!    segment; an unknown name is a 404
//! 2. **VerbCheck** - `GET` for query operations, `POST`/`PUT`/`PATCH` for
//!    body operations; anything else is a 405 with an `Allow` header
//! 3. **Bind** - the parameter value is populated from the query string or
//!    the JSON body; a query coercion failure is a 400
//! 4. **Validate** - the [`Validator`](crate::validator::Validator) checks
//!    declared constraints; violations are a 400 listing the fields
//! 5. **Invoke** - the operation runs; an `Err` is a 400 carrying its
//!    message
//! 6. **Encode** - the [`Envelope`] is serialised as JSON
//!
//! A panic anywhere in stages 3 to 6 is a generic 500.
//!
//! Every request produces exactly one response and the process never
//! crashes on a bad request.

mod core;
mod envelope;

pub use core::{Dispatcher, HandlerResponse, HeaderVec, ParamVec, ServiceRequest, MAX_INLINE_HEADERS};
pub use envelope::{Envelope, INVALID_REQUEST};
