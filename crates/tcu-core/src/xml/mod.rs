//! XML envelope codec for the TCU API
//!
//! Requests are wrapped in the provider's envelope:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Request>
//!   <UsernameToken>
//!     <Username>...</Username>
//!     <SessionToken>...</SessionToken>
//!   </UsernameToken>
//!   <RequestParameters>
//!     <f4indexno>S0123456789</f4indexno>
//!   </RequestParameters>
//! </Request>
//! ```
//!
//! Responses are decoded into a generic [`Node`] tree; interpreting it against
//! a fixed schema is left to the caller.

pub mod decode;
pub mod encode;
pub mod node;

pub use decode::decode_response;
pub use encode::{encode_request, ParamBlock, ParamBlocks, ParamValue};
pub use node::{Node, NodeError};
