//! Documentation synthesis — pure transforms from finalized endpoint
//! records to an OpenAPI 3.0 document and a Markdown report.

pub mod cookie;
pub mod markdown;
pub mod openapi;

pub use cookie::{parse_cookie_header, Cookie};
pub use markdown::generate_markdown;
pub use openapi::generate_openapi;
