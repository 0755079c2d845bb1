//! Webhook payload parsing and signature verification.

pub mod events;
pub mod signature;

pub use events::parse_issue_comment;
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
};
