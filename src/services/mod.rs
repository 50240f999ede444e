//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories. They:
//! - Enforce uniqueness and reference rules
//! - Resolve pagination requests against collection sizes
//! - Own authentication and session handling

pub mod newspaper;
pub mod password;
pub mod redactor;
pub mod topic;

pub use newspaper::{NewspaperService, NewspaperServiceError};
pub use password::{hash_password, verify_password};
pub use redactor::{RedactorService, RedactorServiceError};
pub use topic::{TopicService, TopicServiceError};
