//! Data models
//!
//! Plain data structures shared by the repositories, services and pages:
//! - Database entities (Topic, Redactor, Newspaper, Session)
//! - Inputs for create/update operations
//! - Pagination types

mod newspaper;
mod pagination;
mod redactor;
mod session;
mod topic;

pub use newspaper::{Newspaper, NewspaperDetail, NewspaperInput, NewspaperWithTopic, TITLE_MAX_LENGTH};
pub use pagination::{InvalidPage, ListParams, PageInfo, PageRequest, PagedResult, MAX_PER_PAGE};
pub use redactor::{
    CreateRedactorInput, Redactor, RedactorDetail, UpdateRedactorInput, NAME_MAX_LENGTH,
    USERNAME_MAX_LENGTH,
};
pub use session::Session;
pub use topic::{Topic, TopicInput, TOPIC_NAME_MAX_LENGTH};
