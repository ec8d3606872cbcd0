//! The side-effecting reactions to the takedown event stream.

mod delete;
mod fetch;
mod upload;

pub use delete::DeletePipeline;
pub use fetch::FetchPipeline;
pub use upload::UploadPipeline;
