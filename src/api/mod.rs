pub mod pagination;
pub mod response;

pub use pagination::{ListParams, Paginated};
pub use response::{Created, DataResponse, NoContent};
