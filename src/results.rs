mod result_set;
mod row;

pub use result_set::{Field, QueryResult};
pub use row::ResultRow;
