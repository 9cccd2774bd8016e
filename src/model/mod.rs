pub mod query;
pub mod work_item;
