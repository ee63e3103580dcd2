pub mod provider;
pub mod restful;
