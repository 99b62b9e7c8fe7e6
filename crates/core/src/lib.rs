pub mod catalog;
pub mod dump_history;
pub mod object_script;
pub mod query_service;
pub mod raw_response;
pub mod result_views;
pub mod session;
pub mod settings;
pub mod tab_numbers;
pub mod tabular;

