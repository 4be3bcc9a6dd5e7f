pub mod api_key;
pub mod config_store;
pub mod defaults;
pub mod fs_util;
pub mod llm;
pub mod memory_store;
