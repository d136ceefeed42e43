pub mod preset_store;
pub mod request_queue;
pub mod sync;
pub mod widget;
