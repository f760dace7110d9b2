pub mod inline_detection_executor;
pub mod interval_ticker;
pub mod threaded_detection_executor;
