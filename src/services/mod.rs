pub mod analysis_service;
pub mod feedback_analyzer;
pub mod history_store;
pub mod learning_path;
pub mod model_backend;
pub mod progress_tracker;
pub mod recommendations;
pub mod scoring;
pub mod settings_service;
