pub mod analysis_repository;
pub mod progress_repository;
pub mod settings_repository;
