pub mod analysis;
pub mod feedback;
pub mod learning_path;
pub mod progress;
pub mod recommendation;
pub mod settings;
