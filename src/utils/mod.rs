pub mod digest;
pub mod logger;
