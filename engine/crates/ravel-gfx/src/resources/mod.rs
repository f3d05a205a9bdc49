pub mod handles;
pub mod image;
