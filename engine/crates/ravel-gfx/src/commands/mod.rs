pub mod barrier;
pub mod encoder;
