pub mod acceleration;
pub mod bindings;
