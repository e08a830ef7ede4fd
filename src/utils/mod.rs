pub mod components;
pub mod embed;
