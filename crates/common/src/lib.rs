pub mod cameras;
pub mod streams;
pub mod validation;
