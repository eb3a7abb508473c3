pub mod carry;
pub mod span;
pub mod token;
