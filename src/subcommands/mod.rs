pub mod construct;
pub mod peel;
