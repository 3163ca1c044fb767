pub mod saga;
pub mod workflow;
