pub mod publish;
pub mod sheets;
pub mod workflow;
