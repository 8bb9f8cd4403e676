pub mod allocation;
pub mod estimation;
pub mod risk;
