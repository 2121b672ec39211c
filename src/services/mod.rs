pub mod orders;
pub mod procurement;
pub mod shipments;
