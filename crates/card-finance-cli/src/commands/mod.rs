pub mod budget;
pub mod emi;
pub mod insights;
pub mod plans;
pub mod spending;
