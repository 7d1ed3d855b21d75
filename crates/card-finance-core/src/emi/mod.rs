pub mod amortization;
pub mod offers;
pub mod plans;
pub mod prepayment;
