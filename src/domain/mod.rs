//! Domain layer: loan and installment entities and the persistence port.

pub mod loan;
pub mod ports;
