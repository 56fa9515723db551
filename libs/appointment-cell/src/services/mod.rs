pub mod booking;
pub mod conflict;
pub mod consistency;
pub mod lifecycle;
pub mod validation;
