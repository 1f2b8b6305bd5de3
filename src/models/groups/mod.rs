pub mod entities;
pub mod registration;
pub mod requests;
pub mod responses;
