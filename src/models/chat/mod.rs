pub mod entities;
pub mod frames;
pub mod requests;
pub mod responses;
