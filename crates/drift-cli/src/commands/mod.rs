pub mod characterize;
pub mod recommend;
