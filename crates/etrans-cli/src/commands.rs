pub mod lj;
pub mod plan;
pub mod show;
