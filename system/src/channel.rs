pub mod membership;
pub mod transition;
