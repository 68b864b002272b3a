pub mod domain;
pub mod series;
