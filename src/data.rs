pub mod column;
pub mod episode;
pub mod features;
pub mod series;
