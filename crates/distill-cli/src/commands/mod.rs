pub mod rank;
pub mod serve;
pub mod status;
pub mod summarize;
