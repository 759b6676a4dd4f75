pub mod assignment;
pub mod completion;
pub mod matching;
pub mod rating;
pub mod reassignment;
