pub mod ballot;
pub mod candidate;
pub mod id;
pub mod role;
pub mod token;
pub mod voter;
