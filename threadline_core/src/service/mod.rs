pub mod authors;
pub mod channels;
pub mod reactions;
pub mod threads;
pub mod views;
