pub mod header;
pub mod specs;
pub mod frames;
pub mod tags;
