pub mod card;
pub mod config;
pub mod deck;
pub mod goals;
pub mod review;
pub mod word;
