pub mod customer;
pub mod interaction;
pub mod item;
pub mod persona;
