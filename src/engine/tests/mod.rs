mod capacity;
mod common;
mod lifecycle;
