// src/view/mod.rs
pub mod controller;

pub use controller::{DeepDive, LoadingProgress, View, ViewController, ViewServices};
