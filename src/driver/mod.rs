// src/driver/mod.rs

//! Client driver resolution.
//!
//! - [`layout`] describes where a driver lives and classifies a target.
//! - [`build`] runs the driver build ([`MakeBuilder`]) behind [`Builder`].
//! - [`loader`] loads the package through a scoped [`SearchPath`].
//! - [`resolver`] ties them together in [`DriverResolver`].

pub mod build;
pub mod layout;
pub mod loader;
pub mod resolver;

pub use build::{BuildFuture, Builder, MakeBuilder};
pub use layout::{classify, DriverLayout, DriverSource};
pub use loader::{load_driver, DriverHandle, DriverLocation, SearchPath, SearchPathGuard};
pub use resolver::DriverResolver;
