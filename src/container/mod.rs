//! The managed container
//!
//! - [`ContainerSpec`] describes the container to create
//! - [`inspect`] reads an existing container's settings back from the runtime
//! - [`ContainerManager`] runs the lifecycle operations

pub mod inspect;
mod manager;
mod spec;

pub use inspect::{ContainerDetails, ImageDetails};
pub use manager::{ContainerManager, RunOutcome, UpdateOutcome};
pub use spec::ContainerSpec;
