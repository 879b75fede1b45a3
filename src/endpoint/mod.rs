//! Endpoint configuration surface.

mod descriptor;
mod registry;

pub use descriptor::{EndpointConfig, EndpointDescriptor, EndpointDescriptorBuilder, PaginationPolicy};
pub use registry::{EndpointGroup, EndpointRegistry};
