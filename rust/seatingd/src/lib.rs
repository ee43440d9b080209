//! Seating-chart engine for small classrooms plus the JSON-line sidecar
//! that serves it to a desktop UI.

pub mod backup;
pub mod batch;
pub mod classroom;
pub mod ipc;
pub mod layout;
pub mod legacy;
pub mod model;
pub mod normalize;
pub mod rotation;
pub mod store;
