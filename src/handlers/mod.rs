pub mod buffer;
pub mod extract;
pub mod health;
pub mod task;

pub use buffer::get_mesh_buffer;
pub use extract::extract_mesh;
pub use health::hello;
pub use task::get_task;
