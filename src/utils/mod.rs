pub mod parser;
pub mod parser_registry;
pub mod voxel_grid;
