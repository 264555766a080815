mod pgm3d;

pub use pgm3d::{Pgm3dParser, parse_volume};

/// 获取所有可用的解析器
pub fn get_all_parsers() -> Vec<Box<dyn crate::utils::parser::VolumeParser>> {
    vec![Box::new(Pgm3dParser::new())]
}
