use std::path::Path;

use crate::utils::parser::VolumeParser;

/// gzip 压缩文件的后缀，匹配解析器时会先剥掉
const GZIP_EXTENSION: &str = "gz";

/// 解析器注册表
/// 管理所有可用的体数据解析器，并根据文件扩展名匹配对应的解析器
pub struct ParserRegistry {
    parsers: Vec<Box<dyn VolumeParser>>,
}

impl ParserRegistry {
    /// 创建新的解析器注册表，自动注册所有可用的解析器
    pub fn new() -> Self {
        let parsers = crate::parsers::get_all_parsers();
        Self { parsers }
    }

    /// 根据文件扩展名查找匹配的解析器
    /// extension: 文件扩展名（不含点号），例如 "pgm3d"
    pub fn find_parser(&self, extension: &str) -> Option<&dyn VolumeParser> {
        self.parsers
            .iter()
            .find(|parser| parser.supports(extension))
            .map(|p| p.as_ref())
    }

    /// 根据文件路径查找匹配的解析器
    /// 自动提取文件扩展名，"scan.pgm3d.gz" 按 "pgm3d" 匹配
    pub fn find_parser_for_file(&self, file_path: &Path) -> Option<(&dyn VolumeParser, String)> {
        let extension = volume_extension(file_path)?;

        self.find_parser(&extension)
            .map(|parser| (parser, extension))
    }

    /// 获取所有支持的扩展名列表
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions = Vec::new();
        for parser in &self.parsers {
            extensions.extend(
                parser
                    .supported_extensions()
                    .iter()
                    .map(|s| s.to_lowercase()),
            );
        }
        extensions.sort();
        extensions.dedup();
        extensions
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 提取体数据文件的扩展名（小写），跳过外层的 .gz
fn volume_extension(file_path: &Path) -> Option<String> {
    let extension = file_path.extension()?.to_str()?.to_lowercase();
    if extension != GZIP_EXTENSION {
        return Some(extension);
    }

    let inner = Path::new(file_path.file_stem()?);
    Some(inner.extension()?.to_str()?.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_pgm3d_parser() {
        let registry = ParserRegistry::new();
        let (parser, ext) = registry
            .find_parser_for_file(Path::new("data/shepplogan.pgm3d"))
            .unwrap();
        assert_eq!(ext, "pgm3d");
        assert_eq!(parser.name(), "PGM3D Parser");

        assert!(registry.find_parser_for_file(Path::new("SCAN.PGM3D")).is_some());
    }

    #[test]
    fn gzip_suffix_is_skipped() {
        let registry = ParserRegistry::new();
        let (_, ext) = registry
            .find_parser_for_file(Path::new("scan.pgm3d.gz"))
            .unwrap();
        assert_eq!(ext, "pgm3d");
    }

    #[test]
    fn unknown_extensions() {
        let registry = ParserRegistry::new();
        assert!(registry.find_parser_for_file(Path::new("model.obj")).is_none());
        assert!(registry.find_parser_for_file(Path::new("archive.gz")).is_none());
        assert!(registry.find_parser_for_file(Path::new("noext")).is_none());
        assert_eq!(registry.supported_extensions(), vec!["pgm3d".to_string()]);
    }
}
