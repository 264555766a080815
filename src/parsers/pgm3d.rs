use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::bufread::GzDecoder;
use log::{debug, warn};

use crate::error::{MesherError, MesherResult};
use crate::utils::parser::{Volume, VolumeHeader, VolumeParser};
use crate::utils::voxel_grid::VoxelGrid;

/// gzip 文件魔数
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 预分配上限，避免错误的文件头一次申请过多内存
const MAX_PREALLOCATED_VOXELS: usize = 1 << 24;

/// PGM3D 文件格式解析器
///
/// 文件结构:
/// ```text
/// PGM3D            <- 格式标识（不校验）
/// 64 64 64         <- size_x size_y size_z
/// 255              <- 最大灰度
/// 0 0 12 ...       <- 体素值，空白/换行分隔
/// ```
pub struct Pgm3dParser;

impl Pgm3dParser {
    pub fn new() -> Self {
        Pgm3dParser
    }
}

impl Default for Pgm3dParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeParser for Pgm3dParser {
    fn supported_extensions(&self) -> Vec<&'static str> {
        vec!["pgm3d"]
    }

    fn name(&self) -> &'static str {
        "PGM3D Parser"
    }

    fn parse_from_file(&self, file_path: &Path) -> MesherResult<Volume> {
        let reader = open_volume(file_path)?;
        parse_volume(reader, file_path)
    }

    fn get_header_from_file(&self, file_path: &Path) -> MesherResult<VolumeHeader> {
        let mut reader = open_volume(file_path)?;
        let mut lines = LineReader::new(&mut reader, file_path);
        read_header(&mut lines)
    }
}

/// 打开文件，gzip 压缩的文件自动解压
fn open_volume(file_path: &Path) -> MesherResult<Box<dyn BufRead>> {
    let file = File::open(file_path).map_err(|e| MesherError::io(file_path, e))?;
    let mut reader = BufReader::new(file);

    let is_gzip = reader
        .fill_buf()
        .map_err(|e| MesherError::io(file_path, e))?
        .starts_with(&GZIP_MAGIC);
    if is_gzip {
        debug!("{} 为 gzip 压缩文件", file_path.display());
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// 从任意 BufRead 解析 PGM3D 数据，file_path 只用于错误信息
pub fn parse_volume<R: BufRead>(mut reader: R, file_path: &Path) -> MesherResult<Volume> {
    let mut lines = LineReader::new(&mut reader, file_path);
    let header = read_header(&mut lines)?;

    let [nx, ny, nz] = header.shape;
    let expected = nx
        .checked_mul(ny)
        .and_then(|n| n.checked_mul(nz))
        .ok_or_else(|| lines.format_error(2, "体素总数溢出"))?;

    // 从第 4 行开始解析数据，读满 expected 个值后忽略剩余内容
    let mut data = Vec::with_capacity(expected.min(MAX_PREALLOCATED_VOXELS));
    while data.len() < expected {
        let Some((line_no, line)) = lines.next_line()? else {
            break;
        };
        for token in line.split_whitespace() {
            if data.len() == expected {
                break;
            }
            let value = token.parse::<u32>().map_err(|e| {
                lines.format_error(line_no, format!("无法解析体素值 '{}': {}", token, e))
            })?;
            data.push(value);
        }
    }

    if data.len() < expected {
        return Err(MesherError::TruncatedData {
            path: file_path.to_path_buf(),
            expected,
            found: data.len(),
        });
    }

    let grid = VoxelGrid::new(header.shape, data)?;
    if let Some(observed) = grid.max_value().filter(|&v| v > header.max_intensity) {
        warn!(
            "{}: 体素最大值 {} 超过文件头声明的最大灰度 {}",
            file_path.display(),
            observed,
            header.max_intensity
        );
    }

    Ok(Volume {
        grid,
        max_intensity: header.max_intensity,
    })
}

/// 读取固定的 3 行文件头
fn read_header<R: BufRead>(lines: &mut LineReader<'_, R>) -> MesherResult<VolumeHeader> {
    // 第 1 行: 格式标识，只要求存在
    lines.expect_line(1, "缺少格式标识行")?;

    // 第 2 行: "64 64 64"
    let size_line = lines.expect_line(2, "缺少尺寸行")?;
    let shape: Vec<usize> = size_line
        .split_whitespace()
        .map(|s| s.parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| lines.format_error(2, format!("无法解析尺寸 '{}': {}", size_line.trim(), e)))?;

    if shape.len() != 3 {
        return Err(lines.format_error(
            2,
            format!("尺寸行应该包含3个维度，但得到{}个", shape.len()),
        ));
    }

    // 第 3 行: 最大灰度
    let max_line = lines.expect_line(3, "缺少最大灰度行")?;
    let max_intensity = max_line.trim().parse::<u32>().map_err(|e| {
        lines.format_error(3, format!("无法解析最大灰度 '{}': {}", max_line.trim(), e))
    })?;

    Ok(VolumeHeader {
        shape: [shape[0], shape[1], shape[2]],
        max_intensity,
    })
}

/// 逐行读取并记录行号，不把整个文件读进内存
struct LineReader<'a, R> {
    reader: &'a mut R,
    path: &'a Path,
    line_no: usize,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R, path: &'a Path) -> Self {
        Self {
            reader,
            path,
            line_no: 0,
        }
    }

    /// 返回 (行号, 内容)，文件结束时返回 None
    fn next_line(&mut self) -> MesherResult<Option<(usize, String)>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| MesherError::io(self.path, e))?;
        if read == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some((self.line_no, line)))
    }

    fn expect_line(&mut self, line_no: usize, missing: &str) -> MesherResult<String> {
        match self.next_line()? {
            Some((_, line)) => Ok(line),
            None => Err(self.format_error(line_no, missing)),
        }
    }

    fn format_error(&self, line: usize, message: impl Into<String>) -> MesherError {
        MesherError::Format {
            path: self.path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    fn parse(text: &str) -> MesherResult<Volume> {
        parse_volume(Cursor::new(text.as_bytes()), Path::new("test.pgm3d"))
    }

    #[test]
    fn parses_header_and_values() {
        let volume = parse("PGM3D\n2 1 3\n255\n0 1 2\n3 4 255\n").unwrap();
        assert_eq!(volume.grid.shape, [2, 1, 3]);
        assert_eq!(volume.max_intensity, 255);
        assert_eq!(volume.grid.len(), 6);
        assert_eq!(volume.grid.get(1, 0, 2), 255);
    }

    #[test]
    fn values_may_span_lines_arbitrarily() {
        let volume = parse("PGM3D\n2 2 2\n9\n1\n2 3\n\n4 5 6 7\n8").unwrap();
        assert_eq!(volume.grid.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn trailing_values_are_ignored() {
        let volume = parse("PGM3D\n1 1 2\n9\n1 2 3 4\nnot-a-number\n").unwrap();
        assert_eq!(volume.grid.data, vec![1, 2]);
    }

    #[test]
    fn one_missing_value_is_truncation() {
        let err = parse("PGM3D\n2 2 2\n9\n1 2 3 4 5 6 7\n").unwrap_err();
        assert!(matches!(
            err,
            MesherError::TruncatedData {
                expected: 8,
                found: 7,
                ..
            }
        ));
    }

    #[test]
    fn malformed_size_line() {
        let err = parse("PGM3D\n2 x 2\n9\n").unwrap_err();
        assert!(matches!(err, MesherError::Format { line: 2, .. }));

        let err = parse("PGM3D\n2 2\n9\n1 2 3 4\n").unwrap_err();
        assert!(matches!(err, MesherError::Format { line: 2, .. }));

        let err = parse("PGM3D\n2 2 2 2\n9\n").unwrap_err();
        assert!(matches!(err, MesherError::Format { line: 2, .. }));
    }

    #[test]
    fn malformed_max_line() {
        let err = parse("PGM3D\n1 1 1\nmax\n0\n").unwrap_err();
        assert!(matches!(err, MesherError::Format { line: 3, .. }));
    }

    #[test]
    fn missing_header_lines() {
        let err = parse("PGM3D\n").unwrap_err();
        assert!(matches!(err, MesherError::Format { line: 2, .. }));

        let err = parse("").unwrap_err();
        assert!(matches!(err, MesherError::Format { line: 1, .. }));
    }

    #[test]
    fn bad_voxel_token_reports_its_line() {
        let err = parse("PGM3D\n1 1 3\n9\n1\n2 -3\n").unwrap_err();
        assert!(matches!(err, MesherError::Format { line: 5, .. }));
    }

    #[test]
    fn zero_dimension_gives_empty_grid() {
        let volume = parse("PGM3D\n0 4 4\n255\n").unwrap();
        assert!(volume.grid.is_empty());
    }

    #[test]
    fn reads_plain_and_gzip_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = "PGM3D\n1 2 2\n7\n0 7 7 0\n";

        let plain = dir.path().join("a.pgm3d");
        std::fs::write(&plain, text).unwrap();

        let gz = dir.path().join("a.pgm3d.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        std::fs::write(&gz, encoder.finish().unwrap()).unwrap();

        let parser = Pgm3dParser::new();
        let a = parser.parse_from_file(&plain).unwrap();
        let b = parser.parse_from_file(&gz).unwrap();
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.max_intensity, b.max_intensity);

        let header = parser.get_header_from_file(&gz).unwrap();
        assert_eq!(header.shape, [1, 2, 2]);
        assert_eq!(header.max_intensity, 7);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Pgm3dParser::new()
            .parse_from_file(Path::new("/nonexistent/scan.pgm3d"))
            .unwrap_err();
        assert!(matches!(err, MesherError::Io { .. }));
    }
}
