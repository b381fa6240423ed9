use crate::error::{AppError, AppResult};
use std::path::Path;
use tokio::fs;

/// 已读入但尚未暂存的图片文件
///
/// 图片只有在绑定到某个块时才会进入暂存图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFigure {
    pub filename: String,
    pub mimetype: Option<String>,
    pub contents: Vec<u8>,
}

impl PendingFigure {
    pub fn new(filename: impl Into<String>, contents: Vec<u8>) -> Self {
        let filename = filename.into();
        let mimetype = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            filename,
            mimetype,
            contents,
        }
    }
}

/// 列出目录下的文件名（不递归，不含子目录）
pub async fn list_directory(directory: &Path) -> AppResult<Vec<String>> {
    let unreadable = |e| AppError::directory_unreadable(directory.display().to_string(), e);

    let mut filenames = Vec::new();
    let mut entries = fs::read_dir(directory).await.map_err(unreadable)?;

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let file_type = entry.file_type().await.map_err(unreadable)?;
        if !file_type.is_file() {
            continue;
        }
        filenames.push(entry.file_name().to_string_lossy().to_string());
    }

    Ok(filenames)
}

/// 读取文本档案，UTF-8 解码失败时按 Windows-1252 重新解码
pub async fn read_archive_text(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    Ok(decode_archive_text(bytes))
}

pub fn decode_archive_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            tracing::debug!("UTF-8 解码失败，改用 Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// 读取一张图片
pub async fn load_figure(directory: &Path, filename: &str) -> AppResult<PendingFigure> {
    let path = directory.join(filename);
    let contents = fs::read(&path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    tracing::debug!("读取图片 {} ({} 字节)", filename, contents.len());
    Ok(PendingFigure::new(filename, contents))
}
