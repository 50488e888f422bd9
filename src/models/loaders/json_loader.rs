use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 表单 JSON 文件
#[derive(Debug, Clone)]
pub struct FormFile {
    pub path: PathBuf,
    pub content: String,
}

/// 读取单个表单 JSON 文件
///
/// 只检查是否是合法 JSON，表单结构由 `SchemaTranslator` 负责
pub async fn load_form_json(json_file_path: &Path) -> Result<FormFile> {
    let content = fs::read_to_string(json_file_path)
        .await
        .with_context(|| format!("无法读取表单文件: {}", json_file_path.display()))?;

    serde_json::from_str::<serde_json::Value>(&content)
        .with_context(|| format!("无法解析表单文件: {}", json_file_path.display()))?;

    Ok(FormFile {
        path: json_file_path.to_path_buf(),
        content,
    })
}

/// 从文件夹中加载所有表单 JSON 文件
pub async fn load_all_form_files(folder_path: &str) -> Result<Vec<FormFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut forms = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            tracing::info!(
                "正在加载: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_form_json(&path).await {
                Ok(form) => forms.push(form),
                Err(e) => {
                    tracing::warn!("加载文件失败 {}: {}", path.display(), e);
                }
            }
        }
    }

    forms.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(forms)
}
