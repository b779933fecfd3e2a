use crate::models::section::SectionRegistry;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载章节注册表
pub async fn load_registry(toml_file_path: &Path) -> Result<SectionRegistry> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let registry = SectionRegistry::from_toml_str(&content)
        .with_context(|| format!("无法解析章节注册表: {}", toml_file_path.display()))?;

    tracing::info!(
        "成功加载章节注册表: {} 个章节 ({})",
        registry.len(),
        toml_file_path.display()
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_registry_from_file() {
        let path = std::env::temp_dir().join(format!("registry-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[[section]]\nname = \"Budget\"\nsubstrings = [\"Budget\"]\n",
        )
        .await
        .unwrap();

        let registry = load_registry(&path).await.unwrap();
        assert!(registry.contains("Budget"));

        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_load_registry_missing_file() {
        let result = load_registry(Path::new("/definitely/not/here.toml")).await;
        assert!(result.is_err());
    }
}
