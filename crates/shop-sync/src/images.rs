//! 商品圖片處理
//!
//! 送出商品前，將每個圖片參照正規化為儲存路徑：
//! - 已是 `{bucket}/...` 的路徑保留
//! - 以公開儲存網址開頭的網址去掉前綴
//! - 其他 http(s) 網址原樣保留
//! - `data:` 內嵌圖片解碼後上傳，同一批次中相同內容只上傳一次

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use shop_core::{AdminConfig, AdminError, Result};
use tracing::{debug, info};
use uuid::Uuid;

use crate::blob::BlobStore;

/// 沒有品牌時使用的資料夾
const DEFAULT_FOLDER: &str = "unknown";

/// 內嵌圖片（`data:<mime>;base64,<payload>`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    /// 解析 data URL；不是 base64 圖片時回傳驗證錯誤
    pub fn parse(data_url: &str) -> Result<Self> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| AdminError::invalid_field("images", "Not a data URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AdminError::invalid_field("images", "Malformed data URL"))?;
        let content_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| AdminError::invalid_field("images", "Inline image must be base64"))?;
        if !content_type.starts_with("image/") {
            return Err(AdminError::invalid_field(
                "images",
                format!("Unsupported image type: {}", content_type),
            ));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| AdminError::invalid_field("images", format!("Invalid base64: {}", e)))?;

        Ok(Self {
            content_type: content_type.to_string(),
            bytes,
        })
    }

    /// 副檔名（jpeg 寫成 jpg）
    pub fn extension(&self) -> &str {
        let subtype = self
            .content_type
            .strip_prefix("image/")
            .unwrap_or("png");
        let subtype = subtype.split('+').next().unwrap_or(subtype);
        match subtype {
            "jpeg" => "jpg",
            "" => "png",
            other => other,
        }
    }
}

/// 品牌名稱轉為資料夾名稱
pub fn slugify_brand(brand: &str) -> String {
    let mut slug = String::with_capacity(brand.len());
    let mut dash = false;
    for c in brand.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        slug
    }
}

/// 圖片處理管線
pub struct ImagePipeline<'a, B: BlobStore> {
    blobs: &'a mut B,
    bucket: String,
    public_url: Option<String>,
}

impl<'a, B: BlobStore> ImagePipeline<'a, B> {
    pub fn new(blobs: &'a mut B, bucket: impl Into<String>) -> Self {
        Self {
            blobs,
            bucket: bucket.into(),
            public_url: None,
        }
    }

    /// 依配置創建（bucket 與公開網址）
    pub fn from_config(blobs: &'a mut B, config: &AdminConfig) -> Self {
        let mut pipeline = Self::new(blobs, config.image_bucket.clone());
        pipeline.public_url = config.public_storage_url.clone();
        pipeline
    }

    /// 建構器模式：設置公開儲存網址
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// 處理整批圖片參照
    ///
    /// 保持原本順序；空字串會被略過。任一上傳失敗則整批失敗。
    pub fn process(&mut self, images: &[String], brand: Option<&str>) -> Result<Vec<String>> {
        let folder = brand.map(slugify_brand).unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        let mut uploaded: HashMap<&str, String> = HashMap::new();
        let mut result = Vec::with_capacity(images.len());

        for image in images {
            let image = image.trim();
            if image.is_empty() {
                continue;
            }

            if image.starts_with("data:") {
                if let Some(path) = uploaded.get(image) {
                    debug!("重複的內嵌圖片，沿用 {}", path);
                    result.push(path.clone());
                    continue;
                }
                let path = self.upload_inline(image, &folder)?;
                uploaded.insert(image, path.clone());
                result.push(path);
            } else {
                result.push(self.normalize_reference(image));
            }
        }

        Ok(result)
    }

    /// 非內嵌的參照：去掉公開網址前綴，其餘保留
    pub fn normalize_reference(&self, image: &str) -> String {
        if let Some(base) = self.public_url.as_deref() {
            let base = base.trim_end_matches('/');
            if let Some(rest) = image.strip_prefix(base) {
                if rest.is_empty() || rest.starts_with('/') {
                    return rest.trim_start_matches('/').to_string();
                }
            }
        }
        image.to_string()
    }

    fn upload_inline(&mut self, data_url: &str, folder: &str) -> Result<String> {
        let image = InlineImage::parse(data_url)?;
        let suffix = Uuid::new_v4().simple().to_string();
        let path = format!(
            "{}/{}-{}.{}",
            folder,
            Utc::now().timestamp_millis(),
            &suffix[..10],
            image.extension()
        );

        let stored = self
            .blobs
            .upload(&self.bucket, &path, &image.bytes, &image.content_type)?;
        info!("上傳圖片 {} ({} bytes)", stored, image.bytes.len());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use rstest::rstest;

    // 1x1 PNG 的前幾個位元組即可
    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[rstest]
    #[case("Nike", "nike")]
    #[case("  New Balance ", "new-balance")]
    #[case("Dr. Martens!", "dr-martens")]
    #[case("???", "unknown")]
    fn test_slugify_brand(#[case] brand: &str, #[case] expected: &str) {
        assert_eq!(slugify_brand(brand), expected);
    }

    #[rstest]
    #[case("image/jpeg", "jpg")]
    #[case("image/png", "png")]
    #[case("image/svg+xml", "svg")]
    fn test_extension(#[case] content_type: &str, #[case] expected: &str) {
        let image = InlineImage {
            content_type: content_type.to_string(),
            bytes: vec![],
        };
        assert_eq!(image.extension(), expected);
    }

    #[test]
    fn test_parse_inline_image() {
        let image = InlineImage::parse(PNG).unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[rstest]
    #[case("data:text/plain;base64,aGk=")]
    #[case("data:image/png,raw")]
    #[case("data:image/png;base64,***")]
    fn test_parse_rejects(#[case] url: &str) {
        assert!(matches!(InlineImage::parse(url), Err(AdminError::Validation(_))));
    }

    #[test]
    fn test_process_mixed_references() {
        let mut blobs = MemoryBlobStore::new();
        let images = vec![
            "products-images/nike/old.jpg".to_string(),
            "https://cdn.example.com/storage/v1/object/public/products-images/nike/a.png".to_string(),
            "https://other.example.com/b.png".to_string(),
            PNG.to_string(),
            "  ".to_string(),
        ];

        let result = ImagePipeline::new(&mut blobs, "products-images")
            .with_public_url("https://cdn.example.com/storage/v1/object/public/")
            .process(&images, Some("Nike"))
            .unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(result[0], "products-images/nike/old.jpg");
        assert_eq!(result[1], "products-images/nike/a.png");
        assert_eq!(result[2], "https://other.example.com/b.png");
        assert!(result[3].starts_with("products-images/nike/"));
        assert!(result[3].ends_with(".png"));
        assert_eq!(blobs.len(), 1);
    }

    #[rstest]
    #[case("https://cdn.example.com/storage/v1/object/public/products-images/a.jpg", "products-images/a.jpg")]
    #[case("https://cdn.example.com/storage/v1/object/publicity/x.jpg", "https://cdn.example.com/storage/v1/object/publicity/x.jpg")]
    #[case("https://cdn.example.com/storage/v1/object/public", "")]
    fn test_normalize_reference_stops_at_path_boundary(#[case] image: &str, #[case] expected: &str) {
        let mut blobs = MemoryBlobStore::new();
        let pipeline = ImagePipeline::new(&mut blobs, "products-images")
            .with_public_url("https://cdn.example.com/storage/v1/object/public/");
        assert_eq!(pipeline.normalize_reference(image), expected);
    }

    #[test]
    fn test_duplicate_inline_images_upload_once() {
        let mut blobs = MemoryBlobStore::new();
        let images = vec![PNG.to_string(), PNG.to_string()];

        let result = ImagePipeline::new(&mut blobs, "products-images")
            .process(&images, None)
            .unwrap();

        assert_eq!(result[0], result[1]);
        assert!(result[0].starts_with("products-images/unknown/"));
        assert_eq!(blobs.len(), 1);
    }

    #[test]
    fn test_upload_failure_fails_batch() {
        let mut blobs = MemoryBlobStore::new();
        blobs.fail_next(AdminError::Transport("storage unavailable".into()));

        let result = ImagePipeline::new(&mut blobs, "products-images").process(&[PNG.to_string()], None);
        assert!(matches!(result, Err(AdminError::Transport(_))));
    }
}
