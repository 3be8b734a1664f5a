//! 物件儲存介面

use shop_core::Result;

/// 物件儲存（圖片等二進位檔案）
pub trait BlobStore {
    /// 上傳物件，回傳儲存路徑 `{bucket}/{path}`
    ///
    /// 不覆寫既有物件：路徑已存在時回傳傳輸錯誤。
    fn upload(&mut self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}
