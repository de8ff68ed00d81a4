use thiserror::Error;

/// スナップショットストアへのアクセスで起きるエラー
///
/// どれもユーザー操作の時点で捕捉され通知として表示される。致命的なものは無い。
#[derive(Debug, Error)]
pub enum FetchError {
    /// リクエストを送信/完了できなかった
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// 成功以外のステータスが返った
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// ボディが期待する JSON の形ではなかった
    #[error("invalid response body: {0}")]
    Decode(String),

    /// 必要な入力（ホスト名）が選択されていない
    #[error("{0}")]
    Validation(String),
}

impl FetchError {
    pub fn missing_hostname() -> Self {
        Self::Validation("Select hostname".to_string())
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
