// Unicode utilities for column layout
use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// 端末にそのまま出せない制御文字（ESC, BEL, 改行など）を `?` に置き換える
///
/// リモートから来た名前は幅計算や切り詰めの前に必ず通す。
pub fn sanitize_display(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_control) {
        Cow::Owned(
            s.chars()
                .map(|c| if c.is_control() { '?' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(s)
    }
}

/// 文字列の表示幅（全角は2）
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(UnicodeWidthStr::width).sum()
}

/// 文字列を指定された表示幅に切り詰め（Unicode文字境界と表示幅を考慮）
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }

    // 既に表示幅が収まっている場合はそのまま返す
    if display_width(s) <= max_width {
        return s.to_string();
    }

    let ellipsis_width = 3; // "..."の表示幅
    let target_width = max_width.saturating_sub(ellipsis_width);

    let mut accumulated_width = 0;
    let mut result = String::new();

    for grapheme in s.graphemes(true) {
        let grapheme_width = grapheme.width();

        // 次の文字を追加すると幅を超える場合は終了
        if accumulated_width + grapheme_width > target_width {
            break;
        }

        result.push_str(grapheme);
        accumulated_width += grapheme_width;
    }

    format!("{result}...")
}

/// 表示幅が `width` になるよう右側を空白で埋める
pub fn pad_right(s: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(s));
    format!("{s}{}", " ".repeat(padding))
}

/// 表示幅が `width` になるよう左側を空白で埋める
pub fn pad_left(s: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(s));
    format!("{}{s}", " ".repeat(padding))
}
