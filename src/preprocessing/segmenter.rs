use std::{collections::HashSet, sync::LazyLock};

/// Marker placed between the syllables of one segmented word.
pub const SEGMENT_JOINER: char = '_';

const MAX_WORD_SYLLABLES: usize = 4;

/// Groups multi-syllable Vietnamese words into single tokens.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> String;
}

/// Common multi-syllable words, lowercase, syllables separated by one space.
const LEXICON: &[&str] = &[
    "như thế nào",
    "bao nhiêu",
    "thời gian",
    "cửa hàng",
    "sản phẩm",
    "số lượng",
    "giao hàng",
    "nhắn tin",
    "chia sẻ",
    "cảm ơn",
    "làm ơn",
    "chất lượng",
    "tuyệt vời",
    "hài lòng",
    "thất vọng",
    "dịch vụ",
    "nhân viên",
    "khách hàng",
    "hôm nay",
    "hôm qua",
    "ngày mai",
    "đóng gói",
    "giá cả",
    "bình thường",
    "tạm được",
    "điện thoại",
    "máy tính",
    "vui vẻ",
    "buồn bã",
    "tức giận",
    "thân thiện",
    "nhiệt tình",
    "nhanh chóng",
    "chậm trễ",
    "xinh đẹp",
    "tồi tệ",
    "hàng hóa",
    "đơn hàng",
    "trải nghiệm",
    "ứng dụng",
    "phần mềm",
    "yêu thích",
    "thích thú",
    "đáng tiền",
    "lãng phí",
    "mua sắm",
    "giao diện",
    "hướng dẫn",
    "hỗ trợ",
    "phục vụ",
    "món ăn",
    "nhà hàng",
    "bộ phim",
    "câu chuyện",
    "cuộc sống",
    "gia đình",
    "bạn bè",
    "công việc",
    "học tập",
    "thời tiết",
    "sinh viên",
    "tuyệt đối",
    "kinh khủng",
    "hạnh phúc",
    "đau khổ",
    "lo lắng",
    "bực mình",
    "khó chịu",
    "dễ chịu",
    "an toàn",
    "chính xác",
    "ổn định",
    "giá trị",
    "hoàn hảo",
];

static BUILTIN_LEXICON: LazyLock<HashSet<String>> =
    LazyLock::new(|| LEXICON.iter().map(|word| (*word).to_string()).collect());

/// Greedy longest-match segmenter over a fixed word list.
///
/// Tokens already carrying [`SEGMENT_JOINER`] never match a lexicon entry, so
/// segmenting segmented text is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconSegmenter;

impl LexiconSegmenter {
    fn longest_match(lowered: &[String]) -> usize {
        let upper = lowered.len().min(MAX_WORD_SYLLABLES);
        (2..=upper)
            .rev()
            .find(|&span| BUILTIN_LEXICON.contains(&lowered[..span].join(" ")))
            .unwrap_or(1)
    }
}

impl Segmenter for LexiconSegmenter {
    fn segment(&self, text: &str) -> String {
        let syllables: Vec<&str> = text.split_whitespace().collect();
        let lowered: Vec<String> = syllables.iter().map(|s| s.to_lowercase()).collect();
        let joiner = SEGMENT_JOINER.to_string();

        let mut words = Vec::with_capacity(syllables.len());
        let mut idx = 0;
        while idx < syllables.len() {
            let span = Self::longest_match(&lowered[idx..]);
            words.push(syllables[idx..idx + span].join(&joiner));
            idx += span;
        }

        words.join(" ")
    }
}
