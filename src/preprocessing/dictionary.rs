use std::{collections::HashMap, sync::LazyLock};

/// Chat abbreviations mapped to the full Vietnamese word.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("ko", "không"),
    ("k", "không"),
    ("dc", "được"),
    ("đc", "được"),
    ("ntn", "như thế nào"),
    ("bn", "bao nhiêu"),
    ("j", "gì"),
    ("m", "mình"),
    ("mik", "mình"),
    ("t", "tôi"),
    ("tg", "thời gian"),
    ("vs", "với"),
    ("ck", "chồng"),
    ("vk", "vợ"),
    ("ad", "admin"),
    ("shop", "cửa hàng"),
    ("sp", "sản phẩm"),
    ("sl", "số lượng"),
    ("ship", "giao hàng"),
    ("ok", "được"),
    ("oke", "được"),
    ("okla", "được"),
    ("nt", "nhắn tin"),
    ("ib", "nhắn tin"),
    ("fix", "sửa"),
    ("share", "chia sẻ"),
    ("thanks", "cảm ơn"),
    ("thx", "cảm ơn"),
    ("plz", "làm ơn"),
    ("pls", "làm ơn"),
    ("nhiu", "nhiều"),
];

/// Words typed without accent marks mapped to their accented spelling.
const NON_DIACRITIC: &[(&str, &str)] = &[
    ("khong", "không"),
    ("duoc", "được"),
    ("tot", "tốt"),
    ("rat", "rất"),
    ("it", "ít"),
    ("neu", "nếu"),
    ("biet", "biết"),
    ("chac", "chắc"),
    ("giua", "giữa"),
    ("hoac", "hoặc"),
    ("luon", "luôn"),
    ("muon", "muốn"),
    ("nhu", "như"),
    ("roi", "rồi"),
    ("tren", "trên"),
    ("truoc", "trước"),
    ("vao", "vào"),
    ("viec", "việc"),
    ("hom", "hôm"),
    ("buon", "buồn"),
];

static BUILTIN: LazyLock<NormalizationDictionary> =
    LazyLock::new(|| NormalizationDictionary::from_tables(&[ABBREVIATIONS, NON_DIACRITIC]));

/// Lowercase token to canonical replacement lookup table.
///
/// Built once and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct NormalizationDictionary {
    entries: HashMap<String, String>,
}

impl NormalizationDictionary {
    /// The shipped abbreviation and non-diacritic tables merged into one map.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Merge tables in order. A key present in a later table replaces the
    /// earlier entry.
    pub fn from_tables(tables: &[&[(&str, &str)]]) -> Self {
        let mut entries = HashMap::new();
        for table in tables {
            for (key, value) in table.iter() {
                entries.insert(key.to_lowercase(), (*value).to_string());
            }
        }
        Self { entries }
    }

    /// Whole-token lookup. `token` must already be lowercased.
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }
}
