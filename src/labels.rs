//! Display labels for linguistic tags.
//!
//! Renderers never touch the filesystem for labels: they receive a
//! [`LabelTables`] value. [`LabelStore`] owns the current snapshot and can
//! re-read the resource directory while the process is running.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::error::LabelError;

pub const POS_FILE: &str = "pos.json";
pub const ENTITY_FILE: &str = "entity.json";
pub const SENTIMENT_FILE: &str = "sentiment.json";

/// Flat tag → display label table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMapping {
    table: HashMap<String, String>,
}

impl LabelMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the display label for `tag`, or `tag` itself when unmapped.
    pub fn resolve<'a>(&'a self, tag: &'a str) -> &'a str {
        self.table.get(tag).map(String::as_str).unwrap_or(tag)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.table
    }

    /// Reads a flat JSON object. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self, LabelError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Label table {} not found, using identity", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(LabelError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let table: HashMap<String, String> =
            serde_json::from_str(&raw).map_err(|source| LabelError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded {} labels from {}", table.len(), path.display());
        Ok(Self { table })
    }

    /// Like [`LabelMapping::load`], but an unusable file degrades to identity.
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("{}; falling back to raw tags", e);
            Self::new()
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            table: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// The three tables a report needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTables {
    pub pos: LabelMapping,
    pub entity: LabelMapping,
    pub sentiment: LabelMapping,
}

impl LabelTables {
    /// Tables that map nothing; every tag is displayed verbatim.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Traditional-Chinese display labels bundled with the binary.
    pub fn builtin() -> Self {
        Self {
            pos: BUILTIN_POS.iter().copied().collect(),
            entity: BUILTIN_ENTITY.iter().copied().collect(),
            sentiment: BUILTIN_SENTIMENT.iter().copied().collect(),
        }
    }

    /// Reads `pos.json`, `entity.json` and `sentiment.json` from `dir`.
    /// Each file is optional.
    pub fn load_dir(dir: &Path) -> Self {
        Self {
            pos: LabelMapping::load_or_empty(&dir.join(POS_FILE)),
            entity: LabelMapping::load_or_empty(&dir.join(ENTITY_FILE)),
            sentiment: LabelMapping::load_or_empty(&dir.join(SENTIMENT_FILE)),
        }
    }
}

/// Shared, reloadable holder of the current [`LabelTables`].
///
/// Readers take an `Arc` snapshot. A reload swaps the snapshot; callers
/// holding the old one keep using it until they ask again.
#[derive(Debug)]
pub struct LabelStore {
    source: Option<PathBuf>,
    current: RwLock<Arc<LabelTables>>,
}

impl LabelStore {
    /// Store backed by a resource directory.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let tables = LabelTables::load_dir(&dir);
        Self {
            source: Some(dir),
            current: RwLock::new(Arc::new(tables)),
        }
    }

    /// Store with fixed tables and nothing to reload from.
    pub fn fixed(tables: LabelTables) -> Self {
        Self {
            source: None,
            current: RwLock::new(Arc::new(tables)),
        }
    }

    pub fn current(&self) -> Arc<LabelTables> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Re-reads the resource directory. Returns `false` for fixed stores.
    pub fn reload(&self) -> bool {
        let Some(dir) = &self.source else {
            return false;
        };
        let fresh = Arc::new(LabelTables::load_dir(dir));
        match self.current.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        debug!("Reloaded label tables from {}", dir.display());
        true
    }
}

const BUILTIN_ENTITY: &[(&str, &str)] = &[
    ("person", "人物"),
    ("location", "地點"),
    ("organization", "組織"),
];

const BUILTIN_SENTIMENT: &[(&str, &str)] = &[
    ("positive", "正面情感"),
    ("negative", "負面情感"),
    ("neutral", "中性情感"),
];

const BUILTIN_POS: &[(&str, &str)] = &[
    ("n", "名詞"),
    ("v", "動詞"),
    ("adj", "形容詞"),
    ("adv", "副詞"),
    ("prop", "代詞"),
    ("prep", "介詞"),
    ("conj", "連詞"),
    ("num", "數詞"),
    ("meas", "量詞"),
    ("aux", "助詞"),
    ("punc", "標點"),
    ("nr", "人名"),
    ("ns", "地名"),
    ("nt", "機構名"),
    ("nz", "專有名詞"),
    ("a", "形容詞"),
    ("d", "副詞"),
    ("m", "數量詞"),
    ("r", "代詞"),
    ("c", "連詞"),
    ("p", "介詞"),
    ("u", "助詞"),
    ("xc", "其他"),
    ("w", "標點"),
    ("f", "方位詞"),
    ("g", "語素"),
    ("h", "前綴"),
    ("k", "後綴"),
    ("j", "簡稱"),
    ("l", "習用語"),
    ("i", "成語"),
    ("q", "量詞"),
    ("s", "處所詞"),
    ("t", "時間詞"),
    ("tg", "時語素"),
    ("vd", "副動詞"),
    ("vn", "名動詞"),
    ("y", "語氣詞"),
    ("z", "狀態詞"),
    ("ag", "形語素"),
    ("dg", "副語素"),
    ("ng", "名語素"),
    ("vg", "動語素"),
    ("eng", "英文詞"),
    ("b", "區別詞"),
    ("zg", "狀態語素"),
    ("rg", "代詞語素"),
    ("mg", "數語素"),
    ("o", "擬聲詞"),
    ("e", "嘆詞"),
    ("x", "非語素字"),
    ("xx", "非語素字"),
    ("zh", "非語素字詞"),
    ("vf", "趨向詞"),
    ("vi", "不及物動詞"),
    ("vq", "動詞後綴"),
    ("al", "形容詞性成語"),
    ("an", "名形詞"),
    ("ad", "副形詞"),
    ("bl", "區別詞性成語"),
    ("dl", "副詞性成語"),
    ("il", "成語"),
    ("nl", "名詞性成語"),
    ("rl", "代詞性成語"),
    ("tl", "時間詞性語素"),
    ("vl", "動詞性成語"),
    ("zl", "狀態詞性成語"),
    ("rr", "人稱代詞"),
    ("rz", "指示代詞"),
    ("rx", "代詞性語素"),
    ("nrf", "音譯人名"),
    ("per", "人名"),
    ("loc", "地名"),
    ("org", "機構名"),
    ("time", "時間詞"),
    ("nrt", "音譯人名"),
    ("noun", "名詞"),
    ("verb", "動詞"),
    ("pron", "代詞"),
    ("art", "冠詞"),
    ("int", "嘆詞"),
    ("acronym", "縮略語"),
    ("sub", "代詞"),
    ("quantifier", "量詞"),
    ("det", "限定詞"),
    ("particle", "助詞"),
    ("exclamation", "嘆詞"),
    ("modal", "情態詞"),
    ("functional", "功能詞"),
    ("idiom", "成語"),
    ("slang", "俚語"),
    ("phrase", "短語"),
    ("proverb", "諺語"),
    ("interjection", "嘆詞"),
];
